//! Reinforcement-learned sensor gains.
//!
//! Tabular Q-learning over a discrete action space of gain vectors (one
//! gain per learned channel, optionally paired with a decay coefficient).
//! The state is the last tick's differential on each channel, bucketed by
//! sign and magnitude. After the training period the table freezes and
//! the best known action is kept.

use larva_core::{AgentRng, LarvaError, Result, RlMemoryConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest table (states × actions) the memory will allocate.
pub const MAX_Q_CELLS: usize = 1_000_000;

/// One point of the action space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// One gain per channel, in channel order.
    pub gains: Vec<f64>,
    pub decay_coef: Option<f64>,
}

/// Sensor settings the caller should apply.
#[derive(Debug, Clone, PartialEq)]
pub struct GainUpdate {
    pub gains: Vec<(String, f64)>,
    pub decay_coef: Option<f64>,
}

/// Dense states × actions table, row-major by state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QTable {
    n_states: usize,
    n_actions: usize,
    values: Vec<f64>,
}

impl QTable {
    fn new(n_states: usize, n_actions: usize) -> Self {
        Self {
            n_states,
            n_actions,
            values: vec![0.0; n_states * n_actions],
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[state * self.n_actions + action]
    }

    fn set(&mut self, state: usize, action: usize, value: f64) {
        self.values[state * self.n_actions + action] = value;
    }

    pub fn row(&self, state: usize) -> &[f64] {
        let start = state * self.n_actions;
        &self.values[start..start + self.n_actions]
    }

    pub fn max(&self, state: usize) -> f64 {
        self.row(state).iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Best action in `state`. Ties go to the lowest index.
    pub fn argmax(&self, state: usize) -> usize {
        first_argmax(self.row(state).iter().copied())
    }

    /// Best action by mean value over all states.
    pub fn global_argmax(&self) -> usize {
        let n = self.n_states as f64;
        first_argmax((0..self.n_actions).map(|a| {
            (0..self.n_states).map(|s| self.get(s, a)).sum::<f64>() / n
        }))
    }
}

fn first_argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

pub struct RlMemory {
    channels: Vec<String>,
    actions: Vec<Action>,
    buckets_per_side: i64,
    delta_dx: f64,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    tick_cost: f64,
    update_every: u64,
    train_ticks: u64,
    state_specific_best: bool,
    q: QTable,
    countdown: u64,
    elapsed: u64,
    reward_sum: f64,
    /// State and action of the last update, awaiting their reward.
    pending: Option<(usize, usize)>,
    current_state: usize,
    current_action: Option<usize>,
    training: bool,
}

impl RlMemory {
    pub fn new(cfg: &RlMemoryConfig, dt: f64) -> Result<Self> {
        larva_core::error::check_timestep(dt)?;
        cfg.validate()?;

        let radix = 2 * cfg.state_buckets_per_side as usize + 1;
        let n_states = checked_pow(radix, cfg.channels.len())?;
        let actions = enumerate_actions(cfg)?;
        let cells = n_states.checked_mul(actions.len()).unwrap_or(usize::MAX);
        if cells > MAX_Q_CELLS {
            return Err(LarvaError::SpaceMismatch {
                what: "q-table cells",
                expected: MAX_Q_CELLS,
                got: cells,
            });
        }

        let update_every = ((cfg.update_interval / dt).round() as u64).max(1);
        let train_ticks = (cfg.train_dur / dt).round() as u64;
        tracing::info!(
            "RL memory: {} channels, {} states x {} actions, update every {} ticks, training {} ticks",
            cfg.channels.len(),
            n_states,
            actions.len(),
            update_every,
            train_ticks
        );

        Ok(Self {
            channels: cfg.channels.clone(),
            q: QTable::new(n_states, actions.len()),
            actions,
            buckets_per_side: cfg.state_buckets_per_side as i64,
            delta_dx: cfg.delta_dx,
            alpha: cfg.alpha,
            gamma: cfg.gamma,
            epsilon: cfg.epsilon,
            tick_cost: cfg.tick_cost,
            update_every,
            train_ticks,
            state_specific_best: cfg.state_specific_best,
            countdown: 1,
            elapsed: 0,
            reward_sum: 0.0,
            pending: None,
            current_state: 0,
            current_action: None,
            training: true,
        })
    }

    /// Advance one tick.
    ///
    /// `dx` holds the target sensor's differentials from its last tick and
    /// `reward` whether food is sensed now. Returns the gains to write back
    /// when the chosen action changes.
    pub fn step(&mut self, rng: &mut AgentRng, dx: &BTreeMap<String, f64>, reward: bool) -> Option<GainUpdate> {
        self.elapsed += 1;
        let earned = if reward { 1.0 } else { 0.0 };
        self.reward_sum += earned - self.tick_cost;
        let state = self.state_index(dx);
        self.current_state = state;

        if self.training && self.elapsed > self.train_ticks {
            self.training = false;
            tracing::info!(
                "RL memory frozen after {} ticks, best gains {:?}",
                self.elapsed,
                self.best_gain()
            );
        }

        if !self.training {
            let best = self.best_action_index();
            return self.select(best);
        }

        self.countdown -= 1;
        if self.countdown > 0 {
            return None;
        }
        self.countdown = self.update_every;

        let action = if rng.bernoulli(self.epsilon) {
            rng.index(self.actions.len())
        } else {
            self.q.argmax(state)
        };

        if let Some((s, a)) = self.pending {
            let target = self.reward_sum + self.gamma * self.q.max(state);
            let updated = (1.0 - self.alpha) * self.q.get(s, a) + self.alpha * target;
            self.q.set(s, a, updated);
        }
        self.pending = Some((state, action));
        self.reward_sum = 0.0;

        self.select(action)
    }

    fn select(&mut self, action: usize) -> Option<GainUpdate> {
        if self.current_action == Some(action) {
            return None;
        }
        self.current_action = Some(action);
        Some(self.update_for(action))
    }

    fn update_for(&self, action: usize) -> GainUpdate {
        let a = &self.actions[action];
        GainUpdate {
            gains: self.channels.iter().cloned().zip(a.gains.iter().copied()).collect(),
            decay_coef: a.decay_coef,
        }
    }

    /// Mixed-radix state index: one `2k+1` bucket digit per channel, first
    /// channel most significant. Missing channels read as zero.
    pub fn state_index(&self, dx: &BTreeMap<String, f64>) -> usize {
        let k = self.buckets_per_side;
        let radix = (2 * k + 1) as usize;
        self.channels.iter().fold(0, |index, channel| {
            let value = dx.get(channel).copied().filter(|v| v.is_finite()).unwrap_or(0.0);
            let bucket = ((value / self.delta_dx).round() as i64).clamp(-k, k) + k;
            index * radix + bucket as usize
        })
    }

    fn best_action_index(&self) -> usize {
        if self.state_specific_best {
            self.q.argmax(self.current_state)
        } else {
            self.q.global_argmax()
        }
    }

    /// Best known gain per channel under the configured freeze policy.
    pub fn best_gain(&self) -> BTreeMap<String, f64> {
        let action = &self.actions[self.best_action_index()];
        self.channels.iter().cloned().zip(action.gains.iter().copied()).collect()
    }

    /// Gains currently applied, if any action was chosen yet.
    pub fn current_gain(&self) -> Option<BTreeMap<String, f64>> {
        self.current_action.map(|a| {
            self.channels
                .iter()
                .cloned()
                .zip(self.actions[a].gains.iter().copied())
                .collect()
        })
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn q_table(&self) -> &QTable {
        &self.q
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Reward accumulated since the last table update.
    pub fn pending_reward(&self) -> f64 {
        self.reward_sum
    }
}

fn checked_pow(base: usize, exp: usize) -> Result<usize> {
    (0..exp).try_fold(1usize, |acc, _| acc.checked_mul(base)).ok_or(LarvaError::SpaceMismatch {
        what: "q-table states",
        expected: MAX_Q_CELLS,
        got: usize::MAX,
    })
}

/// Cartesian product of the gain space over channels (first channel varies
/// slowest), crossed with the decay space when configured.
fn enumerate_actions(cfg: &RlMemoryConfig) -> Result<Vec<Action>> {
    let n_gain = cfg.gain_space.len();
    let combos = checked_pow(n_gain, cfg.channels.len())?;
    let decays: Vec<Option<f64>> = match &cfg.decay_coef_space {
        Some(space) => space.iter().copied().map(Some).collect(),
        None => vec![None],
    };
    if combos.saturating_mul(decays.len()) > MAX_Q_CELLS {
        return Err(LarvaError::SpaceMismatch {
            what: "q-table actions",
            expected: MAX_Q_CELLS,
            got: combos.saturating_mul(decays.len()),
        });
    }

    let mut actions = Vec::with_capacity(combos * decays.len());
    for combo in 0..combos {
        let mut gains = vec![0.0; cfg.channels.len()];
        let mut rest = combo;
        for slot in gains.iter_mut().rev() {
            *slot = cfg.gain_space[rest % n_gain];
            rest /= n_gain;
        }
        for &decay_coef in &decays {
            actions.push(Action {
                gains: gains.clone(),
                decay_coef,
            });
        }
    }
    Ok(actions)
}
