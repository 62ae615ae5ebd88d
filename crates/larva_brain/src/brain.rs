//! The brain: one agent's behavior core, advanced one tick at a time.
//!
//! Tick order is fixed:
//!
//! 1. Intermitter update, then crawler/feeder start or stop to match it
//! 2. Feeder advance (bite)
//! 3. Memory update, writing gains into its sensor
//! 4. Crawler advance (forward velocity)
//! 5. Sensors; touch events drive the intermitter reflexes
//! 6. Coupling (plus intermitter lag) decides turner inhibition
//! 7. Turner advance with the combined sensory drive

use crate::input::{route, BrainInput, BrainOutput};
use larva_core::{AgentRng, BrainConfig, MemoryTarget, Result, RoutingConfig};
use larva_locomotor::{BoutRecord, Coupling, Crawler, Feeder, Intermitter, PhaseState, Turner};
use larva_memory::RlMemory;
use larva_sensing::{ContactEvent, Olfactor, Toucher, WindSensor};
use std::path::Path;

/// One behaving agent.
///
/// The intermitter keeps every finished bout in its ledger until it is
/// drained. Long-running callers should call [`Brain::drain_bouts`]
/// periodically; the running summary is unaffected by draining.
pub struct Brain {
    dt: f64,
    /// The only random source of this agent.
    rng: AgentRng,

    crawler: Option<Crawler>,
    feeder: Option<Feeder>,
    turner: Option<Turner>,
    coupling: Coupling,
    intermitter: Option<Intermitter>,

    olfactor: Option<Olfactor>,
    toucher: Option<Toucher>,
    wind_sensor: Option<WindSensor>,

    memory: Option<RlMemory>,
    memory_target: MemoryTarget,

    routing: RoutingConfig,
    tick: u64,
    last_output: BrainOutput,
}

impl Brain {
    /// Build every configured module. All caller-contract checks happen here;
    /// `step` never fails.
    pub fn new(cfg: &BrainConfig) -> Result<Self> {
        cfg.validate()?;
        let dt = cfg.dt;
        let mut rng = AgentRng::from_seed_option(cfg.seed);

        let crawler = cfg
            .crawler
            .as_ref()
            .map(|c| Crawler::new(c, dt, &mut rng))
            .transpose()?;
        let feeder = cfg
            .feeder
            .as_ref()
            .map(|f| Feeder::new(f, dt, &mut rng))
            .transpose()?;
        let turner = cfg
            .turner
            .as_ref()
            .map(|t| Turner::new(t, dt, &mut rng))
            .transpose()?;
        let intermitter = cfg
            .intermitter
            .as_ref()
            .map(|i| Intermitter::new(i, dt, crawler.is_some(), feeder.is_some()))
            .transpose()?;
        let olfactor = cfg
            .olfactor
            .as_ref()
            .map(|s| Olfactor::new(s, dt, &mut rng))
            .transpose()?;
        let toucher = cfg
            .toucher
            .as_ref()
            .map(|s| Toucher::new(s, dt, &mut rng))
            .transpose()?;
        let wind_sensor = cfg
            .wind_sensor
            .as_ref()
            .map(|s| WindSensor::new(s, dt, &mut rng))
            .transpose()?;
        let memory = cfg.memory.as_ref().map(|m| RlMemory::new(m, dt)).transpose()?;

        let mut brain = Self {
            dt,
            rng,
            crawler,
            feeder,
            turner,
            coupling: Coupling::new(&cfg.coupling)?,
            intermitter,
            olfactor,
            toucher,
            wind_sensor,
            memory,
            memory_target: cfg.memory.as_ref().map(|m| m.target).unwrap_or_default(),
            routing: cfg.routing.clone(),
            tick: 0,
            last_output: BrainOutput::default(),
        };

        // Without an intermitter one effector runs continuously.
        if brain.intermitter.is_none() {
            if let Some(c) = &mut brain.crawler {
                c.start();
            } else if let Some(f) = &mut brain.feeder {
                f.start();
            }
        }

        tracing::info!(
            "Brain ready: dt={}s crawler={} feeder={} turner={} intermitter={} sensors=[{}{}{}] memory={}",
            dt,
            brain.crawler.is_some(),
            brain.feeder.is_some(),
            brain.turner.is_some(),
            brain.intermitter.is_some(),
            if brain.olfactor.is_some() { "olfactor " } else { "" },
            if brain.toucher.is_some() { "toucher " } else { "" },
            if brain.wind_sensor.is_some() { "wind" } else { "" },
            brain.memory.is_some()
        );
        Ok(brain)
    }

    /// Load a TOML config and build the brain from it.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let cfg = BrainConfig::load(path)?;
        Ok(Self::new(&cfg)?)
    }

    /// Advance one tick.
    pub fn step(&mut self, input: &BrainInput<'_>) -> BrainOutput {
        self.tick += 1;

        // 1. Bout scheduling
        if let Some(intermitter) = &mut self.intermitter {
            let crawl_done = self.crawler.as_ref().map_or(false, |c| c.cycle_complete());
            let feed_done = self.feeder.as_ref().map_or(false, |f| f.cycle_complete());
            intermitter.update(&mut self.rng, crawl_done, feed_done);
        }
        self.sync_effectors();

        // 2. Feeding
        let feed = self.feeder.as_mut().map_or(false, |f| f.step());

        // 3. Memory
        self.update_memory(input.reward);

        // 4. Crawling
        let body_length = if input.body_length.is_finite() && input.body_length > 0.0 {
            input.body_length
        } else {
            tracing::warn!("tick {}: invalid body length {}, crawler output zeroed", self.tick, input.body_length);
            0.0
        };
        let linear = self
            .crawler
            .as_mut()
            .map_or(0.0, |c| c.step(&mut self.rng, body_length));

        // 5. Perception
        let a_in = self.sense(input);

        // 6. Coupling
        let crawler_phase = self
            .crawler
            .as_ref()
            .map(|c| PhaseState::from_oscillator(c.oscillator()));
        let feeder_phase = self
            .feeder
            .as_ref()
            .map(|f| PhaseState::from_oscillator(f.oscillator()));
        let mut inhibition = self.coupling.compute(crawler_phase, feeder_phase);
        if self.intermitter.as_ref().map_or(false, |i| i.turner_inhibited()) {
            inhibition.inhibited = true;
        }

        // 7. Turning
        let angular = self
            .turner
            .as_mut()
            .map_or(0.0, |t| t.step(&mut self.rng, inhibition, a_in));

        self.last_output = BrainOutput {
            linear_activity: self.sanitize("linear", linear),
            angular_activity: self.sanitize("angular", angular),
            feed,
            bout: self.intermitter.as_ref().and_then(|i| i.state().kind()),
            a_in,
        };
        tracing::trace!(
            "tick {}: linear={:.4} angular={:.4} a_in={:.3} feed={}",
            self.tick,
            self.last_output.linear_activity,
            self.last_output.angular_activity,
            a_in,
            feed
        );
        self.last_output
    }

    /// Start or stop crawler and feeder to match the intermitter's gates.
    fn sync_effectors(&mut self) {
        let Some(intermitter) = &self.intermitter else {
            return;
        };
        if let Some(c) = &mut self.crawler {
            match (intermitter.crawler_engaged(), c.is_active()) {
                (true, false) => c.start(),
                (false, true) => c.stop(),
                _ => {}
            }
        }
        if let Some(f) = &mut self.feeder {
            match (intermitter.feeder_engaged(), f.is_active()) {
                (true, false) => f.start(),
                (false, true) => f.stop(),
                _ => {}
            }
        }
    }

    fn update_memory(&mut self, reward: bool) {
        let Some(memory) = &mut self.memory else {
            return;
        };
        let sensor = match self.memory_target {
            MemoryTarget::Olfactor => self.olfactor.as_mut().map(|o| o.sensor_mut()),
            MemoryTarget::Toucher => self.toucher.as_mut().map(|t| t.sensor_mut()),
        };
        let Some(sensor) = sensor else {
            return;
        };
        if let Some(update) = memory.step(&mut self.rng, sensor.dx_all(), reward) {
            tracing::debug!("tick {}: memory sets gains {:?}", self.tick, update.gains);
            sensor.set_gains(update.gains.iter().map(|(c, g)| (c.as_str(), *g)));
            if let Some(decay) = update.decay_coef {
                sensor.set_decay_coef(decay);
            }
        }
    }

    /// Run every sensor and return the combined drive in [−1, 1].
    fn sense(&mut self, input: &BrainInput<'_>) -> f64 {
        let routed = route(input.readings, &self.routing);
        let mut a_in = 0.0;

        if let Some(olfactor) = &mut self.olfactor {
            a_in += olfactor.step(&mut self.rng, routed.odors.iter().copied());
        }

        if let Some(toucher) = &mut self.toucher {
            let events = toucher.step(&mut self.rng, routed.contacts.iter().copied());
            a_in += toucher.activation();
            // One reflex per tick: the first contact change in channel order.
            if let Some(event) = events.first() {
                if let Some(intermitter) = &mut self.intermitter {
                    match event {
                        ContactEvent::Contact(channel) => {
                            tracing::debug!("tick {}: contact on {}", self.tick, channel);
                            intermitter.trigger_locomotion(&mut self.rng);
                        }
                        ContactEvent::Release(channel) => {
                            tracing::debug!("tick {}: release on {}", self.tick, channel);
                            intermitter.interrupt_locomotion(&mut self.rng);
                        }
                    }
                }
                self.sync_effectors();
            }
        }

        if let Some(wind) = &mut self.wind_sensor {
            a_in += match (routed.wind_direction, routed.wind_speed) {
                (Some(direction), Some(speed)) => wind.step(&mut self.rng, direction, speed),
                _ => wind.idle(&mut self.rng),
            };
        }

        if a_in.is_finite() {
            a_in.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }

    fn sanitize(&self, what: &str, value: f64) -> f64 {
        if value.is_finite() {
            value
        } else {
            tracing::warn!("tick {}: non-finite {} activity {}, replaced with 0", self.tick, what, value);
            0.0
        }
    }

    /// Drive the EEB through the hunger driver, if configured.
    pub fn set_hunger(&mut self, hunger: f64) {
        if let Some(i) = &mut self.intermitter {
            i.set_hunger(hunger);
        }
    }

    pub fn set_eeb(&mut self, eeb: f64) {
        if let Some(i) = &mut self.intermitter {
            i.set_eeb(eeb);
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Simulated seconds since construction.
    pub fn elapsed(&self) -> f64 {
        self.tick as f64 * self.dt
    }

    pub fn last_output(&self) -> &BrainOutput {
        &self.last_output
    }

    pub fn crawler(&self) -> Option<&Crawler> {
        self.crawler.as_ref()
    }

    pub fn feeder(&self) -> Option<&Feeder> {
        self.feeder.as_ref()
    }

    pub fn turner(&self) -> Option<&Turner> {
        self.turner.as_ref()
    }

    pub fn intermitter(&self) -> Option<&Intermitter> {
        self.intermitter.as_ref()
    }

    /// Take the finished bouts recorded so far. Empty without an intermitter.
    pub fn drain_bouts(&mut self) -> Vec<BoutRecord> {
        self.intermitter
            .as_mut()
            .map(Intermitter::drain_records)
            .unwrap_or_default()
    }

    pub fn intermitter_mut(&mut self) -> Option<&mut Intermitter> {
        self.intermitter.as_mut()
    }

    pub fn olfactor(&self) -> Option<&Olfactor> {
        self.olfactor.as_ref()
    }

    pub fn toucher(&self) -> Option<&Toucher> {
        self.toucher.as_ref()
    }

    pub fn wind_sensor(&self) -> Option<&WindSensor> {
        self.wind_sensor.as_ref()
    }

    pub fn memory(&self) -> Option<&RlMemory> {
        self.memory.as_ref()
    }
}
