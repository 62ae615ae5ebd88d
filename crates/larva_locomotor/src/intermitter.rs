//! Intermitter: the stochastic bout scheduler.
//!
//! Larval locomotion is intermittent: pauses alternate with runs of strides
//! (stride chains) or runs of bites (feed chains). Bout lengths are drawn
//! from heavy-tailed fits:
//!
//! ```text
//!   Idle ──► Paused ──(timer)──► Crawling ──(strides == target)──► Paused ...
//!                      └─(EEB)─► Feeding  ──(stop roll / cap)────► Paused ...
//! ```
//!
//! The intermitter owns the bout state and nothing else. Effectors report
//! completed cycles, and the caller reads the gates back and starts or stops
//! them accordingly.

use larva_core::{AgentRng, BoutDistribution, EebDriver, IntermitterConfig, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoutKind {
    Pause,
    Stridechain,
    Feedchain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoutState {
    /// No bout running yet.
    Idle,
    Paused { elapsed: u32, target: u32 },
    Crawling { strides: u32, target: u32, elapsed: u32 },
    /// `target` is set only when a feed-chain cap is configured.
    Feeding { bites: u32, target: Option<u32>, elapsed: u32 },
}

impl BoutState {
    pub fn kind(&self) -> Option<BoutKind> {
        match self {
            Self::Idle => None,
            Self::Paused { .. } => Some(BoutKind::Pause),
            Self::Crawling { .. } => Some(BoutKind::Stridechain),
            Self::Feeding { .. } => Some(BoutKind::Feedchain),
        }
    }
}

/// One finished bout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoutRecord {
    pub kind: BoutKind,
    pub start_tick: u64,
    pub duration_ticks: u32,
    /// Strides or bites; 0 for pauses.
    pub length: u32,
    /// Ended by a reflex rather than its own timer or counter.
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntermitterSummary {
    pub pauses: u64,
    pub stridechains: u64,
    pub feedchains: u64,
    pub pause_ticks: u64,
    pub stridechain_ticks: u64,
    pub feedchain_ticks: u64,
    pub strides: u64,
    pub bites: u64,
}

impl IntermitterSummary {
    fn register(&mut self, record: &BoutRecord) {
        let ticks = record.duration_ticks as u64;
        match record.kind {
            BoutKind::Pause => {
                self.pauses += 1;
                self.pause_ticks += ticks;
            }
            BoutKind::Stridechain => {
                self.stridechains += 1;
                self.stridechain_ticks += ticks;
                self.strides += record.length as u64;
            }
            BoutKind::Feedchain => {
                self.feedchains += 1;
                self.feedchain_ticks += ticks;
                self.bites += record.length as u64;
            }
        }
    }

    pub fn mean_pause_ticks(&self) -> f64 {
        mean(self.pause_ticks, self.pauses)
    }

    pub fn mean_stridechain_length(&self) -> f64 {
        mean(self.strides, self.stridechains)
    }

    pub fn mean_feedchain_length(&self) -> f64 {
        mean(self.bites, self.feedchains)
    }

    /// Fraction of registered time spent pausing.
    pub fn pause_fraction(&self) -> f64 {
        let total = self.pause_ticks + self.stridechain_ticks + self.feedchain_ticks;
        if total == 0 {
            0.0
        } else {
            self.pause_ticks as f64 / total as f64
        }
    }
}

fn mean(sum: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

pub struct Intermitter {
    dt: f64,
    pause_dist: BoutDistribution,
    stridechain_dist: BoutDistribution,
    feedchain_dist: Option<BoutDistribution>,
    base_eeb: f64,
    eeb_driver: EebDriver,
    hunger: f64,
    feeder_reoccurence_rate: Option<f64>,
    pre_lag: u32,
    post_lag: u32,
    turner_lag: u32,
    has_crawler: bool,
    has_feeder: bool,
    state: BoutState,
    bout_start: u64,
    tick: u64,
    records: Vec<BoutRecord>,
    summary: IntermitterSummary,
}

impl Intermitter {
    /// `has_crawler` / `has_feeder` say which effectors exist to be engaged.
    pub fn new(cfg: &IntermitterConfig, dt: f64, has_crawler: bool, has_feeder: bool) -> Result<Self> {
        larva_core::error::check_timestep(dt)?;
        cfg.validate()?;
        Ok(Self {
            dt,
            pause_dist: cfg.pause_dist.clone(),
            stridechain_dist: cfg.stridechain_dist.clone(),
            feedchain_dist: cfg.feedchain_dist.clone(),
            base_eeb: cfg.eeb,
            eeb_driver: cfg.eeb_driver,
            hunger: 0.0,
            feeder_reoccurence_rate: cfg.feeder_reoccurence_rate,
            pre_lag: cfg.turner_pre_lag,
            post_lag: cfg.turner_post_lag,
            turner_lag: 0,
            has_crawler,
            has_feeder,
            state: BoutState::Idle,
            bout_start: 0,
            tick: 0,
            records: Vec::new(),
            summary: IntermitterSummary::default(),
        })
    }

    /// Advance the bout state by one tick.
    ///
    /// The flags are the effectors' "cycle complete" reports from their most
    /// recent advance.
    pub fn update(&mut self, rng: &mut AgentRng, crawler_cycle_complete: bool, feeder_cycle_complete: bool) {
        self.turner_lag = self.turner_lag.saturating_sub(1);

        match self.state {
            BoutState::Idle => self.begin_pause(rng),
            BoutState::Paused { elapsed, target } => {
                let elapsed = elapsed + 1;
                if elapsed >= target {
                    self.finish(BoutKind::Pause, elapsed, 0, false);
                    self.engage(rng);
                } else {
                    self.state = BoutState::Paused { elapsed, target };
                }
            }
            BoutState::Crawling { strides, target, elapsed } => {
                let elapsed = elapsed + 1;
                let strides = strides + crawler_cycle_complete as u32;
                if strides >= target {
                    self.finish(BoutKind::Stridechain, elapsed, strides, false);
                    self.turner_lag = self.turner_lag.max(self.post_lag);
                    self.begin_pause(rng);
                } else {
                    self.state = BoutState::Crawling { strides, target, elapsed };
                }
            }
            BoutState::Feeding { bites, target, elapsed } => {
                let elapsed = elapsed + 1;
                let mut bites = bites;
                let mut done = false;
                if feeder_cycle_complete {
                    bites += 1;
                    let capped = target.map_or(false, |t| bites >= t);
                    done = capped || !rng.bernoulli(self.feed_continuation());
                }
                if done {
                    self.finish(BoutKind::Feedchain, elapsed, bites, false);
                    self.begin_pause(rng);
                } else {
                    self.state = BoutState::Feeding { bites, target, elapsed };
                }
            }
        }

        self.tick += 1;
    }

    /// Reflexively end a pause and start crawling now.
    ///
    /// Ignored while already crawling or feeding.
    pub fn trigger_locomotion(&mut self, rng: &mut AgentRng) {
        match self.state {
            BoutState::Idle => {}
            BoutState::Paused { elapsed, .. } => self.finish(BoutKind::Pause, elapsed, 0, true),
            _ => return,
        }
        if self.has_crawler {
            self.begin_crawl(rng);
        } else {
            self.engage(rng);
        }
        tracing::debug!("tick {}: locomotion triggered", self.tick);
    }

    /// Reflexively stop crawling or feeding and start a new pause.
    ///
    /// Ignored while already pausing.
    pub fn interrupt_locomotion(&mut self, rng: &mut AgentRng) {
        match self.state {
            BoutState::Crawling { strides, elapsed, .. } => {
                self.finish(BoutKind::Stridechain, elapsed, strides, true);
                self.turner_lag = self.turner_lag.max(self.post_lag);
            }
            BoutState::Feeding { bites, elapsed, .. } => {
                self.finish(BoutKind::Feedchain, elapsed, bites, true);
            }
            BoutState::Idle | BoutState::Paused { .. } => return,
        }
        self.begin_pause(rng);
        tracing::debug!("tick {}: locomotion interrupted", self.tick);
    }

    fn begin_pause(&mut self, rng: &mut AgentRng) {
        let target = self.pause_dist.sample_ticks(rng, self.dt);
        tracing::debug!("tick {}: pause for {} ticks", self.tick, target);
        self.state = BoutState::Paused { elapsed: 0, target };
        self.bout_start = self.tick;
    }

    fn engage(&mut self, rng: &mut AgentRng) {
        let feed = match (self.has_crawler, self.has_feeder) {
            (false, false) => {
                self.begin_pause(rng);
                return;
            }
            (true, false) => false,
            (false, true) => true,
            (true, true) => rng.bernoulli(self.eeb()),
        };
        if feed {
            self.begin_feed(rng);
        } else {
            self.begin_crawl(rng);
        }
    }

    fn begin_crawl(&mut self, rng: &mut AgentRng) {
        let target = self.stridechain_dist.sample_count(rng);
        tracing::debug!("tick {}: stride chain of {} strides", self.tick, target);
        self.state = BoutState::Crawling {
            strides: 0,
            target,
            elapsed: 0,
        };
        self.bout_start = self.tick;
        self.turner_lag = self.turner_lag.max(self.pre_lag);
    }

    fn begin_feed(&mut self, rng: &mut AgentRng) {
        let target = self.feedchain_dist.as_ref().map(|d| d.sample_count(rng));
        tracing::debug!("tick {}: feeding (cap {:?})", self.tick, target);
        self.state = BoutState::Feeding {
            bites: 0,
            target,
            elapsed: 0,
        };
        self.bout_start = self.tick;
    }

    fn finish(&mut self, kind: BoutKind, duration_ticks: u32, length: u32, interrupted: bool) {
        let record = BoutRecord {
            kind,
            start_tick: self.bout_start,
            duration_ticks,
            length,
            interrupted,
        };
        self.summary.register(&record);
        self.records.push(record);
    }

    /// Current exploitation/exploration balance: probability of feeding when
    /// a pause ends.
    pub fn eeb(&self) -> f64 {
        match self.eeb_driver {
            EebDriver::Constant => self.base_eeb,
            EebDriver::Hunger { min, max } => min + (max - min) * self.hunger,
        }
    }

    fn feed_continuation(&self) -> f64 {
        self.feeder_reoccurence_rate.unwrap_or_else(|| self.eeb())
    }

    pub fn set_eeb(&mut self, eeb: f64) {
        if eeb.is_finite() {
            self.base_eeb = eeb.clamp(0.0, 1.0);
        }
    }

    pub fn set_hunger(&mut self, hunger: f64) {
        if hunger.is_finite() {
            self.hunger = hunger.clamp(0.0, 1.0);
        }
    }

    pub fn crawler_engaged(&self) -> bool {
        matches!(self.state, BoutState::Crawling { .. })
    }

    pub fn feeder_engaged(&self) -> bool {
        matches!(self.state, BoutState::Feeding { .. })
    }

    /// True while a pre- or post-crawl lag keeps the turner quiet.
    pub fn turner_inhibited(&self) -> bool {
        self.turner_lag > 0
    }

    pub fn state(&self) -> BoutState {
        self.state
    }

    pub fn records(&self) -> &[BoutRecord] {
        &self.records
    }

    /// Hand the bout ledger to the caller and start a fresh one.
    pub fn drain_records(&mut self) -> Vec<BoutRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn summary(&self) -> &IntermitterSummary {
        &self.summary
    }

    pub fn pause_tick_bounds(&self) -> (u32, u32) {
        self.pause_dist.tick_bounds(self.dt)
    }
}
