use crate::distribution::BoutDistribution;
use crate::error::{check_probability, check_timestep, LarvaError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

/// Everything needed to build one agent's behavior core.
///
/// A module is present when its section is present. Loaded once; the core
/// never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Simulation timestep in seconds.
    pub dt: f64,
    /// Seed for the agent's random source. `None` draws from entropy.
    pub seed: Option<u64>,
    pub crawler: Option<CrawlerConfig>,
    pub feeder: Option<FeederConfig>,
    pub turner: Option<TurnerConfig>,
    pub coupling: CouplingConfig,
    pub intermitter: Option<IntermitterConfig>,
    pub olfactor: Option<SensorConfig>,
    pub toucher: Option<SensorConfig>,
    pub wind_sensor: Option<SensorConfig>,
    pub memory: Option<RlMemoryConfig>,
    pub routing: RoutingConfig,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            seed: None,
            crawler: Some(CrawlerConfig::default()),
            feeder: Some(FeederConfig::default()),
            turner: Some(TurnerConfig::default()),
            coupling: CouplingConfig::default(),
            intermitter: Some(IntermitterConfig::default()),
            olfactor: None,
            toucher: None,
            wind_sensor: None,
            memory: None,
            routing: RoutingConfig::default(),
        }
    }
}

impl BrainConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and the result is validated.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: BrainConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Try to load from path; if that fails, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LARVA_SEED") {
            if let Ok(n) = v.parse() {
                self.seed = Some(n);
            }
        }
        if let Ok(v) = std::env::var("LARVA_DT") {
            if let Ok(n) = v.parse() {
                self.dt = n;
            }
        }
    }

    /// Check every caller-contract condition up front.
    pub fn validate(&self) -> Result<()> {
        check_timestep(self.dt)?;
        if let Some(c) = &self.crawler {
            c.validate()?;
        }
        if let Some(f) = &self.feeder {
            f.validate()?;
        }
        if let Some(t) = &self.turner {
            t.validate()?;
        }
        self.coupling.validate()?;
        if let Some(i) = &self.intermitter {
            i.validate()?;
        }
        for sensor in [&self.olfactor, &self.toucher, &self.wind_sensor].into_iter().flatten() {
            sensor.validate()?;
        }
        if let Some(m) = &self.memory {
            m.validate()?;
            let target = match m.target {
                MemoryTarget::Olfactor => self.olfactor.as_ref(),
                MemoryTarget::Toucher => self.toucher.as_ref(),
            };
            let target = target.ok_or_else(|| {
                LarvaError::InvalidParameter(format!("memory targets the {:?} but it is not configured", m.target))
            })?;
            let known = m
                .channels
                .iter()
                .filter(|c| target.gain_dict.contains_key(c.as_str()))
                .count();
            if known != m.channels.len() {
                return Err(LarvaError::SpaceMismatch {
                    what: "memory channels with a configured sensor gain",
                    expected: m.channels.len(),
                    got: known,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Effectors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Stride frequency (Hz).
    pub freq: f64,
    pub freq_range: Option<[f64; 2]>,
    pub random_phase: bool,
    pub waveform: CrawlerWaveform,
    /// Std of the velocity noise, in body lengths per second.
    pub noise: f64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            freq: 1.42,
            freq_range: None,
            random_phase: false,
            waveform: CrawlerWaveform::default(),
            noise: 0.0,
        }
    }
}

impl CrawlerConfig {
    pub fn validate(&self) -> Result<()> {
        check_frequency("crawler", self.freq)?;
        check_non_negative("crawler noise", self.noise)?;
        self.waveform.validate()
    }
}

/// Shape of the crawler's forward velocity over one stride cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CrawlerWaveform {
    /// freq · step_ratio · (k + l·cos(phase − max_vel_phase))
    Realistic {
        k: f64,
        l: f64,
        max_vel_phase: f64,
        step_ratio_mean: f64,
        step_ratio_std: f64,
    },
    /// `amp` for the first `duty` fraction of the cycle, zero after.
    Square { amp: f64, duty: f64 },
    /// `amp` shaped by a gaussian window centred mid-cycle.
    Gaussian { amp: f64, std: f64 },
}

impl Default for CrawlerWaveform {
    fn default() -> Self {
        Self::Realistic {
            k: 1.0,
            l: 0.6,
            max_vel_phase: 1.0,
            step_ratio_mean: 0.25,
            step_ratio_std: 0.0,
        }
    }
}

impl CrawlerWaveform {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Realistic { step_ratio_std, .. } => check_non_negative("step_ratio_std", *step_ratio_std),
            Self::Square { duty, .. } => check_probability("square duty", *duty),
            Self::Gaussian { std, .. } => {
                if *std > 0.0 {
                    Ok(())
                } else {
                    Err(LarvaError::InvalidParameter(format!("gaussian waveform std must be positive, got {}", std)))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederConfig {
    /// Bite frequency (Hz).
    pub freq: f64,
    pub freq_range: Option<[f64; 2]>,
    pub random_phase: bool,
    /// Fraction of the agent's volume ingested per bite.
    pub bite_volume: f64,
    /// Reach of a bite, in body lengths.
    pub feed_radius: f64,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            freq: 2.0,
            freq_range: None,
            random_phase: false,
            bite_volume: 0.0005,
            feed_radius: 0.05,
        }
    }
}

impl FeederConfig {
    pub fn validate(&self) -> Result<()> {
        check_frequency("feeder", self.freq)?;
        check_non_negative("bite_volume", self.bite_volume)?;
        check_non_negative("feed_radius", self.feed_radius)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnerConfig {
    pub mode: TurnerMode,
    /// Std of the output noise as a fraction of the turner's characteristic magnitude.
    pub noise: f64,
    /// Buffer activity suppressed during leaky inhibition and release it afterwards.
    pub rebound: bool,
}

impl Default for TurnerConfig {
    fn default() -> Self {
        Self {
            mode: TurnerMode::default(),
            noise: 0.0,
            rebound: false,
        }
    }
}

impl TurnerConfig {
    pub fn validate(&self) -> Result<()> {
        check_non_negative("turner noise", self.noise)?;
        match &self.mode {
            TurnerMode::Oscillatory { freq, amp_noise, .. } => {
                check_frequency("turner", *freq)?;
                check_non_negative("turner amp_noise", *amp_noise)
            }
            TurnerMode::Neural(n) => n.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TurnerMode {
    /// Output amp · sin(phase).
    Oscillatory {
        freq: f64,
        #[serde(default)]
        freq_range: Option<[f64; 2]>,
        #[serde(default)]
        random_phase: bool,
        amp: f64,
        #[serde(default)]
        amp_noise: f64,
    },
    /// Two mutually inhibiting excitatory/inhibitory populations.
    Neural(NeuralTurnerConfig),
}

impl Default for TurnerMode {
    fn default() -> Self {
        Self::Oscillatory {
            freq: 0.58,
            freq_range: None,
            random_phase: false,
            amp: 20.0,
            amp_noise: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralTurnerConfig {
    pub base_activation: f64,
    pub activation_range: [f64; 2],
    /// Std of the drive noise at zero input; shrinks as |A_in| → 1.
    pub activation_noise: f64,
    pub tau: f64,
    pub w_ee: f64,
    pub w_ce: f64,
    pub w_ec: f64,
    pub w_cc: f64,
    /// Maximum firing rate.
    pub m: f64,
    /// Hill exponent of the rate response.
    pub n: f64,
    /// Adaptation strength.
    pub g: f64,
    /// Baseline half-activation level.
    pub h0: f64,
    /// Adaptation time constant (s).
    pub tau_h: f64,
    pub output_gain: f64,
    pub warmup_steps: u32,
}

impl Default for NeuralTurnerConfig {
    fn default() -> Self {
        Self {
            base_activation: 20.0,
            activation_range: [10.0, 40.0],
            activation_noise: 0.0,
            tau: 0.1,
            w_ee: 3.0,
            w_ce: 0.1,
            w_ec: 4.0,
            w_cc: 4.0,
            m: 100.0,
            n: 2.0,
            g: 6.0,
            h0: 64.0,
            tau_h: 30.0,
            output_gain: 1.0,
            warmup_steps: 1000,
        }
    }
}

impl NeuralTurnerConfig {
    pub fn validate(&self) -> Result<()> {
        let [lo, hi] = self.activation_range;
        if !(lo <= self.base_activation && self.base_activation <= hi) {
            return Err(LarvaError::InvalidParameter(format!(
                "base_activation {} outside activation_range [{}, {}]",
                self.base_activation, lo, hi
            )));
        }
        if !(self.tau > 0.0) || !(self.tau_h > 0.0) {
            return Err(LarvaError::InvalidParameter(format!(
                "neural time constants must be positive (tau={}, tau_h={})",
                self.tau, self.tau_h
            )));
        }
        check_non_negative("activation_noise", self.activation_noise)
    }
}

// ============================================================================
// Coupling
// ============================================================================

/// A sub-interval of a normalised phase cycle, wrapping past 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseWindow {
    pub offset: f64,
    pub width: f64,
}

impl PhaseWindow {
    /// Window covering the whole cycle.
    pub const FULL: PhaseWindow = PhaseWindow { offset: 0.0, width: 1.0 };

    pub fn contains(&self, normalized_phase: f64) -> bool {
        if self.width >= 1.0 {
            return true;
        }
        if self.width <= 0.0 {
            return false;
        }
        let rel = (normalized_phase - self.offset).rem_euclid(1.0);
        rel < self.width
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    /// Part of the stride cycle where the turner acts unimpeded.
    pub crawler_window: PhaseWindow,
    /// Part of the feeding cycle where the turner acts unimpeded.
    pub feeder_window: PhaseWindow,
    /// Turner output factor while inhibited. 0 suppresses completely.
    pub attenuation: f64,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            crawler_window: PhaseWindow::FULL,
            feeder_window: PhaseWindow::FULL,
            attenuation: 0.0,
        }
    }
}

impl CouplingConfig {
    pub fn validate(&self) -> Result<()> {
        check_probability("coupling attenuation", self.attenuation)?;
        for w in [self.crawler_window, self.feeder_window] {
            if !(w.offset.is_finite() && w.width.is_finite()) {
                return Err(LarvaError::InvalidParameter(format!("non-finite phase window {:?}", w)));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Intermitter
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntermitterConfig {
    /// Pause durations, in seconds.
    pub pause_dist: BoutDistribution,
    /// Stride-chain lengths, in strides.
    pub stridechain_dist: BoutDistribution,
    /// Optional cap on feeding bouts, in bites.
    pub feedchain_dist: Option<BoutDistribution>,
    /// Probability of feeding rather than crawling when a pause ends.
    #[serde(rename = "EEB", alias = "eeb")]
    pub eeb: f64,
    pub eeb_driver: EebDriver,
    /// Probability of biting again after a bite. Falls back to the EEB.
    pub feeder_reoccurence_rate: Option<f64>,
    /// Ticks of turner inhibition when a crawl bout starts.
    pub turner_pre_lag: u32,
    /// Ticks of turner inhibition when a crawl bout ends.
    pub turner_post_lag: u32,
}

impl Default for IntermitterConfig {
    fn default() -> Self {
        Self {
            pause_dist: BoutDistribution::Lognormal {
                mean: 1.0,
                std: 0.8,
                range: [0.4, 20.0],
            },
            stridechain_dist: BoutDistribution::Powerlaw {
                alpha: 1.6,
                range: [1.0, 120.0],
            },
            feedchain_dist: None,
            eeb: 0.0,
            eeb_driver: EebDriver::Constant,
            feeder_reoccurence_rate: None,
            turner_pre_lag: 0,
            turner_post_lag: 0,
        }
    }
}

impl IntermitterConfig {
    pub fn validate(&self) -> Result<()> {
        self.pause_dist.validate()?;
        self.stridechain_dist.validate()?;
        if let Some(d) = &self.feedchain_dist {
            d.validate()?;
        }
        check_probability("EEB", self.eeb)?;
        if let Some(r) = self.feeder_reoccurence_rate {
            check_probability("feeder_reoccurence_rate", r)?;
        }
        if let EebDriver::Hunger { min, max } = self.eeb_driver {
            check_probability("hunger EEB min", min)?;
            check_probability("hunger EEB max", max)?;
        }
        Ok(())
    }
}

/// External signal steering the EEB.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "snake_case")]
pub enum EebDriver {
    #[default]
    Constant,
    /// EEB = min + (max − min) · hunger, hunger in [0, 1].
    Hunger { min: f64, max: f64 },
}

// ============================================================================
// Sensors
// ============================================================================

/// How a channel's reading is turned into a differential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perception {
    /// cur − prev
    #[default]
    Linear,
    /// cur / prev − 1, zero when prev == 0
    Log,
    /// cur
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainSpec {
    pub mean: f64,
    #[serde(default)]
    pub std: f64,
}

impl GainSpec {
    pub fn fixed(mean: f64) -> Self {
        Self { mean, std: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub perception: Perception,
    /// Activation decay rate (1/s).
    pub decay_coef: f64,
    /// Std of multiplicative reading noise.
    pub input_noise: f64,
    /// Initial per-channel gains, drawn once per agent.
    pub gain_dict: BTreeMap<String, GainSpec>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            perception: Perception::Linear,
            decay_coef: 0.1,
            input_noise: 0.0,
            gain_dict: BTreeMap::new(),
        }
    }
}

impl SensorConfig {
    /// Logarithmic perception, as larvae sense odor concentration ratios.
    pub fn olfactor() -> Self {
        Self {
            perception: Perception::Log,
            ..Self::default()
        }
    }

    pub fn toucher() -> Self {
        Self {
            perception: Perception::Linear,
            decay_coef: 0.1,
            ..Self::default()
        }
    }

    pub fn wind() -> Self {
        Self {
            perception: Perception::Null,
            decay_coef: 0.1,
            ..Self::default()
        }
    }

    pub fn with_gain(mut self, channel: &str, gain: f64) -> Self {
        self.gain_dict.insert(channel.to_string(), GainSpec::fixed(gain));
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_non_negative("sensor decay_coef", self.decay_coef)?;
        check_non_negative("sensor input_noise", self.input_noise)?;
        for (channel, spec) in &self.gain_dict {
            if !spec.mean.is_finite() || !(spec.std >= 0.0) {
                return Err(LarvaError::InvalidParameter(format!(
                    "gain for channel '{}' needs finite mean and std >= 0",
                    channel
                )));
            }
        }
        Ok(())
    }
}

/// Which inbound reading keys feed which sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub touch_prefix: String,
    pub wind_direction_key: String,
    pub wind_speed_key: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            touch_prefix: "touch".to_string(),
            wind_direction_key: "wind_direction".to_string(),
            wind_speed_key: "wind_speed".to_string(),
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTarget {
    #[default]
    Olfactor,
    Toucher,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RlMemoryConfig {
    pub target: MemoryTarget,
    /// Channels whose gains are learned, in action-vector order.
    pub channels: Vec<String>,
    pub gain_space: Vec<f64>,
    /// If set, the action space also chooses the sensor's decay coefficient.
    pub decay_coef_space: Option<Vec<f64>>,
    /// Magnitude buckets on each side of zero per channel. 0 collapses the
    /// state space to a single state.
    pub state_buckets_per_side: u32,
    /// Width of one differential bucket.
    pub delta_dx: f64,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    /// Seconds between Q updates.
    pub update_interval: f64,
    /// Seconds of training before the table freezes.
    pub train_dur: f64,
    /// Reward subtracted every tick.
    pub tick_cost: f64,
    /// After freezing, pick the best action for the current state rather than
    /// the best action on average.
    pub state_specific_best: bool,
}

impl Default for RlMemoryConfig {
    fn default() -> Self {
        Self {
            target: MemoryTarget::Olfactor,
            channels: Vec::new(),
            gain_space: vec![-300.0, -50.0, 50.0, 300.0],
            decay_coef_space: None,
            state_buckets_per_side: 0,
            delta_dx: 0.02,
            alpha: 0.05,
            gamma: 0.6,
            epsilon: 0.15,
            update_interval: 1.0,
            train_dur: 1800.0,
            tick_cost: 0.01,
            state_specific_best: true,
        }
    }
}

impl RlMemoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(LarvaError::SpaceMismatch {
                what: "memory channels",
                expected: 1,
                got: 0,
            });
        }
        if self.gain_space.is_empty() {
            return Err(LarvaError::SpaceMismatch {
                what: "memory gain_space values",
                expected: 1,
                got: 0,
            });
        }
        if let Some(space) = &self.decay_coef_space {
            if space.is_empty() {
                return Err(LarvaError::SpaceMismatch {
                    what: "memory decay_coef_space values",
                    expected: 1,
                    got: 0,
                });
            }
        }
        if !(self.update_interval > 0.0) {
            return Err(LarvaError::InvalidParameter(format!(
                "memory update_interval must be positive, got {}",
                self.update_interval
            )));
        }
        if !(self.train_dur >= self.update_interval) {
            return Err(LarvaError::TrainingTooShort {
                train_dur: self.train_dur,
                update_interval: self.update_interval,
            });
        }
        if !(self.delta_dx > 0.0) {
            return Err(LarvaError::InvalidParameter(format!(
                "memory delta_dx must be positive, got {}",
                self.delta_dx
            )));
        }
        check_probability("memory alpha", self.alpha)?;
        check_probability("memory gamma", self.gamma)?;
        check_probability("memory epsilon", self.epsilon)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn check_frequency(effector: &'static str, freq: f64) -> Result<()> {
    if freq > 0.0 && freq.is_finite() {
        Ok(())
    } else {
        Err(LarvaError::NonPositiveFrequency { effector, freq })
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(LarvaError::InvalidParameter(format!("{} must be >= 0, got {}", name, value)))
    }
}

// ============================================================================
// Tests
// ============================================================================
