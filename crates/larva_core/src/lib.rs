//! # Larva Core
//!
//! Shared building blocks of the larva behavior core:
//!
//! - **config**: plain serde structs describing every module, loaded from TOML
//! - **error**: caller-contract violations raised at construction time
//! - **rng**: the single agent-scoped random source
//! - **distribution**: heavy-tailed bout-duration families (power law, lognormal)
//! - **oscillator**: the phase accumulator behind every rhythmic effector
//!
//! Nothing in here advances on its own; the brain drives it one tick at a time.

pub mod config;
pub mod distribution;
pub mod error;
pub mod oscillator;
pub mod rng;

pub use config::{
    BrainConfig, CouplingConfig, CrawlerConfig, CrawlerWaveform, EebDriver, FeederConfig, GainSpec,
    IntermitterConfig, MemoryTarget, NeuralTurnerConfig, Perception, PhaseWindow, RlMemoryConfig,
    RoutingConfig, SensorConfig, TurnerConfig, TurnerMode,
};
pub use distribution::BoutDistribution;
pub use error::{LarvaError, Result};
pub use oscillator::Oscillator;
pub use rng::AgentRng;
