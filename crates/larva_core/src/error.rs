//! Caller-contract violations.
//!
//! The behavior core never fails inside a tick. These errors are only raised
//! while building components from configuration, where a bad value would make
//! the simulation meaningless (an oscillator that never advances, a Q-table
//! that cannot index its own actions, learning that can never happen).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LarvaError {
    #[error("{effector}: frequency must be positive, got {freq}")]
    NonPositiveFrequency { effector: &'static str, freq: f64 },

    #[error("Timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error("{what}: expected {expected}, got {got}")]
    SpaceMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Training duration {train_dur}s is shorter than one update interval ({update_interval}s)")]
    TrainingTooShort { train_dur: f64, update_interval: f64 },

    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, LarvaError>;

/// Fail unless `value` lies in [0, 1].
pub fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LarvaError::InvalidProbability { name, value })
    }
}

/// Fail unless `dt` is a usable timestep.
pub fn check_timestep(dt: f64) -> Result<()> {
    if dt > 0.0 && dt.is_finite() {
        Ok(())
    } else {
        Err(LarvaError::InvalidTimestep(dt))
    }
}
