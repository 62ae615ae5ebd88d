//! Bout-duration distributions.
//!
//! Pause durations and stride-chain lengths of real larvae are heavy tailed.
//! They are described by a truncated power law or a truncated lognormal,
//! each with inclusive `[min, max]` bounds. Draws are always clamped into the
//! bounds; a draw is never discarded.

use crate::error::{LarvaError, Result};
use crate::rng::AgentRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum BoutDistribution {
    /// p(x) ∝ x^(-alpha) on [range[0], range[1]].
    Powerlaw { alpha: f64, range: [f64; 2] },
    /// Lognormal with the given mean and std of the distribution itself
    /// (not of its logarithm).
    Lognormal { mean: f64, std: f64, range: [f64; 2] },
}

impl BoutDistribution {
    pub fn range(&self) -> [f64; 2] {
        match self {
            Self::Powerlaw { range, .. } | Self::Lognormal { range, .. } => *range,
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            Self::Powerlaw { .. } => "powerlaw",
            Self::Lognormal { .. } => "lognormal",
        }
    }

    pub fn validate(&self) -> Result<()> {
        let [min, max] = self.range();
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min > max {
            return Err(LarvaError::InvalidDistribution(format!(
                "{} range must satisfy 0 < min <= max, got [{}, {}]",
                self.family(),
                min,
                max
            )));
        }
        match self {
            Self::Powerlaw { alpha, .. } if !alpha.is_finite() => Err(
                LarvaError::InvalidDistribution(format!("powerlaw alpha must be finite, got {}", alpha)),
            ),
            Self::Lognormal { mean, std, .. } if !(*mean > 0.0) || !(*std >= 0.0) || !std.is_finite() => {
                Err(LarvaError::InvalidDistribution(format!(
                    "lognormal needs mean > 0 and std >= 0, got mean={} std={}",
                    mean, std
                )))
            }
            _ => Ok(()),
        }
    }

    /// One continuous draw, clamped into the configured range.
    pub fn sample(&self, rng: &mut AgentRng) -> f64 {
        let [min, max] = self.range();
        let x = match *self {
            Self::Powerlaw { alpha, .. } => powerlaw_inverse_cdf(rng.uniform(), alpha, min, max),
            Self::Lognormal { mean, std, .. } => {
                let (mu, sigma) = lognormal_params(mean, std);
                rng.lognormal(mu, sigma)
            }
        };
        clamp_draw(x, min, max)
    }

    /// Integer draw (e.g. strides in a chain), rounded and clamped into the
    /// integer part of the range. Never below 1.
    pub fn sample_count(&self, rng: &mut AgentRng) -> u32 {
        let (lo, hi) = self.count_bounds();
        let x = self.sample(rng).round();
        (x as u32).clamp(lo, hi)
    }

    /// Duration draw in seconds converted to whole ticks of `dt`.
    pub fn sample_ticks(&self, rng: &mut AgentRng, dt: f64) -> u32 {
        let (lo, hi) = self.tick_bounds(dt);
        let ticks = (self.sample(rng) / dt).round();
        (ticks as u32).clamp(lo, hi)
    }

    /// Inclusive integer bounds used by [`sample_count`](Self::sample_count).
    pub fn count_bounds(&self) -> (u32, u32) {
        let [min, max] = self.range();
        let lo = (min.ceil() as u32).max(1);
        let hi = (max.floor() as u32).max(lo);
        (lo, hi)
    }

    /// Inclusive tick bounds used by [`sample_ticks`](Self::sample_ticks).
    pub fn tick_bounds(&self, dt: f64) -> (u32, u32) {
        let [min, max] = self.range();
        let lo = ((min / dt).round() as u32).max(1);
        let hi = ((max / dt).round() as u32).max(lo);
        (lo, hi)
    }
}

/// Convert a distribution mean/std into the (mu, sigma) of its logarithm.
pub fn lognormal_params(mean: f64, std: f64) -> (f64, f64) {
    let var_ratio = (std * std) / (mean * mean);
    let sigma2 = (1.0 + var_ratio).ln();
    (mean.ln() - sigma2 / 2.0, sigma2.sqrt())
}

/// Inverse CDF of a power law truncated to [min, max].
fn powerlaw_inverse_cdf(u: f64, alpha: f64, min: f64, max: f64) -> f64 {
    let e = 1.0 - alpha;
    if e.abs() < 1e-9 {
        // alpha == 1: log-uniform
        return min * (max / min).powf(u);
    }
    let a = min.powf(e);
    let b = max.powf(e);
    (a + u * (b - a)).powf(1.0 / e)
}

fn clamp_draw(x: f64, min: f64, max: f64) -> f64 {
    if x.is_nan() {
        return min;
    }
    x.clamp(min, max)
}
