//! Agent-scoped random source.
//!
//! One `AgentRng` per simulated larva. Every stochastic draw the behavior
//! core makes (bout durations, ε-greedy choices, gaussian noise) goes through
//! it, so a fixed seed reproduces a whole trajectory.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal, Normal};

#[derive(Debug, Clone)]
pub struct AgentRng {
    inner: StdRng,
}

impl AgentRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }

    /// Uniform in [0, 1).
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform in [low, high). Returns `low` for an empty range.
    #[inline]
    pub fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        low + (high - low) * self.uniform()
    }

    /// Uniform index in [0, n). `n == 0` yields 0.
    #[inline]
    pub fn index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.inner.gen_range(0..n)
    }

    /// True with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn bernoulli(&mut self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.uniform() < p
    }

    /// Gaussian draw. A non-positive or non-finite `std` returns `mean`.
    pub fn normal(&mut self, mean: f64, std: f64) -> f64 {
        if !(std > 0.0) || !std.is_finite() {
            return mean;
        }
        match Normal::new(mean, std) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => mean,
        }
    }

    /// Lognormal draw parameterised in log space.
    pub fn lognormal(&mut self, mu: f64, sigma: f64) -> f64 {
        if !(sigma > 0.0) || !sigma.is_finite() {
            return mu.exp();
        }
        match LogNormal::new(mu, sigma) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => mu.exp(),
        }
    }
}
