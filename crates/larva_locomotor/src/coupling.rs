//! Oscillator coupling: when the crawler or feeder is mid-cycle outside its
//! interference-free window, the turner is inhibited.
//!
//! Stateless. Recomputed from the effectors' phases every tick.

use larva_core::{CouplingConfig, Oscillator, PhaseWindow, Result};
use std::f64::consts::TAU;

/// Snapshot of an effector's rhythm as the coupling sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseState {
    pub active: bool,
    /// Phase as a fraction of the cycle, in [0, 1).
    pub normalized: f64,
}

impl PhaseState {
    /// `phase` in radians.
    pub fn new(active: bool, phase: f64) -> Self {
        Self {
            active,
            normalized: phase.rem_euclid(TAU) / TAU,
        }
    }

    pub fn from_oscillator(osc: &Oscillator) -> Self {
        Self {
            active: osc.is_active(),
            normalized: osc.normalized_phase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnerInhibition {
    pub inhibited: bool,
    /// Factor applied to the turner output while inhibited.
    pub attenuation: f64,
}

impl TurnerInhibition {
    pub const FREE: TurnerInhibition = TurnerInhibition {
        inhibited: false,
        attenuation: 1.0,
    };
}

#[derive(Debug, Clone)]
pub struct Coupling {
    crawler_window: PhaseWindow,
    feeder_window: PhaseWindow,
    attenuation: f64,
}

impl Coupling {
    pub fn new(cfg: &CouplingConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            crawler_window: cfg.crawler_window,
            feeder_window: cfg.feeder_window,
            attenuation: cfg.attenuation,
        })
    }

    pub fn compute(&self, crawler: Option<PhaseState>, feeder: Option<PhaseState>) -> TurnerInhibition {
        let blocks = |state: Option<PhaseState>, window: &PhaseWindow| {
            state.map_or(false, |s| s.active && !window.contains(s.normalized))
        };
        TurnerInhibition {
            inhibited: blocks(crawler, &self.crawler_window) || blocks(feeder, &self.feeder_window),
            attenuation: self.attenuation,
        }
    }

    pub fn attenuation(&self) -> f64 {
        self.attenuation
    }
}

impl Default for Coupling {
    fn default() -> Self {
        Self {
            crawler_window: PhaseWindow::FULL,
            feeder_window: PhaseWindow::FULL,
            attenuation: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn coupling(width: f64) -> Coupling {
        Coupling::new(&CouplingConfig {
            crawler_window: PhaseWindow { offset: 0.0, width },
            feeder_window: PhaseWindow { offset: 0.0, width },
            attenuation: 0.0,
        })
        .unwrap()
    }

    #[test]
    fn test_crawler_window_scenario() {
        let c = coupling(0.2);
        let inside = c.compute(Some(PhaseState::new(true, 0.1 * PI)), None);
        assert!(!inside.inhibited);
        let outside = c.compute(Some(PhaseState::new(true, 0.9 * PI)), None);
        assert!(outside.inhibited);
        assert_eq!(outside.attenuation, 0.0);
    }

    #[test]
    fn test_inactive_effector_never_inhibits() {
        let c = coupling(0.0);
        let r = c.compute(Some(PhaseState::new(false, 0.9 * PI)), Some(PhaseState::new(false, PI)));
        assert!(!r.inhibited);
        assert!(!c.compute(None, None).inhibited);
    }

    #[test]
    fn test_feeder_inhibits_independently() {
        let c = coupling(0.2);
        let r = c.compute(Some(PhaseState::new(false, 0.0)), Some(PhaseState::new(true, PI)));
        assert!(r.inhibited);
    }

    #[test]
    fn test_pure_function() {
        let c = coupling(0.2);
        let s = Some(PhaseState::new(true, 0.9 * PI));
        let a = c.compute(s, None);
        let b = c.compute(s, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_leaky_attenuation_reported() {
        let c = Coupling::new(&CouplingConfig {
            crawler_window: PhaseWindow { offset: 0.0, width: 0.5 },
            attenuation: 0.3,
            ..CouplingConfig::default()
        })
        .unwrap();
        let r = c.compute(Some(PhaseState::new(true, 1.5 * PI)), None);
        assert!(r.inhibited);
        assert_eq!(r.attenuation, 0.3);
    }
}
