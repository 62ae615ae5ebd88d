//! Phase accumulator shared by every rhythmic effector.
//!
//! The phase is held as an integer position within the cycle, so a cycle is
//! exactly `ticks_per_cycle` advances long and the wrap can be detected
//! without floating-point drift:
//!
//!   phase = 2π · tick_in_cycle / ticks_per_cycle,  ticks_per_cycle = round(1 / (f · dt))

use crate::error::{check_timestep, LarvaError, Result};
use crate::rng::AgentRng;
use std::f64::consts::TAU;

#[derive(Debug, Clone)]
pub struct Oscillator {
    label: &'static str,
    dt: f64,
    freq: f64,
    freq_range: Option<[f64; 2]>,
    ticks_per_cycle: u32,
    tick_in_cycle: u32,
    active: bool,
    /// Set on exactly the tick the phase wrapped.
    complete: bool,
    cycles: u64,
    /// Phase-local timer, reset on stop.
    ticks_since_start: u64,
}

impl Oscillator {
    /// Build an inactive oscillator at phase 0.
    ///
    /// `label` names the owning effector in errors and logs.
    pub fn new(label: &'static str, freq: f64, freq_range: Option<[f64; 2]>, dt: f64) -> Result<Self> {
        check_timestep(dt)?;
        check_frequency(label, freq)?;
        if let Some([lo, hi]) = freq_range {
            if !(lo > 0.0 && lo <= hi) {
                return Err(LarvaError::InvalidParameter(format!(
                    "{}: frequency range must satisfy 0 < min <= max, got [{}, {}]",
                    label, lo, hi
                )));
            }
            if freq < lo || freq > hi {
                return Err(LarvaError::InvalidParameter(format!(
                    "{}: frequency {} outside range [{}, {}]",
                    label, freq, lo, hi
                )));
            }
        }
        Ok(Self {
            label,
            dt,
            freq,
            freq_range,
            ticks_per_cycle: ticks_per_cycle(freq, dt),
            tick_in_cycle: 0,
            active: false,
            complete: false,
            cycles: 0,
            ticks_since_start: 0,
        })
    }

    /// Place the oscillator at a uniformly random position in its cycle.
    pub fn randomize_phase(&mut self, rng: &mut AgentRng) {
        self.tick_in_cycle = rng.index(self.ticks_per_cycle as usize) as u32;
    }

    pub fn set_frequency(&mut self, freq: f64) -> Result<()> {
        check_frequency(self.label, freq)?;
        let freq = match self.freq_range {
            Some([lo, hi]) => freq.clamp(lo, hi),
            None => freq,
        };
        let normalized = self.normalized_phase();
        self.freq = freq;
        self.ticks_per_cycle = ticks_per_cycle(freq, self.dt);
        self.tick_in_cycle =
            ((normalized * self.ticks_per_cycle as f64).round() as u32) % self.ticks_per_cycle;
        Ok(())
    }

    /// Move to the phase nearest `phase` (radians, any value; wrapped).
    pub fn set_phase(&mut self, phase: f64) {
        let normalized = phase.rem_euclid(TAU) / TAU;
        self.tick_in_cycle =
            ((normalized * self.ticks_per_cycle as f64).round() as u32) % self.ticks_per_cycle;
    }

    /// Advance one tick. Returns true if a cycle completed on this tick.
    pub fn advance(&mut self) -> bool {
        self.complete = false;
        if !self.active {
            return false;
        }
        self.ticks_since_start += 1;
        self.tick_in_cycle += 1;
        if self.tick_in_cycle >= self.ticks_per_cycle {
            self.tick_in_cycle = 0;
            self.complete = true;
            self.cycles += 1;
        }
        self.complete
    }

    pub fn start(&mut self) {
        if !self.active {
            self.active = true;
            self.ticks_since_start = 0;
            self.complete = false;
        }
    }

    pub fn stop(&mut self) {
        if self.active {
            tracing::trace!("{} stopped after {} ticks", self.label, self.ticks_since_start);
        }
        self.active = false;
        self.tick_in_cycle = 0;
        self.ticks_since_start = 0;
        self.complete = false;
    }

    pub fn phase(&self) -> f64 {
        TAU * self.normalized_phase()
    }

    /// Phase as a fraction of the cycle, in [0, 1).
    pub fn normalized_phase(&self) -> f64 {
        self.tick_in_cycle as f64 / self.ticks_per_cycle as f64
    }

    pub fn frequency(&self) -> f64 {
        self.freq
    }

    pub fn ticks_per_cycle(&self) -> u32 {
        self.ticks_per_cycle
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cycle_complete(&self) -> bool {
        self.complete
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn ticks_since_start(&self) -> u64 {
        self.ticks_since_start
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

fn check_frequency(label: &'static str, freq: f64) -> Result<()> {
    if freq > 0.0 && freq.is_finite() {
        Ok(())
    } else {
        Err(LarvaError::NonPositiveFrequency { effector: label, freq })
    }
}

fn ticks_per_cycle(freq: f64, dt: f64) -> u32 {
    ((1.0 / (freq * dt)).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_cycle() {
        let osc = Oscillator::new("crawler", 1.0, None, 0.1).unwrap();
        assert_eq!(osc.ticks_per_cycle(), 10);
        let fast = Oscillator::new("feeder", 2.0, None, 0.1).unwrap();
        assert_eq!(fast.ticks_per_cycle(), 5);
    }

    #[test]
    fn test_rejects_non_positive_frequency() {
        assert!(matches!(
            Oscillator::new("crawler", 0.0, None, 0.1),
            Err(LarvaError::NonPositiveFrequency { .. })
        ));
        let mut osc = Oscillator::new("crawler", 1.0, None, 0.1).unwrap();
        assert!(osc.set_frequency(-1.0).is_err());
        assert_eq!(osc.frequency(), 1.0);
    }

    #[test]
    fn test_cycle_completes_every_period() {
        let mut osc = Oscillator::new("crawler", 1.0, None, 0.1).unwrap();
        osc.start();
        let mut completions = vec![];
        for tick in 1..=30 {
            if osc.advance() {
                completions.push(tick);
            }
        }
        assert_eq!(completions, vec![10, 20, 30]);
        assert_eq!(osc.cycles(), 3);
    }

    #[test]
    fn test_complete_flag_lasts_one_tick() {
        let mut osc = Oscillator::new("feeder", 5.0, None, 0.1).unwrap();
        osc.start();
        assert!(!osc.advance());
        assert!(osc.advance());
        assert!(osc.cycle_complete());
        osc.advance();
        assert!(!osc.cycle_complete());
    }

    #[test]
    fn test_inactive_does_not_advance() {
        let mut osc = Oscillator::new("crawler", 1.0, None, 0.1).unwrap();
        for _ in 0..20 {
            assert!(!osc.advance());
        }
        assert_eq!(osc.phase(), 0.0);
        assert_eq!(osc.cycles(), 0);
    }

    #[test]
    fn test_stop_resets_phase_local_timers() {
        let mut osc = Oscillator::new("crawler", 1.0, None, 0.1).unwrap();
        osc.start();
        for _ in 0..4 {
            osc.advance();
        }
        assert_eq!(osc.ticks_since_start(), 4);
        osc.stop();
        assert_eq!(osc.ticks_since_start(), 0);
        assert_eq!(osc.phase(), 0.0);
    }

    #[test]
    fn test_set_frequency_preserves_normalized_phase() {
        let mut osc = Oscillator::new("crawler", 1.0, None, 0.1).unwrap();
        osc.start();
        for _ in 0..5 {
            osc.advance();
        }
        assert!((osc.normalized_phase() - 0.5).abs() < 1e-12);
        osc.set_frequency(0.5).unwrap();
        assert_eq!(osc.ticks_per_cycle(), 20);
        assert!((osc.normalized_phase() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_frequency_range_clamps_updates() {
        let mut osc = Oscillator::new("crawler", 1.5, Some([1.0, 2.0]), 0.1).unwrap();
        osc.set_frequency(10.0).unwrap();
        assert_eq!(osc.frequency(), 2.0);
        assert!(Oscillator::new("crawler", 3.0, Some([1.0, 2.0]), 0.1).is_err());
    }

    #[test]
    fn test_set_phase_wraps() {
        let mut osc = Oscillator::new("turner", 1.0, None, 0.1).unwrap();
        osc.set_phase(TAU + std::f64::consts::PI);
        assert!((osc.phase() - std::f64::consts::PI).abs() < 1e-12);
    }
}
