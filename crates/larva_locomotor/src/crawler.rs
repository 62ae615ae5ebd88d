//! Crawler: the peristaltic stride generator.
//!
//! One oscillator cycle is one stride. The forward velocity over the cycle
//! follows one of three waveforms, is scaled by body length, and is never
//! negative.

use larva_core::{AgentRng, CrawlerConfig, CrawlerWaveform, Oscillator, Result};
use std::f64::consts::TAU;

#[derive(Debug, Clone)]
pub struct Crawler {
    osc: Oscillator,
    waveform: CrawlerWaveform,
    noise: f64,
    /// Stride length in body lengths; resampled every stride under the
    /// realistic waveform.
    step_ratio: f64,
    last_output: f64,
}

impl Crawler {
    pub fn new(cfg: &CrawlerConfig, dt: f64, rng: &mut AgentRng) -> Result<Self> {
        cfg.validate()?;
        let mut osc = Oscillator::new("crawler", cfg.freq, cfg.freq_range, dt)?;
        if cfg.random_phase {
            osc.randomize_phase(rng);
        }
        let mut crawler = Self {
            osc,
            waveform: cfg.waveform.clone(),
            noise: cfg.noise,
            step_ratio: 0.0,
            last_output: 0.0,
        };
        crawler.resample_step_ratio(rng);
        Ok(crawler)
    }

    /// Advance one tick and return the linear activity (body-length scaled).
    pub fn step(&mut self, rng: &mut AgentRng, body_length: f64) -> f64 {
        if !self.osc.is_active() {
            self.osc.advance();
            self.last_output = 0.0;
            return 0.0;
        }
        if self.osc.advance() {
            self.resample_step_ratio(rng);
        }
        let activity = self.waveform_value();
        let perturbed = activity * body_length + rng.normal(0.0, self.noise * body_length);
        self.last_output = perturbed.max(0.0);
        self.last_output
    }

    /// Normalised activity (body lengths per second) at the current phase.
    pub fn waveform_value(&self) -> f64 {
        let phase = self.osc.phase();
        match self.waveform {
            CrawlerWaveform::Realistic { k, l, max_vel_phase, .. } => {
                self.osc.frequency() * self.step_ratio * (k + l * (phase - max_vel_phase).cos())
            }
            CrawlerWaveform::Square { amp, duty } => {
                if phase / TAU < duty {
                    amp
                } else {
                    0.0
                }
            }
            CrawlerWaveform::Gaussian { amp, std } => {
                let x = phase / TAU - 0.5;
                amp * (-(x * x) / (2.0 * std * std)).exp()
            }
        }
    }

    fn resample_step_ratio(&mut self, rng: &mut AgentRng) {
        if let CrawlerWaveform::Realistic { step_ratio_mean, step_ratio_std, .. } = self.waveform {
            self.step_ratio = rng.normal(step_ratio_mean, step_ratio_std);
        }
    }

    pub fn start(&mut self) {
        self.osc.start();
    }

    pub fn stop(&mut self) {
        self.osc.stop();
        self.last_output = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.osc.is_active()
    }

    pub fn cycle_complete(&self) -> bool {
        self.osc.cycle_complete()
    }

    pub fn step_ratio(&self) -> f64 {
        self.step_ratio
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.osc
    }

    pub fn oscillator_mut(&mut self) -> &mut Oscillator {
        &mut self.osc
    }
}
