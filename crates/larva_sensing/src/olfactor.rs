//! Olfactor: odor concentrations sensed as log ratios by default.

use crate::sensor::Sensor;
use larva_core::{AgentRng, Result, SensorConfig};

#[derive(Debug, Clone)]
pub struct Olfactor {
    sensor: Sensor,
}

impl Olfactor {
    pub fn new(cfg: &SensorConfig, dt: f64, rng: &mut AgentRng) -> Result<Self> {
        Ok(Self {
            sensor: Sensor::new(cfg, dt, rng)?,
        })
    }

    pub fn step<'a, I>(&mut self, rng: &mut AgentRng, concentrations: I) -> f64
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.sensor.step(rng, concentrations)
    }

    /// Last concentration perceived for `odor`.
    pub fn concentration(&self, odor: &str) -> Option<f64> {
        self.sensor.last_reading(odor)
    }

    /// Concentration change of `odor` on the last tick.
    pub fn concentration_change(&self, odor: &str) -> f64 {
        self.sensor.dx(odor)
    }

    pub fn activation(&self) -> f64 {
        self.sensor.activation()
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut Sensor {
        &mut self.sensor
    }
}
