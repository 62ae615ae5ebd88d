//! Wind sensor. Only the lateral wind component reaches the activation.

use crate::sensor::Sensor;
use larva_core::{AgentRng, Result, SensorConfig};

pub const WIND_CHANNEL: &str = "wind";

#[derive(Debug, Clone)]
pub struct WindSensor {
    sensor: Sensor,
}

impl WindSensor {
    pub fn new(cfg: &SensorConfig, dt: f64, rng: &mut AgentRng) -> Result<Self> {
        Ok(Self {
            sensor: Sensor::new(cfg, dt, rng)?,
        })
    }

    /// `direction` is the wind angle relative to the head (radians),
    /// `speed` its magnitude.
    pub fn step(&mut self, rng: &mut AgentRng, direction: f64, speed: f64) -> f64 {
        let lateral = speed * direction.sin();
        self.sensor.step(rng, [(WIND_CHANNEL, lateral)])
    }

    /// Decay only; used on ticks without wind readings.
    pub fn idle(&mut self, rng: &mut AgentRng) -> f64 {
        self.sensor.step(rng, std::iter::empty())
    }

    pub fn activation(&self) -> f64 {
        self.sensor.activation()
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_lateral_component() {
        let mut rng = AgentRng::seeded(0);
        let cfg = SensorConfig::wind().with_gain(WIND_CHANNEL, 1.0);
        let mut w = WindSensor::new(&cfg, 0.1, &mut rng).unwrap();
        let a = w.step(&mut rng, FRAC_PI_2, 2.0);
        assert!((a - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_head_wind_has_no_effect() {
        let mut rng = AgentRng::seeded(0);
        let cfg = SensorConfig::wind().with_gain(WIND_CHANNEL, 1.0);
        let mut w = WindSensor::new(&cfg, 0.1, &mut rng).unwrap();
        assert!(w.step(&mut rng, 0.0, 5.0).abs() < 1e-12);
    }
}
