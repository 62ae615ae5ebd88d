//! Toucher: tactile sensors along the body contour.
//!
//! Readings are 0/1 contact flags. Beyond the usual activation, a change to
//! contact or out of contact is reported as an event so the caller can drive
//! reflexive restarts and pauses. Events are read from the noise-free
//! readings, so `input_noise` only perturbs the activation.

use crate::sensor::Sensor;
use larva_core::{AgentRng, Result, SensorConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "channel", rename_all = "snake_case")]
pub enum ContactEvent {
    /// Reading rose by exactly 1 on this channel.
    Contact(String),
    /// Reading fell by exactly 1 on this channel.
    Release(String),
}

#[derive(Debug, Clone)]
pub struct Toucher {
    sensor: Sensor,
}

impl Toucher {
    pub fn new(cfg: &SensorConfig, dt: f64, rng: &mut AgentRng) -> Result<Self> {
        Ok(Self {
            sensor: Sensor::new(cfg, dt, rng)?,
        })
    }

    /// Consume one tick of contact readings. Returns the contact changes seen,
    /// in channel order.
    pub fn step<'a, I>(&mut self, rng: &mut AgentRng, contacts: I) -> Vec<ContactEvent>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.sensor.step(rng, contacts);
        self.sensor
            .raw_changes()
            .iter()
            .filter_map(|(channel, &dx)| {
                if dx == 1.0 {
                    Some(ContactEvent::Contact(channel.clone()))
                } else if dx == -1.0 {
                    Some(ContactEvent::Release(channel.clone()))
                } else {
                    None
                }
            })
            .collect()
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
