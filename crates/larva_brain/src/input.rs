//! What crosses the brain boundary each tick.

use larva_core::RoutingConfig;
use larva_locomotor::BoutKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static NO_READINGS: BTreeMap<String, f64> = BTreeMap::new();

/// Inbound signals for one tick.
#[derive(Debug, Clone, Copy)]
pub struct BrainInput<'a> {
    /// Body length of the agent; scales forward velocity.
    pub body_length: f64,
    /// Field readings by channel: odor concentrations, 0/1 contact flags,
    /// wind direction and speed.
    pub readings: &'a BTreeMap<String, f64>,
    /// Food currently detected.
    pub reward: bool,
}

impl<'a> BrainInput<'a> {
    pub fn new(body_length: f64, readings: &'a BTreeMap<String, f64>) -> Self {
        Self {
            body_length,
            readings,
            reward: false,
        }
    }

    /// Input with an empty field.
    pub fn without_readings(body_length: f64) -> BrainInput<'static> {
        BrainInput {
            body_length,
            readings: &NO_READINGS,
            reward: false,
        }
    }

    pub fn with_reward(mut self, reward: bool) -> Self {
        self.reward = reward;
        self
    }
}

/// Outbound motor command for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BrainOutput {
    /// Forward velocity, never negative.
    pub linear_activity: f64,
    /// Signed bending drive.
    pub angular_activity: f64,
    /// A bite completed on this tick.
    pub feed: bool,
    /// Bout in progress after this tick's update.
    pub bout: Option<BoutKind>,
    /// Combined sensory drive fed to the turner.
    pub a_in: f64,
}

/// Readings split by the sensor that consumes them.
#[derive(Debug, Default)]
pub(crate) struct Routed<'a> {
    pub odors: Vec<(&'a str, f64)>,
    pub contacts: Vec<(&'a str, f64)>,
    pub wind_direction: Option<f64>,
    pub wind_speed: Option<f64>,
}

pub(crate) fn route<'a>(readings: &'a BTreeMap<String, f64>, routing: &RoutingConfig) -> Routed<'a> {
    let mut routed = Routed::default();
    for (key, &value) in readings {
        if key.starts_with(routing.touch_prefix.as_str()) {
            routed.contacts.push((key.as_str(), value));
        } else if *key == routing.wind_direction_key {
            routed.wind_direction = Some(value);
        } else if *key == routing.wind_speed_key {
            routed.wind_speed = Some(value);
        } else {
            routed.odors.push((key.as_str(), value));
        }
    }
    routed
}
