//! # Larva Sensing
//!
//! Perception modules. A [`Sensor`] keeps per-channel gains and one leaky
//! activation in [−1, 1]; the specialised wrappers decide what a channel is:
//!
//! - [`Olfactor`]: odor concentrations, logarithmic perception
//! - [`Toucher`]: contact flags, plus contact/release events
//! - [`WindSensor`]: lateral wind component

mod olfactor;
mod sensor;
mod toucher;
mod wind;

pub use olfactor::Olfactor;
pub use sensor::Sensor;
pub use toucher::{ContactEvent, Toucher};
pub use wind::{WindSensor, WIND_CHANNEL};
