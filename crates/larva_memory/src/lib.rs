//! # Larva Memory
//!
//! Online tabular Q-learning of sensor gains. The memory watches a sensor's
//! differentials and a reward flag, and periodically proposes a new gain
//! vector for the sensor to adopt. Training stops after a fixed duration.

mod rl;

pub use rl::{Action, GainUpdate, QTable, RlMemory, MAX_Q_CELLS};
