//! # Larva Brain
//!
//! Composes the effectors, sensors and learned memory of one larva into a
//! single behaving agent. The caller supplies body length, field readings and
//! a reward flag every tick, and receives forward and angular activity plus
//! a feeding flag back.
//!
//! ```text
//!   readings ─► sensors ─► A_in ─────────────► turner ─► angular
//!                  ▲                              ▲
//!               memory          intermitter ─► coupling
//!                                   │
//!                                   ├─► crawler ─► linear
//!                                   └─► feeder  ─► feed
//! ```
//!
//! Everything is driven from one thread, one tick per call, and a fixed seed
//! reproduces a whole trajectory.

mod brain;
mod input;

pub use brain::Brain;
pub use input::{BrainInput, BrainOutput};
pub use larva_locomotor::{BoutKind, BoutRecord};
