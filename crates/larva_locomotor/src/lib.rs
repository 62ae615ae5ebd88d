//! # Larva Locomotor
//!
//! The motor side of the behavior core.
//!
//! ## Effectors
//!
//! - [`Crawler`]: peristaltic strides, one oscillator cycle per stride
//! - [`Feeder`]: mouth-hook bites, one oscillator cycle per bite
//! - [`Turner`]: lateral bending, oscillatory or neural
//!
//! ## Arbitration
//!
//! - [`Intermitter`]: decides whether the larva pauses, crawls or feeds
//! - [`Coupling`]: suppresses the turner while crawler/feeder are mid-stroke
//!
//! Every type here advances only when its `step`/`update` is called.

mod coupling;
mod crawler;
mod feeder;
mod intermitter;
mod turner;

pub use coupling::{Coupling, PhaseState, TurnerInhibition};
pub use crawler::Crawler;
pub use feeder::Feeder;
pub use intermitter::{BoutKind, BoutRecord, BoutState, Intermitter, IntermitterSummary};
pub use turner::Turner;
