pub mod detectors;
pub mod dsp;
pub mod momentum;
pub mod pipeline;
pub mod ring;
pub mod types;

pub use pipeline::SignalDamper;
pub use types::{BufferFill, DamperCounters, IterationState, StatsSnapshot};
