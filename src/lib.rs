pub mod app;
pub mod config;
pub mod damper;
pub mod error;

pub use config::{DamperConfig, DeadzoneMode, PerformanceMode};
pub use damper::{IterationState, SignalDamper, StatsSnapshot};
pub use error::DamperError;
