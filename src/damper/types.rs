use serde::{Deserialize, Serialize};

/// One iteration's signals, as handed to `SignalDamper::protect`.
///
/// Every input is optional; absent fields pass through untouched. The JSON
/// names follow the control loop's notation (`J`, `dJdy`, `I`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationState {
    /// Cost J
    #[serde(rename = "J", skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Cost of the previous iteration, when the caller tracks it
    #[serde(rename = "prevJ", skip_serializing_if = "Option::is_none")]
    pub prev_cost: Option<f64>,
    /// dJ/dy
    #[serde(rename = "dJdy", skip_serializing_if = "Option::is_none")]
    pub gradient: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
    /// Integral accumulator
    #[serde(rename = "I", skip_serializing_if = "Option::is_none")]
    pub integral: Option<f64>,
    #[serde(rename = "aggr", skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<f64>,

    /// Learning-rate multiplier, written by `protect`
    #[serde(rename = "lrScale", skip_serializing_if = "Option::is_none")]
    pub lr_scale: Option<f64>,
    #[serde(rename = "oscillationDetected")]
    pub oscillation_detected: bool,
    #[serde(rename = "integralSaturated")]
    pub integral_saturated: bool,
}

impl IterationState {
    pub fn with_cost(cost: f64) -> Self {
        Self {
            cost: Some(cost),
            ..Self::default()
        }
    }
}

/// Monotonic event counters, cleared only by `reset()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamperCounters {
    pub clips_applied: u64,
    pub deadzones_applied: u64,
    pub spikes_detected: u64,
    pub oscillations_detected: u64,
    pub momentum_applied: u64,
}

/// Fill levels of the internal buffers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferFill {
    pub spike: usize,
    pub oscillation: usize,
    pub momentum: usize,
}

/// Point-in-time view for telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(flatten)]
    pub counters: DamperCounters,
    pub lr_scale: f64,
    pub in_spike: bool,
    pub iteration_count: u64,
    pub buffer_sizes: BufferFill,
}
