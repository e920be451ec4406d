//! Scalar conditioning stages
//!
//! Symmetric clamps, the low-pass filter on the aggregate, and L2 rescaling of
//! gradient vectors. The deadzone taper lives in `dsp/deadzone.rs`.

mod deadzone;

pub use deadzone::deadzone;

/// Guard added to norms and variances before dividing
pub const NORM_EPSILON: f64 = 1e-8;

/// Clamp to `[-limit, +limit]`. Returns the value and whether it was clipped.
/// NaN passes through unclipped.
#[inline]
pub fn symmetric_clip(value: f64, limit: f64) -> (f64, bool) {
    if value > limit {
        (limit, true)
    } else if value < -limit {
        (-limit, true)
    } else {
        (value, false)
    }
}

/// Rescale `values` in place so their L2 norm does not exceed `max_norm`.
/// Returns true when rescaling happened.
pub fn clip_l2(values: &mut [f64], max_norm: f64) -> bool {
    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > max_norm {
        let scale = max_norm / (norm + NORM_EPSILON);
        for v in values.iter_mut() {
            *v *= scale;
        }
        true
    } else {
        false
    }
}

/// Exponential moving average, seeded by its first input
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f64,
    value: f64,
    initialized: bool,
}

impl LowPassFilter {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            value: 0.0,
            initialized: false,
        }
    }

    pub fn process(&mut self, input: f64) -> f64 {
        if !self.initialized {
            self.value = input;
            self.initialized = true;
        } else {
            self.value = self.alpha * input + (1.0 - self.alpha) * self.value;
        }
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.initialized = false;
    }
}
