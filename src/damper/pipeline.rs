use super::detectors::{OscillationDetector, SpikeDetector, MIN_SPIKE_SAMPLES};
use super::dsp::{self, LowPassFilter};
use super::momentum::{self, MomentumTable};
use super::types::{BufferFill, DamperCounters, IterationState, StatsSnapshot};
use crate::config::DamperConfig;
use crate::error::{DamperError, Result};

/// Extra learning-rate damping applied on a detected oscillation
pub const OSCILLATION_DAMPING: f64 = 0.8;

/// Blended deltas below this magnitude are not counted as momentum updates
const MOMENTUM_EPSILON: f64 = 1e-8;

/// Anti-oscillation damping pipeline.
///
/// Driven once per iteration of an outer learning loop. Owns all of its
/// state; use one instance per run and do not share it between loops.
#[derive(Debug, Clone)]
pub struct SignalDamper {
    config: DamperConfig,
    aggregate: LowPassFilter,
    spike: SpikeDetector,
    oscillation: OscillationDetector,
    momentum: MomentumTable,
    lr_scale: f64,
    iteration_count: u64,
    counters: DamperCounters,
}

impl SignalDamper {
    /// Build a damper, rejecting invalid configs up front
    pub fn new(config: DamperConfig) -> Result<Self> {
        config.validate()?;

        if !config.fast_mode && config.spike_window_size < MIN_SPIKE_SAMPLES {
            tracing::warn!(
                window = config.spike_window_size,
                required = MIN_SPIKE_SAMPLES,
                "spike window too small, spike detection will never fire"
            );
        }

        Ok(Self {
            aggregate: LowPassFilter::new(config.low_pass_alpha),
            spike: SpikeDetector::new(
                config.spike_window_size,
                config.spike_threshold,
                config.spike_lr_penalty,
            ),
            oscillation: OscillationDetector::new(
                config.oscillation_window_size,
                config.oscillation_baseline_rate,
                config.oscillation_threshold,
                config.oscillation_check_interval,
            ),
            momentum: MomentumTable::default(),
            lr_scale: 1.0,
            iteration_count: 0,
            counters: DamperCounters::default(),
            config,
        })
    }

    pub fn config(&self) -> &DamperConfig {
        &self.config
    }

    /// Current learning-rate multiplier, always in (0, 1]
    pub fn lr_scale(&self) -> f64 {
        self.lr_scale
    }

    pub fn iteration_count(&self) -> u64 {
        self.iteration_count
    }

    pub fn in_spike(&self) -> bool {
        self.spike.in_spike()
    }

    pub fn counters(&self) -> DamperCounters {
        self.counters
    }

    /// Smoothed momentum for a weight index, if it has been touched
    pub fn momentum(&self, index: usize) -> Option<f64> {
        self.momentum.get(index)
    }

    pub fn clip_gradient(&mut self, gradient: f64) -> f64 {
        let (out, clipped) = dsp::symmetric_clip(gradient, self.config.gradient_clip_value);
        if clipped {
            self.counters.clips_applied = self.counters.clips_applied.saturating_add(1);
        }
        out
    }

    /// Rescale a gradient vector to the configured L2 norm. No-op when
    /// `gradient_l2_norm` is unset.
    pub fn clip_gradient_l2(&mut self, gradients: &mut [f64]) {
        if let Some(max_norm) = self.config.gradient_l2_norm {
            if dsp::clip_l2(gradients, max_norm) {
                self.counters.clips_applied = self.counters.clips_applied.saturating_add(1);
            }
        }
    }

    pub fn apply_deadzone(&mut self, error: f64) -> f64 {
        let (out, fired) = dsp::deadzone(
            error,
            self.config.deadzone_tolerance,
            self.config.deadzone_mode,
        );
        if fired {
            self.counters.deadzones_applied = self.counters.deadzones_applied.saturating_add(1);
        }
        out
    }

    pub fn filter_aggregate(&mut self, value: f64) -> f64 {
        self.aggregate.process(value)
    }

    pub fn limit_integral_windup(&self, integral: f64) -> f64 {
        dsp::symmetric_clip(integral, self.config.integral_clip_value).0
    }

    /// Feed a cost into the spike detector and return the learning-rate
    /// multiplier for this step.
    pub fn detect_spike(&mut self, cost: f64, prev_cost: Option<f64>) -> f64 {
        let reading = if self.config.fast_mode {
            self.spike.sample_fast(cost, prev_cost)
        } else {
            self.spike.sample(cost, prev_cost)
        };

        if reading.flagged {
            self.counters.spikes_detected = self.counters.spikes_detected.saturating_add(1);
            tracing::debug!(
                iteration = self.iteration_count,
                cost,
                z = reading.z_score,
                "cost spike detected"
            );
        }
        reading.scale
    }

    /// Feed a cost into the oscillation detector. Always false in fast mode.
    pub fn detect_oscillation(&mut self, cost: f64) -> bool {
        if self.config.fast_mode {
            return false;
        }

        let oscillating = self.oscillation.sample(cost);
        if oscillating {
            self.counters.oscillations_detected =
                self.counters.oscillations_detected.saturating_add(1);
            tracing::debug!(
                iteration = self.iteration_count,
                sign_changes = self.oscillation.sign_changes(),
                window = self.oscillation.fill(),
                "cost oscillation detected"
            );
        }
        oscillating
    }

    /// Blend `delta` with the smoothed momentum for `index`
    pub fn apply_momentum(&mut self, index: usize, delta: f64) -> f64 {
        let m = self.momentum.update(index, delta, self.config.momentum_decay);
        let damped = momentum::blend(delta, m);
        if damped.abs() > MOMENTUM_EPSILON {
            self.counters.momentum_applied = self.counters.momentum_applied.saturating_add(1);
        }
        damped
    }

    pub fn clip_weight_delta(&self, delta: f64) -> f64 {
        dsp::symmetric_clip(delta, self.config.weight_delta_clip).0
    }

    /// Run the whole pipeline over one iteration's signals
    pub fn protect(&mut self, mut state: IterationState) -> IterationState {
        self.iteration_count = self.iteration_count.saturating_add(1);

        if let Some(g) = state.gradient {
            state.gradient = Some(self.clip_gradient(g));
        }
        if let Some(e) = state.error {
            state.error = Some(self.apply_deadzone(e));
        }
        if let Some(a) = state.aggregate {
            state.aggregate = Some(self.filter_aggregate(a));
        }
        if let Some(i) = state.integral {
            let limited = self.limit_integral_windup(i);
            let saturation =
                self.config.integral_saturation_threshold * self.config.integral_clip_value;
            if limited.abs() >= saturation {
                state.integral_saturated = true;
                tracing::trace!(integral = i, limit = self.config.integral_clip_value, "integral saturated");
            }
            state.integral = Some(limited);
        }

        let spike_scale = match state.cost {
            Some(cost) => self.detect_spike(cost, state.prev_cost),
            None => self.spike.current_scale(),
        };

        self.lr_scale = (self.lr_scale + self.config.lr_recovery_rate)
            .clamp(self.config.spike_lr_penalty, 1.0)
            * spike_scale;
        state.lr_scale = Some(self.lr_scale);

        if let Some(cost) = state.cost {
            if self.detect_oscillation(cost) {
                state.oscillation_detected = true;
                self.lr_scale *= OSCILLATION_DAMPING;
            }
        }

        state
    }

    /// Apply a damped gradient step to `weights` in place.
    ///
    /// Each delta is `-(lr * lr_scale) * gradient`, blended with per-index
    /// momentum and clipped to `weight_delta_clip`.
    pub fn protect_weight_update(
        &mut self,
        weights: &mut [f64],
        gradients: &[f64],
        lr: f64,
    ) -> Result<()> {
        if weights.len() != gradients.len() {
            return Err(DamperError::LengthMismatch {
                weights: weights.len(),
                gradients: gradients.len(),
            });
        }

        let effective_lr = lr * self.lr_scale;
        for (i, (w, g)) in weights.iter_mut().zip(gradients).enumerate() {
            let delta = self.apply_momentum(i, -effective_lr * g);
            *w += self.clip_weight_delta(delta);
        }
        Ok(())
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            counters: self.counters,
            lr_scale: self.lr_scale,
            in_spike: self.spike.in_spike(),
            iteration_count: self.iteration_count,
            buffer_sizes: BufferFill {
                spike: self.spike.fill(),
                oscillation: self.oscillation.fill(),
                momentum: self.momentum.len(),
            },
        }
    }

    /// Clear all run state back to construction defaults; the config stays
    pub fn reset(&mut self) {
        tracing::debug!(iterations = self.iteration_count, "damper reset");
        self.aggregate.reset();
        self.spike.reset();
        self.oscillation.reset();
        self.momentum.clear();
        self.lr_scale = 1.0;
        self.iteration_count = 0;
        self.counters = DamperCounters::default();
    }
}
