//! Streaming instability detectors over the cost signal
//!
//! Both detectors are cheap heuristics, not spectral analysis. Their
//! thresholds come from the config and are tuning knobs rather than derived
//! constants.

use super::ring::RingBuffer;

/// Samples required before the spike detector computes statistics
pub const MIN_SPIKE_SAMPLES: usize = 10;

/// Z-score below which an ongoing spike is considered over
pub const SPIKE_RECOVERY_Z: f64 = 1.0;

/// Variance guard for the z-score
pub const STD_EPSILON: f64 = 1e-8;

/// Outcome of one spike-detector sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeReading {
    /// Learning-rate multiplier for this step
    pub scale: f64,
    /// A new spike was flagged on this sample
    pub flagged: bool,
    pub z_score: f64,
}

/// Z-score outlier detector over recent |cost delta| magnitudes
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    deltas: RingBuffer,
    threshold: f64,
    penalty: f64,
    last_cost: f64,
    in_spike: bool,
}

impl SpikeDetector {
    pub fn new(window: usize, threshold: f64, penalty: f64) -> Self {
        Self {
            deltas: RingBuffer::new(window),
            threshold,
            penalty,
            last_cost: 0.0,
            in_spike: false,
        }
    }

    /// Feed one cost value. `prev_cost`, when given and different from the
    /// tracked last cost, replaces it as the delta reference.
    pub fn sample(&mut self, cost: f64, prev_cost: Option<f64>) -> SpikeReading {
        if let Some(prev) = prev_cost {
            if prev != self.last_cost {
                self.last_cost = prev;
            }
        }

        let delta = (cost - self.last_cost).abs();
        self.last_cost = cost;
        self.deltas.push(delta);

        let mut z_score = 0.0;
        if self.deltas.len() >= MIN_SPIKE_SAMPLES {
            let (mean, std) = self.deltas.mean_std(STD_EPSILON);
            z_score = (delta - mean) / std;

            if z_score > self.threshold {
                self.in_spike = true;
                return SpikeReading {
                    scale: self.penalty,
                    flagged: true,
                    z_score,
                };
            }

            if self.in_spike && z_score < SPIKE_RECOVERY_Z {
                self.in_spike = false;
            }
        }

        SpikeReading {
            scale: self.current_scale(),
            flagged: false,
            z_score,
        }
    }

    /// Absolute-delta check used in fast mode: no window statistics and no
    /// lingering spike state.
    pub fn sample_fast(&mut self, cost: f64, prev_cost: Option<f64>) -> SpikeReading {
        if let Some(prev) = prev_cost {
            self.last_cost = prev;
        }
        let delta = (cost - self.last_cost).abs();
        self.last_cost = cost;

        let flagged = delta > self.threshold * 2.0;
        SpikeReading {
            scale: if flagged { self.penalty } else { 1.0 },
            flagged,
            z_score: 0.0,
        }
    }

    /// Multiplier to use when no new cost arrives this step
    pub fn current_scale(&self) -> f64 {
        if self.in_spike {
            self.penalty
        } else {
            1.0
        }
    }

    pub fn in_spike(&self) -> bool {
        self.in_spike
    }

    pub fn last_cost(&self) -> f64 {
        self.last_cost
    }

    pub fn fill(&self) -> usize {
        self.deltas.len()
    }

    pub fn reset(&mut self) {
        self.deltas.clear();
        self.last_cost = 0.0;
        self.in_spike = false;
    }
}

/// Zero-crossing-rate detector over recent cost values.
///
/// Counts sign flips between consecutive first differences. A stable curve
/// flips at roughly `baseline_rate` of samples; more than `threshold` times
/// that is treated as oscillation.
#[derive(Debug, Clone)]
pub struct OscillationDetector {
    costs: RingBuffer,
    baseline_rate: f64,
    threshold: f64,
    check_interval: u64,
    samples: u64,
}

impl OscillationDetector {
    pub fn new(window: usize, baseline_rate: f64, threshold: f64, check_interval: u32) -> Self {
        Self {
            costs: RingBuffer::new(window),
            baseline_rate,
            threshold,
            check_interval: u64::from(check_interval.max(1)),
            samples: 0,
        }
    }

    /// Feed one cost value; true when this sample was evaluated and the
    /// window is oscillating.
    pub fn sample(&mut self, cost: f64) -> bool {
        self.costs.push(cost);
        self.samples = self.samples.saturating_add(1);

        if self.samples % self.check_interval != 0 {
            return false;
        }

        let filled = self.costs.len();
        if filled * 2 < self.costs.capacity() {
            return false;
        }

        let changes = self.sign_changes();
        let expected = filled as f64 * self.baseline_rate;
        changes as f64 > expected * self.threshold
    }

    /// Sign flips between consecutive first differences, oldest to newest
    pub fn sign_changes(&self) -> usize {
        let mut changes = 0;
        let mut prev_value: Option<f64> = None;
        let mut prev_delta: Option<f64> = None;

        for value in self.costs.iter() {
            if let Some(p) = prev_value {
                let delta = value - p;
                if let Some(d) = prev_delta {
                    if d * delta < 0.0 {
                        changes += 1;
                    }
                }
                prev_delta = Some(delta);
            }
            prev_value = Some(value);
        }
        changes
    }

    pub fn fill(&self) -> usize {
        self.costs.len()
    }

    pub fn reset(&mut self) {
        self.costs.clear();
        self.samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_after_flat_run() {
        let mut det = SpikeDetector::new(50, 3.0, 0.1);
        for _ in 0..14 {
            let reading = det.sample(1.0, None);
            assert_eq!(reading.scale, 1.0);
            assert!(!reading.flagged);
        }
        let reading = det.sample(1000.0, None);
        assert!(reading.flagged);
        assert_eq!(reading.scale, 0.1);
        assert!(det.in_spike());
    }

    #[test]
    fn test_no_spike_during_warm_up() {
        let mut det = SpikeDetector::new(50, 0.5, 0.1);
        let costs = [0.0, 0.0, 0.0, 5000.0, 0.0, 1e6, 3.0, -1e9, 42.0];
        for cost in costs {
            assert_eq!(det.sample(cost, None).scale, 1.0);
        }
        assert_eq!(det.fill(), 9);
    }

    #[test]
    fn test_spike_clears_when_quiet() {
        let mut det = SpikeDetector::new(20, 3.0, 0.25);
        for _ in 0..15 {
            det.sample(1.0, None);
        }
        assert!(det.sample(500.0, None).flagged);
        // Back to 500 flat: deltas of 0 are well below the window mean
        let reading = det.sample(500.0, None);
        assert!(!reading.flagged);
        assert!(reading.z_score < SPIKE_RECOVERY_Z);
        assert!(!det.in_spike());
        assert_eq!(reading.scale, 1.0);
    }

    #[test]
    fn test_prev_cost_overrides_reference() {
        let mut det = SpikeDetector::new(10, 3.0, 0.1);
        det.sample(5.0, None);
        det.sample(7.0, Some(6.5));
        assert_eq!(det.last_cost(), 7.0);
        // The second delta is |7 - 6.5|, not |7 - 5|
        assert_eq!(det.deltas.latest(), Some(0.5));
    }

    #[test]
    fn test_fast_mode_absolute_threshold() {
        let mut det = SpikeDetector::new(20, 3.0, 0.1);
        assert!(!det.sample_fast(5.0, None).flagged);
        assert!(!det.sample_fast(10.0, None).flagged);
        let reading = det.sample_fast(17.0, None);
        assert!(reading.flagged);
        assert_eq!(reading.scale, 0.1);
        assert!(!det.in_spike());
        assert_eq!(det.sample_fast(17.5, None).scale, 1.0);
    }

    #[test]
    fn test_alternating_costs_oscillate() {
        let mut det = OscillationDetector::new(20, 0.2, 1.5, 1);
        let mut fired = false;
        for i in 0..20 {
            let cost = if i % 2 == 0 { 1.0 } else { 2.0 };
            fired = det.sample(cost);
            if i < 9 {
                assert!(!fired, "fired before half full at {}", i);
            }
        }
        assert!(fired);
        assert_eq!(det.sign_changes(), 18);
    }

    #[test]
    fn test_monotone_costs_do_not_oscillate() {
        let mut det = OscillationDetector::new(20, 0.2, 1.5, 1);
        for i in 0..60 {
            assert!(!det.sample(100.0 - i as f64));
        }
        assert_eq!(det.sign_changes(), 0);
    }

    #[test]
    fn test_throttled_checks() {
        let mut det = OscillationDetector::new(10, 0.2, 1.5, 4);
        let results: Vec<bool> = (0..12)
            .map(|i| det.sample(if i % 2 == 0 { 0.0 } else { 1.0 }))
            .collect();
        // Only the 8th and 12th samples are evaluated once the window is half full
        for (i, fired) in results.iter().enumerate() {
            let n = i + 1;
            assert_eq!(*fired, n == 8 || n == 12, "sample {}", n);
        }
    }

    #[test]
    fn test_chronological_order_after_wrap() {
        let mut det = OscillationDetector::new(5, 0.2, 1.5, 1);
        // After wrap the ring holds 3,4,5,6,7: strictly increasing
        for v in [10.0, 0.0, 3.0, 4.0, 5.0, 6.0, 7.0] {
            det.sample(v);
        }
        assert_eq!(det.sign_changes(), 0);
    }
}
