use signal_damper::damper::{BufferFill, DamperCounters};
use signal_damper::{DamperConfig, DamperError, DeadzoneMode, IterationState, SignalDamper};

/// Helper to create a damper with default settings
fn create_test_damper() -> SignalDamper {
    SignalDamper::new(DamperConfig::default()).unwrap()
}

#[test]
fn test_damper_initialization() {
    let damper = create_test_damper();
    let stats = damper.stats();
    assert_eq!(stats.lr_scale, 1.0);
    assert_eq!(stats.iteration_count, 0);
    assert!(!stats.in_spike);
    assert_eq!(stats.counters, DamperCounters::default());
    assert_eq!(stats.buffer_sizes, BufferFill::default());
}

#[test]
fn test_spike_on_fifteenth_cost() {
    let mut damper = create_test_damper();
    let costs: Vec<f64> = std::iter::repeat(1.0).take(14).chain([1000.0]).collect();

    let scales: Vec<f64> = costs.iter().map(|&c| damper.detect_spike(c, None)).collect();

    assert!(scales[..14].iter().all(|&s| s == 1.0));
    assert_eq!(scales[14], 0.1);
    assert_eq!(damper.stats().counters.spikes_detected, 1);
}

#[test]
fn test_soft_deadzone_value() {
    let mut damper = create_test_damper();
    let out = damper.apply_deadzone(0.0005);
    assert!((out - 0.000125).abs() < 1e-15);
    assert_eq!(damper.stats().counters.deadzones_applied, 1);
}

#[test]
fn test_zero_gradient_leaves_weights() {
    let mut damper = create_test_damper();
    let mut weights = vec![0.0; 4];
    let gradients = vec![0.0; 4];
    damper
        .protect_weight_update(&mut weights, &gradients, 0.01)
        .unwrap();
    assert!(weights.iter().all(|&w| w == 0.0));
}

#[test]
fn test_reset_after_activity() {
    let mut damper = create_test_damper();
    for i in 0..40 {
        let cost = if i % 7 == 0 { 50.0 } else { 1.0 + i as f64 * 0.01 };
        damper.protect(IterationState {
            cost: Some(cost),
            gradient: Some(8.0),
            error: Some(0.0001),
            ..IterationState::default()
        });
    }
    let mut weights = vec![0.1; 16];
    damper
        .protect_weight_update(&mut weights, &vec![3.0; 16], 0.05)
        .unwrap();
    assert!(damper.stats().counters.clips_applied > 0);

    damper.reset();
    let stats = damper.stats();
    assert_eq!(stats.lr_scale, 1.0);
    assert_eq!(stats.iteration_count, 0);
    assert_eq!(stats.buffer_sizes.momentum, 0);
    assert_eq!(damper.momentum(0), None);
}

#[test]
fn test_momentum_converges() {
    let mut damper = SignalDamper::new(DamperConfig {
        momentum_decay: 0.9,
        ..DamperConfig::default()
    })
    .unwrap();

    let d = 0.03;
    let mut last_gap = f64::INFINITY;
    for _ in 0..400 {
        damper.apply_momentum(2, d);
        let gap = (damper.momentum(2).unwrap() - d).abs();
        assert!(gap <= last_gap);
        last_gap = gap;
    }
    assert!(last_gap < 1e-12);
}

#[test]
fn test_lr_scale_bounds_under_chaos() {
    let mut damper = SignalDamper::new(DamperConfig {
        spike_window_size: 12,
        oscillation_window_size: 8,
        spike_threshold: 1.0,
        ..DamperConfig::default()
    })
    .unwrap();

    // deterministic chaotic sequence (logistic map)
    let mut x = 0.37;
    for _ in 0..2000 {
        x = 3.99 * x * (1.0 - x);
        let out = damper.protect(IterationState::with_cost(x * 100.0));
        let lr = out.lr_scale.unwrap();
        assert!(lr > 0.0 && lr <= 1.0);
        assert!(damper.lr_scale() > 0.0 && damper.lr_scale() <= 1.0);
    }
}

#[test]
fn test_ema_stays_within_input_bounds() {
    let mut damper = create_test_damper();
    for i in 0..200 {
        let v = -2.0 + ((i * 37) % 11) as f64 * 0.5; // values in [-2, 3]
        let y = damper.filter_aggregate(v);
        assert!((-2.0..=3.0).contains(&y));
    }
}

#[test]
fn test_hard_deadzone_from_toml() {
    let config = DamperConfig::from_toml_str("deadzone_mode = \"hard\"\ndeadzone_tolerance = 0.5\n").unwrap();
    assert_eq!(config.deadzone_mode, DeadzoneMode::Hard);

    let mut damper = SignalDamper::new(config).unwrap();
    let out = damper.protect(IterationState {
        error: Some(0.4),
        ..IterationState::default()
    });
    assert_eq!(out.error, Some(0.0));
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let result = SignalDamper::new(DamperConfig {
        low_pass_alpha: -0.1,
        ..DamperConfig::default()
    });
    assert!(matches!(result, Err(DamperError::InvalidConfig { .. })));
}

#[test]
fn test_stats_serialize_with_camel_case() {
    let mut damper = create_test_damper();
    damper.protect(IterationState::with_cost(1.0));
    let json = serde_json::to_value(damper.stats()).unwrap();
    assert_eq!(json["iterationCount"], 1);
    assert_eq!(json["spikesDetected"], 0);
    assert_eq!(json["bufferSizes"]["spike"], 1);
    assert_eq!(json["lrScale"], 1.0);
}
