use crate::error::{DamperError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default settings
pub const DEFAULT_GRADIENT_CLIP: f64 = 5.0;
pub const DEFAULT_DEADZONE_TOLERANCE: f64 = 0.001;
pub const DEFAULT_LOW_PASS_ALPHA: f64 = 0.2;
pub const DEFAULT_INTEGRAL_CLIP: f64 = 3.0;
pub const DEFAULT_WEIGHT_DELTA_CLIP: f64 = 0.1;
pub const DEFAULT_MOMENTUM_DECAY: f64 = 0.95;
pub const DEFAULT_SPIKE_THRESHOLD: f64 = 3.0;
pub const DEFAULT_SPIKE_WINDOW: usize = 50;
pub const DEFAULT_OSCILLATION_WINDOW: usize = 100;
pub const DEFAULT_OSCILLATION_THRESHOLD: f64 = 1.5;
pub const DEFAULT_OSCILLATION_BASELINE_RATE: f64 = 0.2;
pub const DEFAULT_LR_RECOVERY_RATE: f64 = 0.02;
pub const DEFAULT_SPIKE_LR_PENALTY: f64 = 0.1;
pub const DEFAULT_INTEGRAL_SATURATION: f64 = 0.8;

const CONFIG_DIR: &str = "signal-damper";
const CONFIG_FILE: &str = "damper.toml";

/// How errors inside the deadzone are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadzoneMode {
    /// Quadratic taper toward zero, continuous at the tolerance
    #[default]
    Soft,
    /// Snap to zero
    Hard,
}

/// Window/throttle presets trading detection accuracy for latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    /// Statistical detectors off, absolute spike threshold only
    Fast,
    /// Default windows, oscillation checked every 10th sample
    #[default]
    Balanced,
    /// Large windows, every sample checked
    Strict,
}

/// Damper configuration. Immutable once a damper is built from it.
///
/// Every field has a default, so a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamperConfig {
    /// Max gradient magnitude
    pub gradient_clip_value: f64,
    /// Optional L2 norm limit for whole gradient vectors
    pub gradient_l2_norm: Option<f64>,
    /// Errors below this magnitude fall into the deadzone
    pub deadzone_tolerance: f64,
    pub deadzone_mode: DeadzoneMode,
    /// EMA coefficient (0-1, lower = more damping)
    pub low_pass_alpha: f64,
    /// Anti-windup clamp for the integral term
    pub integral_clip_value: f64,
    /// Fraction of `integral_clip_value` at which the integral is flagged saturated
    pub integral_saturation_threshold: f64,
    /// Max delta per weight per step
    pub weight_delta_clip: f64,
    pub momentum_decay: f64,
    /// Z-score above which a cost delta counts as a spike
    pub spike_threshold: f64,
    pub spike_window_size: usize,
    pub oscillation_window_size: usize,
    /// Multiple of the baseline sign-change count that signals oscillation
    pub oscillation_threshold: f64,
    /// Sign-change rate of a stable cost curve
    pub oscillation_baseline_rate: f64,
    /// Evaluate the oscillation detector every N samples
    pub oscillation_check_interval: u32,
    /// Per-step recovery of the learning-rate scale
    pub lr_recovery_rate: f64,
    /// Learning-rate scale applied during a spike
    pub spike_lr_penalty: f64,
    /// Skip the statistical detectors
    pub fast_mode: bool,
}

impl Default for DamperConfig {
    fn default() -> Self {
        Self {
            gradient_clip_value: DEFAULT_GRADIENT_CLIP,
            gradient_l2_norm: None,
            deadzone_tolerance: DEFAULT_DEADZONE_TOLERANCE,
            deadzone_mode: DeadzoneMode::Soft,
            low_pass_alpha: DEFAULT_LOW_PASS_ALPHA,
            integral_clip_value: DEFAULT_INTEGRAL_CLIP,
            integral_saturation_threshold: DEFAULT_INTEGRAL_SATURATION,
            weight_delta_clip: DEFAULT_WEIGHT_DELTA_CLIP,
            momentum_decay: DEFAULT_MOMENTUM_DECAY,
            spike_threshold: DEFAULT_SPIKE_THRESHOLD,
            spike_window_size: DEFAULT_SPIKE_WINDOW,
            oscillation_window_size: DEFAULT_OSCILLATION_WINDOW,
            oscillation_threshold: DEFAULT_OSCILLATION_THRESHOLD,
            oscillation_baseline_rate: DEFAULT_OSCILLATION_BASELINE_RATE,
            oscillation_check_interval: 1,
            lr_recovery_rate: DEFAULT_LR_RECOVERY_RATE,
            spike_lr_penalty: DEFAULT_SPIKE_LR_PENALTY,
            fast_mode: false,
        }
    }
}

impl DamperConfig {
    /// Preset windows for a performance mode, everything else at defaults
    pub fn for_mode(mode: PerformanceMode) -> Self {
        match mode {
            PerformanceMode::Fast => Self {
                spike_window_size: 20,
                oscillation_window_size: 30,
                fast_mode: true,
                ..Self::default()
            },
            PerformanceMode::Balanced => Self {
                oscillation_check_interval: 10,
                ..Self::default()
            },
            PerformanceMode::Strict => Self {
                spike_window_size: 100,
                oscillation_window_size: 200,
                ..Self::default()
            },
        }
    }

    /// Check every field. Called by `SignalDamper::new` so a bad config is
    /// rejected before the first iteration.
    pub fn validate(&self) -> Result<()> {
        positive("gradient_clip_value", self.gradient_clip_value)?;
        positive("deadzone_tolerance", self.deadzone_tolerance)?;
        positive("integral_clip_value", self.integral_clip_value)?;
        positive("weight_delta_clip", self.weight_delta_clip)?;
        positive("spike_threshold", self.spike_threshold)?;
        positive("oscillation_threshold", self.oscillation_threshold)?;
        positive("oscillation_baseline_rate", self.oscillation_baseline_rate)?;
        if let Some(norm) = self.gradient_l2_norm {
            positive("gradient_l2_norm", norm)?;
        }

        unit_interval("low_pass_alpha", self.low_pass_alpha)?;
        unit_interval("momentum_decay", self.momentum_decay)?;
        unit_interval(
            "integral_saturation_threshold",
            self.integral_saturation_threshold,
        )?;

        if !(self.spike_lr_penalty > 0.0 && self.spike_lr_penalty <= 1.0) {
            return Err(DamperError::invalid(
                "spike_lr_penalty",
                format!("must be in (0, 1], got {}", self.spike_lr_penalty),
            ));
        }
        if !(self.lr_recovery_rate.is_finite() && self.lr_recovery_rate >= 0.0) {
            return Err(DamperError::invalid(
                "lr_recovery_rate",
                format!("must be finite and >= 0, got {}", self.lr_recovery_rate),
            ));
        }
        if self.spike_window_size == 0 {
            return Err(DamperError::invalid("spike_window_size", "must be at least 1"));
        }
        if self.oscillation_window_size == 0 {
            return Err(DamperError::invalid(
                "oscillation_window_size",
                "must be at least 1",
            ));
        }
        if self.oscillation_check_interval == 0 {
            return Err(DamperError::invalid(
                "oscillation_check_interval",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// `<config dir>/signal-damper/damper.toml`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from the default path, falling back to defaults if no file exists.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading damper config");
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "no damper config found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DamperError::invalid(
            field,
            format!("must be finite and > 0, got {}", value),
        ))
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DamperError::invalid(
            field,
            format!("must be in [0, 1], got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DamperConfig::default().validate().is_ok());
        for mode in [
            PerformanceMode::Fast,
            PerformanceMode::Balanced,
            PerformanceMode::Strict,
        ] {
            assert!(DamperConfig::for_mode(mode).validate().is_ok());
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DamperConfig::from_toml_str(
            "gradient_clip_value = 2.5\ndeadzone_mode = \"hard\"\n",
        )
        .unwrap();

        assert_eq!(config.gradient_clip_value, 2.5);
        assert_eq!(config.deadzone_mode, DeadzoneMode::Hard);
        assert_eq!(config.spike_window_size, DEFAULT_SPIKE_WINDOW);
        assert_eq!(config.low_pass_alpha, DEFAULT_LOW_PASS_ALPHA);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = DamperConfig {
            gradient_l2_norm: Some(10.0),
            ..DamperConfig::for_mode(PerformanceMode::Strict)
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(DamperConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_alpha_out_of_range() {
        let config = DamperConfig {
            low_pass_alpha: 1.5,
            ..DamperConfig::default()
        };
        match config.validate() {
            Err(DamperError::InvalidConfig { field, .. }) => assert_eq!(field, "low_pass_alpha"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_negative_clip_and_zero_penalty() {
        let negative = DamperConfig {
            weight_delta_clip: -0.1,
            ..DamperConfig::default()
        };
        assert!(negative.validate().is_err());

        let zero_penalty = DamperConfig {
            spike_lr_penalty: 0.0,
            ..DamperConfig::default()
        };
        assert!(zero_penalty.validate().is_err());

        let nan_clip = DamperConfig {
            gradient_clip_value: f64::NAN,
            ..DamperConfig::default()
        };
        assert!(nan_clip.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_windows() {
        let config = DamperConfig {
            oscillation_window_size: 0,
            ..DamperConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DamperConfig {
            oscillation_check_interval: 0,
            ..DamperConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            DamperConfig::from_toml_str("spike_window_size = \"big\""),
            Err(DamperError::ConfigParse(_))
        ));
    }
}
