use thiserror::Error;

/// Errors reported by the damper and its configuration layer.
///
/// Numeric input never produces an error; NaN and infinities flow through the
/// filters per IEEE semantics.
#[derive(Debug, Error)]
pub enum DamperError {
    #[error("invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("weights and gradients differ in length ({weights} vs {gradients})")]
    LengthMismatch { weights: usize, gradients: usize },

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl DamperError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DamperError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DamperError>;
