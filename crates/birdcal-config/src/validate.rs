//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::policy::CalibrationPolicy;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound on plotted samples per curve.
pub const MAX_SAMPLE_COUNT: usize = 10_000;

/// Upper bound on auxiliary species features.
pub const MAX_TOP_SPECIES: usize = 50;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a calibration policy semantically.
pub fn validate_policy(policy: &CalibrationPolicy) -> ValidationResult<()> {
    if policy.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: policy.schema_version.clone(),
        });
    }

    let margin = policy.backtest.quadratic_min_improvement;
    if !margin.is_finite() || !(0.0..1.0).contains(&margin) {
        return Err(ValidationError::InvalidValue {
            field: "backtest.quadratic_min_improvement".to_string(),
            message: format!("Must be in [0, 1), got {}", margin),
        });
    }

    if policy.backtest.top_species > MAX_TOP_SPECIES {
        return Err(ValidationError::InvalidValue {
            field: "backtest.top_species".to_string(),
            message: format!(
                "Must be at most {}, got {}",
                MAX_TOP_SPECIES, policy.backtest.top_species
            ),
        });
    }

    let buffer = policy.rebuild.buffer_meters;
    if !buffer.is_finite() || buffer < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "rebuild.buffer_meters".to_string(),
            message: format!("Must be a non-negative number, got {}", buffer),
        });
    }

    if policy.listing.limit == 0 {
        return Err(ValidationError::InvalidValue {
            field: "listing.limit".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }

    let samples = policy.curve.sample_count;
    if samples == 0 || samples > MAX_SAMPLE_COUNT {
        return Err(ValidationError::InvalidValue {
            field: "curve.sample_count".to_string(),
            message: format!("Must be in [1, {}], got {}", MAX_SAMPLE_COUNT, samples),
        });
    }

    let z = policy.prediction.interval_z;
    if !z.is_finite() || z <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "prediction.interval_z".to_string(),
            message: format!("Must be positive, got {}", z),
        });
    }

    if policy.rebuild.max_days_apart > 365 {
        return Err(ValidationError::SemanticError(format!(
            "rebuild.max_days_apart ({}) spans more than a season; paired surveys would not describe the same population",
            policy.rebuild.max_days_apart
        )));
    }

    Ok(())
}
