//! Calibration policy types.
//!
//! Every tunable the calibration endpoints accept as a query parameter has a
//! policy default here; CLI flags override per invocation.

use serde::{Deserialize, Serialize};

/// Relative RMSE improvement quadratic must beat linear by to be recommended.
///
/// At 0.0 quadratic wins on any strict improvement and ties go to linear.
pub const DEFAULT_QUADRATIC_MIN_IMPROVEMENT: f64 = 0.0;

/// Complete calibration policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPolicy {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub backtest: BacktestPolicy,

    #[serde(default)]
    pub rebuild: RebuildPolicy,

    #[serde(default)]
    pub listing: ListingPolicy,

    #[serde(default)]
    pub curve: CurvePolicy,

    #[serde(default)]
    pub prediction: PredictionPolicy,

    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            backtest: BacktestPolicy::default(),
            rebuild: RebuildPolicy::default(),
            listing: ListingPolicy::default(),
            curve: CurvePolicy::default(),
            prediction: PredictionPolicy::default(),
            notes: None,
        }
    }
}

/// Model evaluation settings (summary, backtest, train, predict, curve).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestPolicy {
    /// Windows with fewer acoustic calls are ignored.
    pub min_calls: u64,
    /// Number of most-called species exposed as auxiliary features.
    pub top_species: usize,
    /// See [`DEFAULT_QUADRATIC_MIN_IMPROVEMENT`].
    pub quadratic_min_improvement: f64,
}

impl Default for BacktestPolicy {
    fn default() -> Self {
        Self {
            min_calls: 1,
            top_species: 5,
            quadratic_min_improvement: DEFAULT_QUADRATIC_MIN_IMPROVEMENT,
        }
    }
}

/// Window pairing tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildPolicy {
    pub max_days_apart: u32,
    pub buffer_meters: f64,
    pub min_acoustic_calls: u64,
}

impl Default for RebuildPolicy {
    fn default() -> Self {
        Self {
            max_days_apart: 14,
            buffer_meters: 150.0,
            min_acoustic_calls: 1,
        }
    }
}

/// Window listing defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingPolicy {
    pub min_calls: u64,
    pub limit: usize,
}

impl Default for ListingPolicy {
    fn default() -> Self {
        Self {
            min_calls: 0,
            limit: 200,
        }
    }
}

/// Plotting curve resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurvePolicy {
    pub sample_count: usize,
}

impl Default for CurvePolicy {
    fn default() -> Self {
        Self { sample_count: 50 }
    }
}

/// Density prediction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionPolicy {
    /// Normal quantile for the approximate prediction interval.
    pub interval_z: f64,
}

impl Default for PredictionPolicy {
    fn default() -> Self {
        Self { interval_z: 1.96 }
    }
}

impl CalibrationPolicy {
    /// Load policy from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::validate::ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::validate::ValidationError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse_json(&content)
    }

    /// Parse policy from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self, crate::validate::ValidationError> {
        serde_json::from_str(json).map_err(|e| {
            crate::validate::ValidationError::ParseError(format!("Invalid JSON: {}", e))
        })
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
