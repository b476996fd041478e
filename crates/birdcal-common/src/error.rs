//! Error types for birdcal.
//!
//! Numerical degeneracy (too few points, collinear data, too few folds) is
//! never an error; it resolves to flat fits or an informational report
//! message. Errors here are structurally invalid input, configuration
//! problems, and I/O.
//!
//! Errors serialize to structured JSON for machine consumers:
//! ```json
//! {
//!   "code": 20,
//!   "category": "input",
//!   "message": "invalid calibration window 12: drone_density_per_hectare is NaN",
//!   "recoverable": true,
//!   "suggested_action": "rebuild_windows",
//!   "context": { "window_id": 12, "field": "drone_density_per_hectare" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::id::WindowId;

/// Result type alias for birdcal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Policy file and CLI parameter errors.
    Config,
    /// Malformed calibration windows or survey inventories.
    Input,
    /// Numerical failures that could not be resolved locally.
    Numerical,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Numerical => write!(f, "numerical"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested follow-up for automated callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Fix the offending input file and rerun.
    FixInput,
    /// Regenerate the calibration window set.
    RebuildWindows,
    /// Run `birdcal config validate`.
    RunCheck,
    /// Fall back to the built-in policy.
    ResetConfig,
    /// Retry the operation.
    Retry,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::RebuildWindows => write!(f, "rebuild_windows"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for birdcal.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid policy file: {0}")]
    InvalidPolicy(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    // Input data errors (20-29)
    #[error("invalid calibration window {id}: {field} {reason}")]
    InvalidWindow {
        id: WindowId,
        field: String,
        reason: String,
    },

    #[error("invalid fitter input: {0}")]
    NonFiniteInput(#[from] birdcal_math::InputError),

    #[error("invalid survey inventory: {0}")]
    InvalidInventory(String),

    #[error("unknown model '{0}' (expected best, linear, or quadratic)")]
    UnknownModel(String),

    // Numerical errors (30-39)
    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an [`Error::InvalidWindow`].
    pub fn invalid_window(id: WindowId, field: &str, reason: impl Into<String>) -> Self {
        Error::InvalidWindow {
            id,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable error code.
    ///
    /// - 10-19: Configuration errors
    /// - 20-29: Input data errors
    /// - 30-39: Numerical errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidPolicy(_) => 11,
            Error::InvalidParameter { .. } => 12,
            Error::InvalidWindow { .. } => 20,
            Error::NonFiniteInput(_) => 21,
            Error::InvalidInventory(_) => 22,
            Error::UnknownModel(_) => 23,
            Error::NumericalInstability(_) => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidPolicy(_) | Error::InvalidParameter { .. } => {
                ErrorCategory::Config
            }
            Error::InvalidWindow { .. }
            | Error::NonFiniteInput(_)
            | Error::InvalidInventory(_)
            | Error::UnknownModel(_) => ErrorCategory::Input,
            Error::NumericalInstability(_) => ErrorCategory::Numerical,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the caller can plausibly fix the problem and retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::NumericalInstability(_))
    }

    /// Suggested action for automated callers.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidPolicy(_) => SuggestedAction::ResetConfig,
            Error::InvalidParameter { .. } => SuggestedAction::FixInput,
            Error::InvalidWindow { .. } => SuggestedAction::RebuildWindows,
            Error::NonFiniteInput(_) => SuggestedAction::FixInput,
            Error::InvalidInventory(_) => SuggestedAction::FixInput,
            Error::UnknownModel(_) => SuggestedAction::FixInput,
            Error::NumericalInstability(_) => SuggestedAction::ManualIntervention,
            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::FixInput,
        }
    }

    /// Human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'birdcal config validate' to check the policy file.",
            Error::InvalidPolicy(_) => {
                "Fix policy.json or remove it to fall back to built-in defaults ('birdcal config show')."
            }
            Error::InvalidParameter { .. } => "Check the command-line parameter against 'birdcal --help'.",
            Error::InvalidWindow { .. } => {
                "The window set contains malformed records. Rebuild windows with 'birdcal windows rebuild'."
            }
            Error::NonFiniteInput(_) => "Remove NaN or infinite values from the input points.",
            Error::InvalidInventory(_) => {
                "Check the survey inventory file: every asset must reference a known survey."
            }
            Error::UnknownModel(_) => "Use --model best, --model linear, or --model quadratic.",
            Error::NumericalInstability(_) => {
                "Internal numerical issue. Report with the input window set attached."
            }
            Error::Io(_) => "Check that the file exists and is readable, then retry.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidPolicy(_) => "Invalid Policy Configuration",
            Error::InvalidParameter { .. } => "Invalid Parameter",
            Error::InvalidWindow { .. } => "Invalid Calibration Window",
            Error::NonFiniteInput(_) => "Non-finite Input",
            Error::InvalidInventory(_) => "Invalid Survey Inventory",
            Error::UnknownModel(_) => "Unknown Model",
            Error::NumericalInstability(_) => "Numerical Instability",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }

    /// Format for human consumption: headline, reason, fix.
    pub fn to_human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
    pub suggested_action: SuggestedAction,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidWindow { id, field, .. } => {
                context.insert("window_id".to_string(), serde_json::json!(id));
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::InvalidParameter { name, .. } => {
                context.insert("parameter".to_string(), serde_json::json!(name));
            }
            Error::NonFiniteInput(birdcal_math::InputError::NonFinite { index, .. }) => {
                context.insert("index".to_string(), serde_json::json!(index));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
