//! birdcal common types, IDs, and errors.
//!
//! This crate provides foundational types shared across birdcal-core modules:
//! - Survey, sensor, and window identity types
//! - The calibration window record and its upstream-data checks
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;
pub mod window;

pub use error::{Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use id::{AruId, AssetId, SurveyId, WindowId};
pub use output::OutputFormat;
pub use window::{CalibrationWindow, RejectReason, WindowDraft, WindowStatus};

/// Schema version stamped on every JSON payload the CLI emits.
pub const SCHEMA_VERSION: &str = "1.0.0";
