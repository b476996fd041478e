//! birdcal calibration policy loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for policy.json
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation
//! - Config snapshots stamped on reports for reproducibility

pub mod policy;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use policy::{
    BacktestPolicy, CalibrationPolicy, CurvePolicy, ListingPolicy, PredictionPolicy,
    RebuildPolicy, DEFAULT_QUADRATIC_MIN_IMPROVEMENT,
};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_policy, ValidationError, ValidationResult};

use std::path::Path;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// A policy together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedPolicy {
    pub policy: CalibrationPolicy,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, read, parse, and validate the calibration policy.
///
/// Falls back to [`CalibrationPolicy::default`] when no policy file is found.
pub fn load_policy(cli_policy: Option<&Path>) -> ValidationResult<LoadedPolicy> {
    let paths = resolve_config(cli_policy);

    let Some(path) = paths.policy.clone() else {
        let policy = CalibrationPolicy::default();
        let snapshot = ConfigSnapshot::defaults_only(&policy);
        return Ok(LoadedPolicy {
            policy,
            paths,
            snapshot,
        });
    };

    let content = std::fs::read_to_string(&path).map_err(|e| {
        ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let policy = CalibrationPolicy::parse_json(&content)?;
    validate_policy(&policy)?;
    let snapshot = ConfigSnapshot::new(&policy, &paths, Some(&content));

    Ok(LoadedPolicy {
        policy,
        paths,
        snapshot,
    })
}
