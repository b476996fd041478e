//! Configuration snapshots for reproducible reports.
//!
//! A snapshot captures the exact policy a backtest or training run used, so a
//! stored report can be matched to the configuration that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::policy::CalibrationPolicy;
use crate::resolve::{ConfigPaths, ConfigSource};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    /// SHA-256 of the policy file content, or of the canonical default JSON.
    pub policy_hash: String,

    #[serde(default)]
    pub policy_path: Option<String>,

    pub policy_source: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub min_calls: u64,
    pub top_species: usize,
    pub quadratic_min_improvement: f64,
    pub max_days_apart: u32,
    pub buffer_meters: f64,
    pub sample_count: usize,
    pub interval_z: f64,
}

impl ConfigSnapshot {
    /// Create a snapshot from a loaded policy file.
    pub fn new(policy: &CalibrationPolicy, paths: &ConfigPaths, policy_json: Option<&str>) -> Self {
        let policy_hash = match policy_json {
            Some(raw) => hash_content(raw),
            None => hash_policy(policy),
        };

        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            policy_hash,
            policy_path: paths.policy.as_ref().map(|p| p.display().to_string()),
            policy_source: paths.policy_source.to_string(),
            summary: ConfigSummary::from(policy),
        }
    }

    /// Create a snapshot for built-in defaults (no policy file loaded).
    pub fn defaults_only(policy: &CalibrationPolicy) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            policy_hash: hash_policy(policy),
            policy_path: None,
            policy_source: ConfigSource::BuiltinDefault.to_string(),
            summary: ConfigSummary::from(policy),
        }
    }

    /// Check if this snapshot matches another (same config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.policy_hash == other.policy_hash
    }

    /// Short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.policy_hash[..12.min(self.policy_hash.len())]
    }
}

impl From<&CalibrationPolicy> for ConfigSummary {
    fn from(policy: &CalibrationPolicy) -> Self {
        ConfigSummary {
            min_calls: policy.backtest.min_calls,
            top_species: policy.backtest.top_species,
            quadratic_min_improvement: policy.backtest.quadratic_min_improvement,
            max_days_apart: policy.rebuild.max_days_apart,
            buffer_meters: policy.rebuild.buffer_meters,
            sample_count: policy.curve.sample_count,
            interval_z: policy.prediction.interval_z,
        }
    }
}

fn hash_policy(policy: &CalibrationPolicy) -> String {
    // serde_json output is deterministic for these struct-only types.
    let canonical = serde_json::to_string(policy).unwrap_or_default();
    hash_content(&canonical)
}

/// SHA-256 hex digest of content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content_is_stable() {
        let a = hash_content("{}");
        assert_eq!(a, hash_content("{}"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_content("{ }"));
    }

    #[test]
    fn test_defaults_snapshot() {
        let policy = CalibrationPolicy::default();
        let a = ConfigSnapshot::defaults_only(&policy);
        let b = ConfigSnapshot::defaults_only(&policy);
        assert!(a.matches(&b));
        assert_eq!(a.short_id().len(), 12);
        assert_eq!(a.policy_source, "builtin default");
        assert_eq!(a.summary.max_days_apart, 14);
    }

    #[test]
    fn test_changed_policy_changes_hash() {
        let mut policy = CalibrationPolicy::default();
        let a = ConfigSnapshot::defaults_only(&policy);
        policy.backtest.top_species = 2;
        let b = ConfigSnapshot::defaults_only(&policy);
        assert!(!a.matches(&b));
    }
}
