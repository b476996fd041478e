//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths → defaults.

use std::path::{Path, PathBuf};

/// Discovered configuration file paths.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to policy.json (or None if not found).
    pub policy: Option<PathBuf>,

    /// Source of the policy config (for diagnostics).
    pub policy_source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/birdcal/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_POLICY_PATH: &str = "BIRDCAL_POLICY";
pub const ENV_CONFIG_DIR: &str = "BIRDCAL_CONFIG_DIR";

const POLICY_FILENAME: &str = "policy.json";

/// Application name for XDG directories.
const APP_NAME: &str = "birdcal";

/// Resolve the policy path.
///
/// 1. Explicit CLI path (if it exists)
/// 2. `BIRDCAL_POLICY`
/// 3. `BIRDCAL_CONFIG_DIR` + `policy.json`
/// 4. XDG config directory (~/.config/birdcal/)
/// 5. System config (/etc/birdcal/)
/// 6. Built-in defaults (None)
pub fn resolve_config(cli_policy: Option<&Path>) -> ConfigPaths {
    let mut paths = ConfigPaths::default();
    paths.policy = resolve_single_config(cli_policy, POLICY_FILENAME, &mut paths.policy_source);
    paths
}

fn resolve_single_config(
    cli_path: Option<&Path>,
    filename: &str,
    source: &mut ConfigSource,
) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        if path.exists() {
            *source = ConfigSource::CliArgument;
            return Some(path.to_path_buf());
        }
    }

    if let Ok(env_path) = std::env::var(ENV_POLICY_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            *source = ConfigSource::Environment;
            return Some(path);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(filename);
        if path.exists() {
            *source = ConfigSource::Environment;
            return Some(path);
        }
    }

    if let Some(xdg_config) = xdg_config_dir() {
        let path = xdg_config.join(filename);
        if path.exists() {
            *source = ConfigSource::XdgConfig;
            return Some(path);
        }
    }

    let system_path = system_config_dir().join(filename);
    if system_path.exists() {
        *source = ConfigSource::SystemConfig;
        return Some(system_path);
    }

    *source = ConfigSource::BuiltinDefault;
    None
}

/// XDG config directory for birdcal.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// System config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::BuiltinDefault), "builtin default");
    }

    #[test]
    fn test_cli_path_wins() {
        let dir = std::env::temp_dir();
        let paths = resolve_config(Some(&dir));
        assert_eq!(paths.policy.as_deref(), Some(dir.as_path()));
        assert_eq!(paths.policy_source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_system_dir_name() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/birdcal"));
    }
}
