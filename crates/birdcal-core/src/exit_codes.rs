//! Exit codes for the birdcal CLI.
//!
//! Exit code ranges:
//! - 0-1: Success/operational outcomes (parse outcome from code, not output)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use birdcal_common::{Error, ErrorCategory};

/// Exit codes for birdcal operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Success / Operational Outcomes (0-1)
    // ========================================================================
    /// Success: report computed with every requested section
    Clean = 0,

    /// Report computed but carries an informational message instead of
    /// overall metrics (too few windows, surveys, or folds)
    InsufficientData = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Policy file missing required fields or failing validation
    ConfigError = 11,

    /// Windows or inventory structurally invalid
    InputError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::InsufficientData)
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::InsufficientData => "OK_INSUFFICIENT_DATA",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(error: &Error) -> Self {
        match (error.category(), error) {
            (_, Error::InvalidParameter { .. } | Error::UnknownModel(_)) => ExitCode::ArgsError,
            (ErrorCategory::Config, _) => ExitCode::ConfigError,
            (ErrorCategory::Input, _) => ExitCode::InputError,
            (ErrorCategory::Numerical, _) => ExitCode::InternalError,
            // Malformed JSON input is an input problem, not a disk problem.
            (ErrorCategory::Io, Error::Json(_)) => ExitCode::InputError,
            (ErrorCategory::Io, _) => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
