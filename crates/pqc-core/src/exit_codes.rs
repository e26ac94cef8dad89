//! Exit codes for the `pqc` CLI.
//!
//! Exit codes communicate the run outcome without requiring output parsing.

/// Exit codes for consolidator operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every partition consolidated, skipped or planned
    Success = 0,

    /// Some partitions failed
    PartialFail = 3,

    /// Every attempted partition failed
    AllFailed = 4,

    /// Configuration error
    ConfigError = 10,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Success
    }

    /// Check if this exit code indicates an error outside partition processing.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
