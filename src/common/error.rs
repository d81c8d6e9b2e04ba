//! Error handling primitives shared across the provider.
//!
//! `LogVarCode` is the stable numeric view returned, negated, by
//! `logvar_on_load`; `LogVarError` is what Rust callers see.

use std::os::raw::c_int;

use thiserror::Error;

/// Stable error codes that cross the FFI boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogVarCode {
    /// Input could not be decoded (bad escape, bad format string).
    InvalidInput = 1,
    /// A log chunk with the same name is already registered.
    Duplicate = 2,
    /// The host refused a registration.
    HostRejected = 3,
    /// Configuration could not be loaded.
    Config = 4,
}

impl LogVarCode {
    /// Negative status reported to C hosts.
    pub const fn as_status(self) -> c_int {
        -(self as c_int)
    }
}

/// Canonical error type for the provider.
#[derive(Debug, Error)]
pub enum LogVarError {
    #[error("invalid escape sequence at byte {offset}: {reason}")]
    InvalidEscape { offset: usize, reason: &'static str },

    #[error("malformed log format at byte {offset}: {reason}")]
    Format { offset: usize, reason: &'static str },

    #[error("log chunk `{0}` is already registered")]
    DuplicateChunk(String),

    #[error("unknown log variable `{0}`")]
    UnknownVariable(String),

    #[error("host rejected log chunk `{name}` (status {status})")]
    HostRejected { name: String, status: i32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type LogVarResult<T> = Result<T, LogVarError>;

impl LogVarError {
    /// Validation helper for the unescaper.
    pub const fn invalid_escape(offset: usize, reason: &'static str) -> Self {
        Self::InvalidEscape { offset, reason }
    }

    /// Validation helper for the format parser.
    pub const fn format(offset: usize, reason: &'static str) -> Self {
        Self::Format { offset, reason }
    }

    /// Map to the stable code reported across the FFI boundary.
    pub fn code(&self) -> LogVarCode {
        match self {
            Self::InvalidEscape { .. } | Self::Format { .. } | Self::UnknownVariable(_) => {
                LogVarCode::InvalidInput
            }
            Self::DuplicateChunk(_) => LogVarCode::Duplicate,
            Self::HostRejected { .. } => LogVarCode::HostRejected,
            Self::Config(_) | Self::Io(_) => LogVarCode::Config,
        }
    }
}

impl From<toml::de::Error> for LogVarError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
