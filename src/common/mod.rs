//! Shared utilities: escaping, buffers, configuration, errors and logging.
pub mod buf;
pub mod config;
pub mod error;
pub mod json;
pub mod log;

pub use error::{LogVarCode, LogVarError, LogVarResult};
