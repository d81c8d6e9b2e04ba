//! JSON-escaped log variables (`json_uri`, `json_host`, ...) for application
//! server access logs.
//!
//! Rust hosts register the variables into a [`LogChunkRegistry`] and render
//! lines with [`LogFormat`]; C hosts load the `cdylib` and call
//! `logvar_on_load` with their registration function.
pub mod api;
pub mod common;
pub mod logvar;
pub mod request;

pub use common::config::PluginCfg;
pub use common::json::EscapeMode;
pub use common::{LogVarError, LogVarResult};
pub use logvar::{register, LogChunkRegistry, LogFormat};
pub use request::{Field, OwnedRequest, RequestView};
