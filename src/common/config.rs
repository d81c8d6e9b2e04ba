//! Provider configuration: built-in defaults, an optional TOML file, then
//! environment overrides.
//!
//! ```toml
//! escape_mode = "strict"
//! log_level = "debug"
//! variables = ["json_uri", "json_host", "json_user_agent"]
//! ```

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::error::{LogVarError, LogVarResult};
use super::json::EscapeMode;
use crate::request::Field;

/// Path of the optional TOML file.
pub const CONFIG_ENV: &str = "LOGVAR_CONFIG";
pub const LOG_LEVEL_ENV: &str = "LOGVAR_LOG_LEVEL";
pub const ESCAPE_MODE_ENV: &str = "LOGVAR_ESCAPE_MODE";
/// Comma separated variable names, e.g. `json_uri,json_host`.
pub const VARIABLES_ENV: &str = "LOGVAR_VARIABLES";

/// Snapshot of configuration values consumed by the provider.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginCfg {
    /// Variables to register, in order.
    pub variables: Vec<Field>,
    pub escape_mode: EscapeMode,
    /// `tracing` filter directive used when the host has no `RUST_LOG`.
    pub log_level: String,
}

impl Default for PluginCfg {
    fn default() -> Self {
        Self {
            variables: Field::ALL.to_vec(),
            escape_mode: EscapeMode::Compact,
            log_level: "info".to_string(),
        }
    }
}

impl PluginCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> LogVarResult<Self> {
        let mut cfg = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_env(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> LogVarResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> LogVarResult<Self> {
        let mut cfg: Self = toml::from_str(text)?;
        cfg.dedup_variables();
        Ok(cfg)
    }

    /// Override values with whatever `lookup` returns for the `LOGVAR_*` keys.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> LogVarResult<()> {
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
        if let Some(mode) = lookup(ESCAPE_MODE_ENV) {
            self.escape_mode = mode.parse()?;
        }
        if let Some(list) = lookup(VARIABLES_ENV) {
            self.variables = parse_variable_list(&list)?;
            self.dedup_variables();
        }
        Ok(())
    }

    pub fn is_enabled(&self, field: Field) -> bool {
        self.variables.contains(&field)
    }

    fn dedup_variables(&mut self) {
        let mut seen = Vec::with_capacity(self.variables.len());
        self.variables.retain(|field| {
            if seen.contains(field) {
                false
            } else {
                seen.push(*field);
                true
            }
        });
    }
}

fn parse_variable_list(list: &str) -> LogVarResult<Vec<Field>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            Field::from_variable_name(name)
                .ok_or_else(|| LogVarError::UnknownVariable(name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_enable_every_variable() {
        let cfg = PluginCfg::default();
        assert!(cfg.is_enabled(Field::Uri));
        assert!(cfg.is_enabled(Field::Host));
        assert_eq!(cfg.variables.len(), Field::ALL.len());
        assert_eq!(cfg.escape_mode, EscapeMode::Compact);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn toml_overrides_defaults() {
        let cfg = PluginCfg::from_toml_str(
            r#"
            escape_mode = "strict"
            variables = ["json_host", "uri", "json_host"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.escape_mode, EscapeMode::Strict);
        assert_eq!(cfg.variables, vec![Field::Host, Field::Uri]);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn toml_rejects_unknown_keys_and_variables() {
        assert!(matches!(
            PluginCfg::from_toml_str("colour = true"),
            Err(LogVarError::Config(_))
        ));
        assert!(matches!(
            PluginCfg::from_toml_str(r#"variables = ["json_cookie"]"#),
            Err(LogVarError::Config(_))
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = PluginCfg::from_toml_str(r#"log_level = "warn""#).unwrap();
        cfg.apply_env(lookup(&[
            (LOG_LEVEL_ENV, "debug"),
            (ESCAPE_MODE_ENV, "STRICT"),
            (VARIABLES_ENV, " json_uri , json_user_agent ,"),
        ]))
        .unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.escape_mode, EscapeMode::Strict);
        assert_eq!(cfg.variables, vec![Field::Uri, Field::UserAgent]);
    }

    #[test]
    fn env_rejects_bad_values() {
        let mut cfg = PluginCfg::default();
        assert!(matches!(
            cfg.apply_env(lookup(&[(VARIABLES_ENV, "json_uri,json_cookie")])),
            Err(LogVarError::UnknownVariable(name)) if name == "json_cookie"
        ));
        assert!(cfg
            .apply_env(lookup(&[(ESCAPE_MODE_ENV, "loose")]))
            .is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            PluginCfg::from_file("/nonexistent/logvars.toml"),
            Err(LogVarError::Io(_))
        ));
    }
}
