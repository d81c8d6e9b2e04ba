//! In-process chunk registry for Rust hosts.
//!
//! Filled once at startup through [`register`](super::service::register) and
//! read-only afterwards, so it can be shared across request threads behind an
//! `Arc`.

use std::collections::HashMap;

use tracing::debug;

use crate::common::buf::EscapedBuf;
use crate::common::error::{LogVarError, LogVarResult};
use crate::request::RequestView;

use super::domain::{ChunkRegistry, LogChunk};

#[derive(Clone, Debug)]
struct Entry {
    chunk: LogChunk,
    args: u8,
}

/// Log chunks keyed by variable name.
#[derive(Clone, Debug, Default)]
pub struct LogChunkRegistry {
    chunks: HashMap<String, Entry>,
}

impl LogChunkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the chunk registered under `name`, if any.
    pub fn resolve(&self, name: &str, ctx: &dyn RequestView) -> Option<EscapedBuf> {
        self.chunks.get(name).map(|entry| entry.chunk.call(ctx))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.chunks.contains_key(name)
    }

    /// Argument slots the chunk was registered with.
    pub fn args(&self, name: &str) -> Option<u8> {
        self.chunks.get(name).map(|entry| entry.args)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.chunks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ChunkRegistry for LogChunkRegistry {
    fn register_chunk(&mut self, chunk: LogChunk, args: u8) -> LogVarResult<()> {
        if self.chunks.contains_key(chunk.name) {
            return Err(LogVarError::DuplicateChunk(chunk.name.to_string()));
        }
        debug!(variable = chunk.name, args, "added log chunk");
        self.chunks.insert(chunk.name.to_string(), Entry { chunk, args });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PluginCfg;
    use crate::common::json::EscapeMode;
    use crate::logvar::service::register;
    use crate::request::{Field, OwnedRequest};

    fn loaded() -> LogChunkRegistry {
        let mut registry = LogChunkRegistry::new();
        register(&mut registry, &PluginCfg::default()).unwrap();
        registry
    }

    #[test]
    fn default_registration_contains_uri_and_host() {
        let registry = loaded();
        assert!(registry.contains("json_uri"));
        assert!(registry.contains("json_host"));
        assert_eq!(registry.len(), Field::ALL.len());
        assert_eq!(registry.args("json_uri"), Some(1));
        assert_eq!(registry.names()[0], "json_host");
    }

    #[test]
    fn resolves_registered_names_only() {
        let registry = loaded();
        let req = OwnedRequest::new("/p?\"q\"", "h");
        assert_eq!(
            registry.resolve("json_uri", &req).unwrap().as_slice(),
            b"/p?\\\"q\\\""
        );
        assert!(registry.resolve("uri", &req).is_none());
        assert!(registry.resolve("json_cookie", &req).is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = loaded();
        let err = registry
            .register_chunk(LogChunk::new(Field::Uri, EscapeMode::Strict), 1)
            .unwrap_err();
        assert!(matches!(err, LogVarError::DuplicateChunk(ref name) if name == "json_uri"));
        assert!(register(&mut registry, &PluginCfg::default()).is_err());
    }

    #[test]
    fn mode_is_taken_from_registration() {
        let mut registry = LogChunkRegistry::new();
        let cfg = PluginCfg {
            variables: vec![Field::Uri],
            escape_mode: EscapeMode::Strict,
            ..PluginCfg::default()
        };
        register(&mut registry, &cfg).unwrap();
        let req = OwnedRequest::new(b"/\x02".to_vec(), "");
        assert_eq!(
            registry.resolve("json_uri", &req).unwrap().as_slice(),
            b"/\\u0002"
        );
    }
}
