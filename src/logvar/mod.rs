//! Log variable domain: the `json_*` chunks, their registration and the
//! host-side registry that resolves them while rendering log lines.

pub mod domain;
pub mod format;
pub mod registry;
pub mod service;

pub use domain::{ChunkRegistry, Extractor, LogChunk, REGISTRATION_ARGS};
pub use format::LogFormat;
pub use registry::LogChunkRegistry;
pub use service::{extract_and_escape, extract_to_host, register};
