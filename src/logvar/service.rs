//! Extraction and registration of the `json_*` log variables.

use tracing::{info, trace, warn};

use crate::common::buf::{EscapedBuf, HostBuf};
use crate::common::config::PluginCfg;
use crate::common::error::LogVarResult;
use crate::common::json::EscapeMode;
use crate::request::{Field, RequestView};

use super::domain::{ChunkRegistry, Extractor, LogChunk, REGISTRATION_ARGS};

/// Escape one request field into a fresh buffer.
///
/// The buffer is sized for the worst case up front; its `len()` is the real
/// escaped length. The request is only read.
pub fn extract_and_escape<R>(ctx: &R, field: Field, mode: EscapeMode) -> EscapedBuf
where
    R: RequestView + ?Sized,
{
    let raw = ctx.field(field);
    let buf = EscapedBuf::escape(raw, mode);
    trace!(
        variable = field.variable_name(),
        raw_len = raw.len(),
        escaped_len = buf.len(),
        "escaped log variable"
    );
    buf
}

/// Same as [`extract_and_escape`], allocating with `malloc` for C hosts.
pub fn extract_to_host<R>(ctx: &R, field: Field, mode: EscapeMode) -> HostBuf
where
    R: RequestView + ?Sized,
{
    let raw = ctx.field(field);
    let buf = HostBuf::escape(raw, mode);
    trace!(
        variable = field.variable_name(),
        raw_len = raw.len(),
        escaped_len = buf.len(),
        "escaped log variable for host"
    );
    buf
}

macro_rules! field_extractor {
    ($($name:ident => $field:expr),+ $(,)?) => {
        $(
            pub fn $name(ctx: &dyn RequestView, mode: EscapeMode) -> EscapedBuf {
                extract_and_escape(ctx, $field, mode)
            }
        )+
    };
}

field_extractor! {
    json_uri => Field::Uri,
    json_host => Field::Host,
    json_method => Field::Method,
    json_query_string => Field::QueryString,
    json_remote_addr => Field::RemoteAddr,
    json_referer => Field::Referer,
    json_user_agent => Field::UserAgent,
}

/// Extractor bound to a field selector.
pub fn extractor(field: Field) -> Extractor {
    match field {
        Field::Uri => json_uri,
        Field::Host => json_host,
        Field::Method => json_method,
        Field::QueryString => json_query_string,
        Field::RemoteAddr => json_remote_addr,
        Field::Referer => json_referer,
        Field::UserAgent => json_user_agent,
    }
}

/// Register every enabled variable with the host registry.
///
/// Meant to run once while the host loads the provider. Stops at the first
/// rejected chunk; returns how many were registered.
pub fn register(registry: &mut dyn ChunkRegistry, cfg: &PluginCfg) -> LogVarResult<usize> {
    let mut registered = 0;
    for &field in &cfg.variables {
        let chunk = LogChunk::new(field, cfg.escape_mode);
        if let Err(err) = registry.register_chunk(chunk, REGISTRATION_ARGS) {
            warn!(variable = chunk.name, error = %err, "log variable registration failed");
            return Err(err);
        }
        info!(
            variable = chunk.name,
            mode = %cfg.escape_mode,
            "registered log variable"
        );
        registered += 1;
    }
    Ok(registered)
}
