//! C-compatible API exposed to the application server.
//!
//! Ownership rules:
//! - `RawRequest` and the bytes behind its fields belong to the host and are
//!   only read for the duration of one extraction call.
//! - Buffers written to `*buf` by an extractor come from `malloc`; the host
//!   releases them with `free()` or [`logvar_free`].
//! - Variable names passed to the host registrar are `'static` and may be
//!   stored by pointer.
//!
//! Each variable is exported twice, `logvar_json_<field>` (compact escaping)
//! and `logvar_json_<field>_strict`; registration hands the host the one
//! matching the configured mode.
//!
//! TODO: Widen `RawField::len` to `u32` in layout version 2; fields longer
//! than 64 KiB are cut at `u16::MAX` today.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use tracing::{debug, warn};

use crate::common::buf::HostBuf;
use crate::common::config::PluginCfg;
use crate::common::error::{LogVarCode, LogVarError, LogVarResult};
use crate::common::json::EscapeMode;
use crate::common::log;
use crate::logvar::{self, ChunkRegistry, LogChunk};
use crate::request::{Field, RequestView};

/// Layout version of [`RawRequest`].
pub const ABI_VERSION: u32 = 1;

/// Extraction function handed to the host for each variable.
pub type ExtractFn = unsafe extern "C" fn(ctx: *const RawRequest, buf: *mut *mut c_char) -> isize;

/// Host function that records a log chunk. A negative status is a rejection.
pub type RegisterChunkFn =
    unsafe extern "C" fn(name: *const c_char, func: ExtractFn, args: c_int) -> c_int;

/// Byte string owned by the host.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct RawField {
    pub ptr: *const u8,
    pub len: u16,
}

impl RawField {
    pub const EMPTY: RawField = RawField {
        ptr: std::ptr::null(),
        len: 0,
    };

    /// Borrow `bytes` as a field. Lengths above `u16::MAX` are cut off, as the
    /// host would.
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            ptr: bytes.as_ptr(),
            len: u16::try_from(bytes.len()).unwrap_or(u16::MAX),
        }
    }

    /// # Safety
    /// `ptr` must be null or valid for `len` bytes while the result is used.
    unsafe fn as_bytes(&self) -> &[u8] {
        if self.ptr.is_null() || self.len == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(self.ptr, usize::from(self.len))
        }
    }
}

impl Default for RawField {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Versioned request layout shared with the host.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct RawRequest {
    /// Must equal [`ABI_VERSION`].
    pub version: u32,
    pub uri: RawField,
    pub host: RawField,
    pub method: RawField,
    pub query_string: RawField,
    pub remote_addr: RawField,
    pub referer: RawField,
    pub user_agent: RawField,
}

impl Default for RawRequest {
    fn default() -> Self {
        Self {
            version: ABI_VERSION,
            uri: RawField::EMPTY,
            host: RawField::EMPTY,
            method: RawField::EMPTY,
            query_string: RawField::EMPTY,
            remote_addr: RawField::EMPTY,
            referer: RawField::EMPTY,
            user_agent: RawField::EMPTY,
        }
    }
}

/// `RequestView` over a host request that was checked to be non-null and of
/// the right version.
struct RawView<'a>(&'a RawRequest);

impl RequestView for RawView<'_> {
    fn uri(&self) -> &[u8] {
        unsafe { self.0.uri.as_bytes() }
    }

    fn host(&self) -> &[u8] {
        unsafe { self.0.host.as_bytes() }
    }

    fn method(&self) -> &[u8] {
        unsafe { self.0.method.as_bytes() }
    }

    fn query_string(&self) -> &[u8] {
        unsafe { self.0.query_string.as_bytes() }
    }

    fn remote_addr(&self) -> &[u8] {
        unsafe { self.0.remote_addr.as_bytes() }
    }

    fn referer(&self) -> &[u8] {
        unsafe { self.0.referer.as_bytes() }
    }

    fn user_agent(&self) -> &[u8] {
        unsafe { self.0.user_agent.as_bytes() }
    }
}

unsafe fn extract(
    ctx: *const RawRequest,
    buf: *mut *mut c_char,
    field: Field,
    mode: EscapeMode,
) -> isize {
    if ctx.is_null() || buf.is_null() {
        return -1;
    }
    let request = &*ctx;
    if request.version != ABI_VERSION {
        warn!(
            variable = field.variable_name(),
            version = request.version,
            expected = ABI_VERSION,
            "request layout version mismatch"
        );
        return -1;
    }

    let out = logvar::extract_to_host(&RawView(request), field, mode);
    let Ok(len) = isize::try_from(out.len()) else {
        return -1;
    };
    *buf = out.into_raw();
    len
}

macro_rules! export_extractor {
    ($($compact:ident, $strict:ident => $field:expr),+ $(,)?) => {
        $(
            /// Write the JSON-escaped field to `*buf` and return its length,
            /// or `-1` without touching `*buf`. Control bytes without a
            /// short escape are copied as is.
            ///
            /// # Safety
            /// `ctx` must be null or point to a valid `RawRequest`, and `buf`
            /// must be null or writable.
            #[no_mangle]
            pub unsafe extern "C" fn $compact(ctx: *const RawRequest, buf: *mut *mut c_char) -> isize {
                extract(ctx, buf, $field, EscapeMode::Compact)
            }

            /// Like the compact extractor, but every control byte is escaped.
            ///
            /// # Safety
            /// `ctx` must be null or point to a valid `RawRequest`, and `buf`
            /// must be null or writable.
            #[no_mangle]
            pub unsafe extern "C" fn $strict(ctx: *const RawRequest, buf: *mut *mut c_char) -> isize {
                extract(ctx, buf, $field, EscapeMode::Strict)
            }
        )+
    };
}

export_extractor! {
    logvar_json_uri, logvar_json_uri_strict => Field::Uri,
    logvar_json_host, logvar_json_host_strict => Field::Host,
    logvar_json_method, logvar_json_method_strict => Field::Method,
    logvar_json_query_string, logvar_json_query_string_strict => Field::QueryString,
    logvar_json_remote_addr, logvar_json_remote_addr_strict => Field::RemoteAddr,
    logvar_json_referer, logvar_json_referer_strict => Field::Referer,
    logvar_json_user_agent, logvar_json_user_agent_strict => Field::UserAgent,
}

/// Exported extractor for a field in the given mode.
pub fn extract_fn(field: Field, mode: EscapeMode) -> ExtractFn {
    match (field, mode) {
        (Field::Uri, EscapeMode::Compact) => logvar_json_uri,
        (Field::Uri, EscapeMode::Strict) => logvar_json_uri_strict,
        (Field::Host, EscapeMode::Compact) => logvar_json_host,
        (Field::Host, EscapeMode::Strict) => logvar_json_host_strict,
        (Field::Method, EscapeMode::Compact) => logvar_json_method,
        (Field::Method, EscapeMode::Strict) => logvar_json_method_strict,
        (Field::QueryString, EscapeMode::Compact) => logvar_json_query_string,
        (Field::QueryString, EscapeMode::Strict) => logvar_json_query_string_strict,
        (Field::RemoteAddr, EscapeMode::Compact) => logvar_json_remote_addr,
        (Field::RemoteAddr, EscapeMode::Strict) => logvar_json_remote_addr_strict,
        (Field::Referer, EscapeMode::Compact) => logvar_json_referer,
        (Field::Referer, EscapeMode::Strict) => logvar_json_referer_strict,
        (Field::UserAgent, EscapeMode::Compact) => logvar_json_user_agent,
        (Field::UserAgent, EscapeMode::Strict) => logvar_json_user_agent_strict,
    }
}

/// NUL-terminated variable name with static storage.
pub fn c_variable_name(field: Field) -> &'static CStr {
    match field {
        Field::Uri => c"json_uri",
        Field::Host => c"json_host",
        Field::Method => c"json_method",
        Field::QueryString => c"json_query_string",
        Field::RemoteAddr => c"json_remote_addr",
        Field::Referer => c"json_referer",
        Field::UserAgent => c"json_user_agent",
    }
}

/// Adapts the host's registration function to [`ChunkRegistry`].
struct HostRegistrar {
    register: RegisterChunkFn,
}

impl ChunkRegistry for HostRegistrar {
    fn register_chunk(&mut self, chunk: LogChunk, args: u8) -> LogVarResult<()> {
        let name = c_variable_name(chunk.field);
        let func = extract_fn(chunk.field, chunk.mode);
        let status = unsafe { (self.register)(name.as_ptr(), func, c_int::from(args)) };
        if status < 0 {
            return Err(LogVarError::HostRejected {
                name: chunk.name.to_string(),
                status,
            });
        }
        Ok(())
    }
}

/// Register the configured variables through `register`. Returns the count,
/// or the negated [`LogVarCode`] of the first failure.
pub fn load_into_host(register: RegisterChunkFn, cfg: &PluginCfg) -> c_int {
    let mut registrar = HostRegistrar { register };
    match logvar::register(&mut registrar, cfg) {
        Ok(count) => c_int::try_from(count).unwrap_or(c_int::MAX),
        Err(err) => {
            let code = err.code();
            warn!(error = %err, code = ?code, "log variables not fully registered");
            code.as_status()
        }
    }
}

/// ABI version to coordinate with the host.
#[no_mangle]
pub extern "C" fn logvar_api_version() -> u32 {
    ABI_VERSION
}

/// Module entry point, called once by the host while loading the provider.
///
/// Reads the `LOGVAR_*` configuration, sets up logging and registers the
/// enabled variables. A broken configuration falls back to the defaults.
/// Returns the number of registered variables or a negated [`LogVarCode`].
///
/// # Safety
/// `register` must be null or a valid registration function.
#[no_mangle]
pub unsafe extern "C" fn logvar_on_load(register: Option<RegisterChunkFn>) -> c_int {
    let Some(register) = register else {
        return LogVarCode::InvalidInput.as_status();
    };

    let (cfg, cfg_err) = match PluginCfg::load() {
        Ok(cfg) => (cfg, None),
        Err(err) => (PluginCfg::default(), Some(err)),
    };
    log::init(&cfg.log_level);
    if let Some(err) = cfg_err {
        warn!(error = %err, "invalid log variable configuration, using defaults");
    }
    debug!(api_version = ABI_VERSION, "loading log variables");

    load_into_host(register, &cfg)
}

/// Free a buffer returned by one of the extractors.
///
/// # Safety
/// `buf` must be null or a pointer produced by an extractor that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn logvar_free(buf: *mut c_char) {
    HostBuf::free_raw(buf);
}
