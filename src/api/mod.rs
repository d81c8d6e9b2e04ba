//! Public entry points for foreign function interfaces.

pub mod ffi;

pub use ffi::{RawField, RawRequest, ABI_VERSION};
