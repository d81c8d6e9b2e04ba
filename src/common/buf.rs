//! Output buffers handed back to the logger.
//!
//! `EscapedBuf` is the Rust-side buffer. `HostBuf` is the C-side one: it lives
//! in `libc::malloc` memory so a host written against the system allocator can
//! release it with `free()`.

use std::alloc::{handle_alloc_error, Layout};
use std::os::raw::c_char;
use std::ptr::NonNull;

use super::json::{self, EscapeMode};

/// Escaped field value, sized for the worst case plus a terminator.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EscapedBuf {
    inner: Vec<u8>,
}

impl EscapedBuf {
    /// Allocate room for escaping a field of `len` bytes.
    pub fn for_field(len: usize, mode: EscapeMode) -> Self {
        Self {
            inner: Vec::with_capacity(json::max_escaped_len(len, mode) + 1),
        }
    }

    /// Escape `src` into a freshly allocated buffer.
    pub fn escape(src: &[u8], mode: EscapeMode) -> Self {
        let mut buf = Self::for_field(src.len(), mode);
        json::escape_into(src, mode, &mut buf.inner);
        buf
    }

    /// Length of the escaped content (never the allocation size).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.inner
    }
}

impl AsRef<[u8]> for EscapedBuf {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

/// NUL-terminated escaped value in `malloc` memory.
///
/// Dropping it frees the allocation; [`HostBuf::into_raw`] hands ownership to
/// the host instead.
#[derive(Debug)]
pub struct HostBuf {
    ptr: NonNull<u8>,
    cap: usize,
    len: usize,
}

// The allocation is uniquely owned.
unsafe impl Send for HostBuf {}

impl HostBuf {
    /// Escape `src` straight into a single `2 * len + 1` (or strict
    /// equivalent) allocation.
    pub fn escape(src: &[u8], mode: EscapeMode) -> Self {
        let mut out = Self::alloc(json::max_escaped_len(src.len(), mode) + 1);
        let cap = out.cap;
        let written = json::escape_into_slice(src, mode, &mut out.bytes_mut()[..cap - 1]);
        out.bytes_mut()[written] = 0;
        out.len = written;
        out
    }

    /// Zeroed allocation of `cap` bytes; aborts if the allocator fails.
    fn alloc(cap: usize) -> Self {
        let cap = cap.max(1);
        let raw = unsafe { libc::calloc(cap, 1) }.cast::<u8>();
        let Some(ptr) = NonNull::new(raw) else {
            handle_alloc_error(Layout::array::<u8>(cap).unwrap_or_else(|_| Layout::new::<u8>()));
        };
        Self { ptr, cap, len: 0 }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.cap) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Escaped content without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Give up ownership; the pointer must be released with `free()` or
    /// [`HostBuf::free_raw`].
    pub fn into_raw(self) -> *mut c_char {
        let ptr = self.ptr.as_ptr().cast::<c_char>();
        std::mem::forget(self);
        ptr
    }

    /// Release a pointer previously returned by [`HostBuf::into_raw`].
    ///
    /// # Safety
    /// `ptr` must be null or come from `into_raw` and not have been freed.
    pub unsafe fn free_raw(ptr: *mut c_char) {
        if !ptr.is_null() {
            libc::free(ptr.cast());
        }
    }
}

impl Drop for HostBuf {
    fn drop(&mut self) {
        unsafe { libc::free(self.ptr.as_ptr().cast()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaped_buf_reports_content_length() {
        let buf = EscapedBuf::escape(b"/a\"b", EscapeMode::Compact);
        assert_eq!(buf.as_slice(), b"/a\\\"b");
        assert_eq!(buf.len(), 5);
        assert!(buf.capacity() >= 2 * 4 + 1);
        assert!(buf.capacity() > buf.len());
    }

    #[test]
    fn empty_field_gives_empty_buffer() {
        let buf = EscapedBuf::escape(b"", EscapeMode::Compact);
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 1);

        let host = HostBuf::escape(b"", EscapeMode::Strict);
        assert!(host.is_empty());
        assert_eq!(host.capacity(), 1);
    }

    #[test]
    fn host_buf_is_nul_terminated() {
        let host = HostBuf::escape(b"x\0y\n", EscapeMode::Compact);
        assert_eq!(host.as_bytes(), b"x\0y\\n");
        assert_eq!(host.capacity(), 9);
        let raw = host.into_raw();
        let terminated = unsafe { std::slice::from_raw_parts(raw.cast::<u8>(), 6) };
        assert_eq!(terminated, b"x\0y\\n\0");
        unsafe { HostBuf::free_raw(raw) };
    }

    #[test]
    fn host_buf_fits_worst_case_in_both_modes() {
        let controls: Vec<u8> = (0u8..0x20).collect();
        for mode in [EscapeMode::Compact, EscapeMode::Strict] {
            let host = HostBuf::escape(&controls, mode);
            assert_eq!(host.as_bytes(), json::escape(&controls, mode).as_slice());
            assert!(host.len() < host.capacity());
        }
    }

    #[test]
    fn free_raw_accepts_null() {
        unsafe { HostBuf::free_raw(std::ptr::null_mut()) };
    }
}
