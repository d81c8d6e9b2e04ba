//! JSON string escaping for raw request bytes.
//!
//! Input is treated as bytes, not as `str`: request fields are whatever the
//! client sent and may not be UTF-8. Escaping is driven by the slice length,
//! so an embedded NUL is escaped like any other byte.
//!
//! Two modes are provided. `Compact` only uses two-byte escapes and leaves the
//! remaining control bytes untouched, which bounds the output at twice the
//! input. `Strict` additionally writes `\u00XX` for those bytes so the result
//! is always a valid JSON string body, at up to six times the input.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::error::{LogVarError, LogVarResult};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// How control bytes without a short escape are written.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    /// Two-byte escapes only; worst case `2 * len`.
    #[default]
    Compact,
    /// Every control byte escaped; worst case `6 * len`.
    Strict,
}

impl EscapeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for EscapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscapeMode {
    type Err = LogVarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "strict" => Ok(Self::Strict),
            other => Err(LogVarError::Config(format!("unknown escape mode `{other}`"))),
        }
    }
}

/// Worst-case escaped length of `len` input bytes, excluding any terminator.
pub const fn max_escaped_len(len: usize, mode: EscapeMode) -> usize {
    match mode {
        EscapeMode::Compact => len * 2,
        EscapeMode::Strict => len * 6,
    }
}

/// Append the escaped form of `src` to `dst`.
pub fn escape_into(src: &[u8], mode: EscapeMode, dst: &mut Vec<u8>) {
    dst.reserve(src.len());
    escape_with(src, mode, |bytes| dst.extend_from_slice(bytes));
}

/// Escape `src` into a caller-sized slice and return the number of bytes
/// written. `dst` must hold at least `max_escaped_len(src.len(), mode)` bytes.
pub fn escape_into_slice(src: &[u8], mode: EscapeMode, dst: &mut [u8]) -> usize {
    let mut written = 0;
    escape_with(src, mode, |bytes| {
        dst[written..written + bytes.len()].copy_from_slice(bytes);
        written += bytes.len();
    });
    written
}

fn escape_with(src: &[u8], mode: EscapeMode, mut emit: impl FnMut(&[u8])) {
    for &b in src {
        match b {
            b'"' => emit(b"\\\""),
            b'\\' => emit(b"\\\\"),
            0x08 => emit(b"\\b"),
            0x0c => emit(b"\\f"),
            b'\n' => emit(b"\\n"),
            b'\r' => emit(b"\\r"),
            b'\t' => emit(b"\\t"),
            0x00..=0x1f if mode == EscapeMode::Strict => emit(&[
                b'\\',
                b'u',
                b'0',
                b'0',
                HEX[usize::from(b >> 4)],
                HEX[usize::from(b & 0x0f)],
            ]),
            other => emit(&[other]),
        }
    }
}

/// Escape `src` into a new vector.
pub fn escape(src: &[u8], mode: EscapeMode) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    escape_into(src, mode, &mut out);
    out
}

/// Reverse [`escape`] in either mode.
///
/// This is the inverse of the escaper above, not a general JSON decoder:
/// `\u` escapes are only accepted up to `00FF` and decode to a single byte.
/// Unescaped control bytes are passed through, as `Compact` leaves them.
pub fn unescape(src: &[u8]) -> LogVarResult<Vec<u8>> {
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        let b = src[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }

        let Some(&next) = src.get(i + 1) else {
            return Err(LogVarError::invalid_escape(i, "truncated escape"));
        };
        let decoded = match next {
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'u' => {
                let digits = src
                    .get(i + 2..i + 6)
                    .ok_or_else(|| LogVarError::invalid_escape(i, "truncated \\u escape"))?;
                let value = parse_hex4(digits)
                    .ok_or_else(|| LogVarError::invalid_escape(i, "non-hex digit in \\u escape"))?;
                let byte = u8::try_from(value)
                    .map_err(|_| LogVarError::invalid_escape(i, "\\u escape above 00ff"))?;
                out.push(byte);
                i += 6;
                continue;
            }
            _ => return Err(LogVarError::invalid_escape(i, "unknown escape")),
        };
        out.push(decoded);
        i += 2;
    }
    Ok(out)
}

fn parse_hex4(digits: &[u8]) -> Option<u16> {
    digits.iter().try_fold(0u16, |acc, &d| {
        let nibble = char::from(d).to_digit(16)?;
        Some((acc << 4) | nibble as u16)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_byte() -> Vec<u8> {
        (0u8..=255).collect()
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(escape(b"", EscapeMode::Compact).is_empty());
        assert!(escape(b"", EscapeMode::Strict).is_empty());
    }

    #[test]
    fn quote_and_backslash_are_escaped() {
        assert_eq!(escape(b"a\"b", EscapeMode::Compact), b"a\\\"b");
        assert_eq!(escape(b"a\\b", EscapeMode::Compact), b"a\\\\b");
    }

    #[test]
    fn short_escapes() {
        assert_eq!(
            escape(b"\x08\x0c\n\r\t", EscapeMode::Compact),
            b"\\b\\f\\n\\r\\t"
        );
    }

    #[test]
    fn plain_bytes_pass_through() {
        let uri = b"/search?q=caf\xc3\xa9&x=%20/\xff";
        assert_eq!(escape(uri, EscapeMode::Compact), uri);
        assert_eq!(escape(uri, EscapeMode::Strict), uri);
    }

    #[test]
    fn embedded_nul_does_not_truncate() {
        let src = b"/a\0b\"c";
        assert_eq!(escape(src, EscapeMode::Compact), b"/a\0b\\\"c");
        assert_eq!(escape(src, EscapeMode::Strict), b"/a\\u0000b\\\"c");
    }

    #[test]
    fn strict_uses_unicode_escapes_for_other_controls() {
        assert_eq!(escape(b"\x01\x1f", EscapeMode::Strict), b"\\u0001\\u001f");
        assert_eq!(escape(b"\x01\x1f", EscapeMode::Compact), b"\x01\x1f");
    }

    #[test]
    fn output_stays_within_bound() {
        let all = every_byte();
        for mode in [EscapeMode::Compact, EscapeMode::Strict] {
            for b in &all {
                let out = escape(std::slice::from_ref(b), mode);
                assert!(out.len() <= max_escaped_len(1, mode));
            }
            assert!(escape(&all, mode).len() <= max_escaped_len(all.len(), mode));
        }
        let worst = vec![b'"'; 300];
        assert_eq!(escape(&worst, EscapeMode::Compact).len(), 600);
        assert!(escape(&worst, EscapeMode::Compact).len() <= 2 * worst.len() + 1);
    }

    #[test]
    fn unescape_reverses_escape() {
        let samples: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"/index.html".to_vec(),
            b"a\"b\\c".to_vec(),
            b"\\\\\"\"".to_vec(),
            b"line\nbreak\r\n\ttab".to_vec(),
            b"nul\0inside".to_vec(),
            b"\\u0041 is not an escape here".to_vec(),
            every_byte(),
            every_byte().into_iter().rev().collect(),
        ];
        for mode in [EscapeMode::Compact, EscapeMode::Strict] {
            for sample in &samples {
                let escaped = escape(sample, mode);
                assert_eq!(&unescape(&escaped).unwrap(), sample, "mode {mode}");
            }
        }
    }

    #[test]
    fn strict_output_is_valid_json() {
        let raw: String = (0u8..0x20).map(char::from).chain("\"\\é/ok".chars()).collect();
        let escaped = escape(raw.as_bytes(), EscapeMode::Strict);
        let literal = format!("\"{}\"", String::from_utf8(escaped).unwrap());
        let parsed: String = serde_json::from_str(&literal).unwrap();
        assert_eq!(parsed, raw);
    }

    #[test]
    fn unescape_rejects_malformed_input() {
        assert!(matches!(
            unescape(b"abc\\"),
            Err(LogVarError::InvalidEscape { offset: 3, .. })
        ));
        assert!(unescape(b"\\x").is_err());
        assert!(unescape(b"\\u00").is_err());
        assert!(unescape(b"\\u00zz").is_err());
        assert!(unescape(b"\\u0100").is_err());
        assert_eq!(unescape(b"\\/\\u00e9").unwrap(), b"/\xe9");
    }

    #[test]
    fn mode_parses_from_config_strings() {
        assert_eq!("Strict".parse::<EscapeMode>().unwrap(), EscapeMode::Strict);
        assert_eq!(" compact ".parse::<EscapeMode>().unwrap(), EscapeMode::Compact);
        assert!("loose".parse::<EscapeMode>().is_err());
    }
}
