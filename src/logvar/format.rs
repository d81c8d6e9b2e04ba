//! Log line templates with `%(name)` references.
//!
//! ```text
//! {"uri": "%(json_uri)", "host": "%(json_host)", "pct": "100%%"}
//! ```
//!
//! `%%` is a literal percent sign and a `%` not followed by `(` is kept as is.
//! References to names missing from the registry render as `-`.
//!
//! TODO: Accept `%(name:arg)` and hand `arg` to the chunk once an extractor
//! consumes its registered argument slot.

use crate::common::error::{LogVarError, LogVarResult};
use crate::request::RequestView;

use super::registry::LogChunkRegistry;

const MISSING: &[u8] = b"-";

#[derive(Clone, Debug, Eq, PartialEq)]
enum Segment {
    Literal(String),
    Chunk(String),
}

/// Parsed log line template.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogFormat {
    segments: Vec<Segment>,
}

impl LogFormat {
    pub fn parse(template: &str) -> LogVarResult<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;
        let mut offset = 0;

        while let Some(pos) = rest.find('%') {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let consumed = if after.starts_with('%') {
                literal.push('%');
                pos + 2
            } else if let Some(body) = after.strip_prefix('(') {
                let end = body
                    .find(')')
                    .ok_or_else(|| LogVarError::format(offset + pos, "unterminated %( reference"))?;
                let name = body[..end].trim();
                if name.is_empty() {
                    return Err(LogVarError::format(offset + pos, "empty variable name"));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Chunk(name.to_string()));
                pos + 2 + end + 1
            } else {
                literal.push('%');
                pos + 1
            };
            offset += consumed;
            rest = &rest[consumed..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Names referenced by the template, in order of appearance.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Chunk(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Referenced names the registry does not know.
    pub fn missing<'a>(&'a self, registry: &LogChunkRegistry) -> Vec<&'a str> {
        self.references()
            .filter(|name| !registry.contains(name))
            .collect()
    }

    /// Render one log line for `ctx`.
    pub fn render(&self, registry: &LogChunkRegistry, ctx: &dyn RequestView) -> Vec<u8> {
        let mut line = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.extend_from_slice(text.as_bytes()),
                Segment::Chunk(name) => match registry.resolve(name, ctx) {
                    Some(value) => line.extend_from_slice(value.as_slice()),
                    None => line.extend_from_slice(MISSING),
                },
            }
        }
        line
    }
}
