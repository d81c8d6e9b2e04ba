//! Log chunk definitions and the registration contract hosts implement.

use crate::common::buf::EscapedBuf;
use crate::common::error::LogVarResult;
use crate::common::json::EscapeMode;
use crate::request::{Field, RequestView};

/// Argument slots declared for every chunk. Hosts define what the count
/// means; the extractors never read an argument.
pub const REGISTRATION_ARGS: u8 = 1;

/// Function that turns one request into the escaped value of a variable.
pub type Extractor = fn(&dyn RequestView, EscapeMode) -> EscapedBuf;

/// A named log variable bound to its extractor.
#[derive(Copy, Clone, Debug)]
pub struct LogChunk {
    pub name: &'static str,
    pub field: Field,
    pub mode: EscapeMode,
    extractor: Extractor,
}

impl LogChunk {
    pub fn new(field: Field, mode: EscapeMode) -> Self {
        Self {
            name: field.variable_name(),
            field,
            mode,
            extractor: super::service::extractor(field),
        }
    }

    /// Evaluate the chunk against one request.
    pub fn call(&self, ctx: &dyn RequestView) -> EscapedBuf {
        (self.extractor)(ctx, self.mode)
    }
}

/// Registry owned by the host that log chunks are registered into.
pub trait ChunkRegistry {
    fn register_chunk(&mut self, chunk: LogChunk, args: u8) -> LogVarResult<()>;
}
