pub mod error;
mod structural;

pub use error::ParseWarning;

use crate::BlockStream;
use crate::render::detect_line_ending;

/// Deepest heading level Markdown can express.
pub const MAX_HEADING_LEVEL: u8 = 6;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    max_level: u8,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser {
            source,
            file_id,
            max_level: MAX_HEADING_LEVEL,
        }
    }

    /// Headings deeper than `max_level` are kept as ordinary content and do not
    /// open a section. Values outside `1..=6` are clamped.
    pub fn with_max_level(mut self, max_level: u8) -> Self {
        self.max_level = max_level.clamp(1, MAX_HEADING_LEVEL);
        self
    }

    /// Split the source Markdown into top-level blocks.
    pub fn parse(&self) -> BlockStream {
        let (blocks, warnings) =
            structural::scan_blocks(&self.source, self.file_id, self.max_level);
        log::debug!(
            "scanned {} blocks ({} warnings) from file {}",
            blocks.len(),
            warnings.len(),
            self.file_id
        );
        BlockStream {
            blocks,
            warnings,
            source_id: self.file_id,
            line_ending: detect_line_ending(&self.source),
        }
    }
}
