pub mod block;
pub mod parser;
pub mod render;
pub mod toc;

use crate::block::Block;
use crate::parser::ParseWarning;

/// A Markdown document flattened into top-level blocks.
#[derive(Debug, Clone)]
pub struct BlockStream {
    /// Top-level blocks in source order. `blocks[i].id == BlockId(i)`.
    pub blocks: Vec<Block>,
    /// Non-fatal problems noticed while reading the source.
    pub warnings: Vec<ParseWarning>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
    /// `"\r\n"` or `"\n"`, as detected in the source.
    pub line_ending: &'static str,
}

impl BlockStream {
    /// Number of blocks carrying a heading annotation.
    pub fn heading_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_heading()).count()
    }
}
