use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser as CmarkParser, Tag};

use crate::block::{Block, BlockId, BlockKind, Heading, normalize_heading_text};
use crate::parser::error::ParseWarning;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Split Markdown source text into top-level blocks.
///
/// Only events at nesting depth 0 open a block, so a heading inside a list item
/// or blockquote stays part of that container and never opens a section.
pub(crate) fn scan_blocks(
    source: &str,
    file_id: usize,
    max_level: u8,
) -> (Vec<Block>, Vec<ParseWarning>) {
    let options = Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TABLES
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;
    let parser = CmarkParser::new_ext(source, options);

    let mut state = ScanState::new(file_id, max_level);
    for (event, range) in parser.into_offset_iter() {
        state.feed(event, range);
    }
    state.finalize(source)
}

// ---------------------------------------------------------------------------
// Scan state
// ---------------------------------------------------------------------------

/// A top-level container whose End event has not been seen yet.
struct OpenBlock {
    kind: BlockKind,
    heading_level: Option<u8>,
    heading_text: String,
    span: Range<usize>,
}

/// A closed top-level block; text and id are assigned in `finalize`.
struct PendingBlock {
    kind: BlockKind,
    heading: Option<Heading>,
    span: Range<usize>,
}

struct ScanState {
    file_id: usize,
    max_level: u8,
    depth: usize,
    open: Option<OpenBlock>,
    pending: Vec<PendingBlock>,
    warnings: Vec<ParseWarning>,
}

impl ScanState {
    fn new(file_id: usize, max_level: u8) -> Self {
        ScanState {
            file_id,
            max_level,
            depth: 0,
            open: None,
            pending: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn feed(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => {
                if self.depth == 0 {
                    let heading_level = match &tag {
                        Tag::Heading { level, .. } => Some(heading_level_to_u8(level)),
                        _ => None,
                    };
                    self.open = Some(OpenBlock {
                        kind: block_kind(&tag),
                        heading_level,
                        heading_text: String::new(),
                        span: range,
                    });
                }
                self.depth += 1;
            }
            Event::End(_) => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    if let Some(open) = self.open.take() {
                        self.close(open);
                    }
                }
            }
            Event::Text(s) | Event::Code(s) if self.depth > 0 => self.push_heading_text(&s),
            Event::SoftBreak | Event::HardBreak if self.depth > 0 => self.push_heading_text(" "),
            Event::Rule if self.depth == 0 => self.push_leaf(BlockKind::Rule, range),
            Event::Html(_) if self.depth == 0 => self.push_leaf(BlockKind::Html, range),
            _ if self.depth == 0 => self.push_leaf(BlockKind::Other, range),
            _ => {}
        }
    }

    /// Extend the open heading's text; ignored outside headings.
    fn push_heading_text(&mut self, text: &str) {
        if let Some(open) = self.open.as_mut().filter(|o| o.heading_level.is_some()) {
            open.heading_text.push_str(text);
        }
    }

    fn push_leaf(&mut self, kind: BlockKind, span: Range<usize>) {
        self.pending.push(PendingBlock {
            kind,
            heading: None,
            span,
        });
    }

    fn close(&mut self, open: OpenBlock) {
        let heading = match open.heading_level {
            Some(level) if level <= self.max_level => {
                let text = normalize_heading_text(&open.heading_text);
                if text.is_empty() {
                    self.warnings.push(
                        ParseWarning::new("heading has no text", open.span.clone(), self.file_id)
                            .with_note("it is kept as content of the enclosing section"),
                    );
                    None
                } else {
                    Some(Heading { level, text })
                }
            }
            _ => None,
        };

        self.pending.push(PendingBlock {
            kind: open.kind,
            heading,
            span: open.span,
        });
    }

    /// Assign ids and source text, turning uncovered non-blank text into raw blocks.
    fn finalize(mut self, source: &str) -> (Vec<Block>, Vec<ParseWarning>) {
        if let Some(open) = self.open.take() {
            // Unbalanced event stream; keep what we have.
            self.close(open);
        }

        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by_key(|p| p.span.start);

        let mut blocks = Vec::with_capacity(pending.len());
        let mut cursor = 0;
        for block in pending {
            if let Some(gap) = uncovered_text(source, cursor, block.span.start) {
                push_block(&mut blocks, source, BlockKind::Raw, None, gap);
            }
            cursor = cursor.max(block.span.end);
            push_block(&mut blocks, source, block.kind, block.heading, block.span);
        }
        if let Some(gap) = uncovered_text(source, cursor, source.len()) {
            push_block(&mut blocks, source, BlockKind::Raw, None, gap);
        }

        (blocks, self.warnings)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn push_block(
    blocks: &mut Vec<Block>,
    source: &str,
    kind: BlockKind,
    heading: Option<Heading>,
    span: Range<usize>,
) {
    let end = span.end.min(source.len());
    let start = span.start.min(end);
    let text = source[start..end].trim_end_matches(['\r', '\n']).to_string();
    blocks.push(Block {
        id: BlockId(blocks.len()),
        kind,
        heading,
        text,
        span: start..end,
    });
}

/// The trimmed span of `source[start..end]`, if it holds anything but whitespace.
fn uncovered_text(source: &str, start: usize, end: usize) -> Option<Range<usize>> {
    if start >= end || end > source.len() {
        return None;
    }
    let gap = source.get(start..end)?;
    let trimmed = gap.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = gap.len() - gap.trim_start().len();
    Some(start + lead..start + lead + trimmed.len())
}

fn block_kind(tag: &Tag<'_>) -> BlockKind {
    match tag {
        Tag::Heading { .. } => BlockKind::Heading,
        Tag::Paragraph => BlockKind::Paragraph,
        Tag::CodeBlock(_) => BlockKind::CodeBlock,
        Tag::List(_) => BlockKind::List,
        Tag::BlockQuote(_) => BlockKind::BlockQuote,
        Tag::Table(_) => BlockKind::Table,
        Tag::HtmlBlock => BlockKind::Html,
        Tag::MetadataBlock(_) => BlockKind::FrontMatter,
        _ => BlockKind::Other,
    }
}

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
