use std::fmt;
use std::ops::Range;

/// Stable identity of a block: its position in the original stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Heading annotation carried by a block that opens a section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Heading {
    /// 1 = `#`, 6 = `######`.
    pub level: u8,
    /// Heading text, whitespace-normalized.
    pub text: String,
}

/// What kind of Markdown construct a block came from.
/// Shown when listing sections; the reorganizer treats blocks as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Paragraph,
    CodeBlock,
    List,
    BlockQuote,
    Table,
    Html,
    Rule,
    FrontMatter,
    /// Source text no parser event accounted for, such as link reference definitions.
    Raw,
    Other,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::CodeBlock => "code",
            BlockKind::List => "list",
            BlockKind::BlockQuote => "blockquote",
            BlockKind::Table => "table",
            BlockKind::Html => "html",
            BlockKind::Rule => "rule",
            BlockKind::FrontMatter => "front-matter",
            BlockKind::Raw => "raw",
            BlockKind::Other => "other",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One top-level content unit of a document.
///
/// Blocks are opaque to the reorganizer: `text` is the exact source slice and
/// is written back untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Present when the block is a heading within the configured maximum level.
    pub heading: Option<Heading>,
    pub text: String,
    /// Byte span in source for error reporting.
    pub span: Range<usize>,
}

impl Block {
    /// A plain content block.
    pub fn content(id: usize, kind: BlockKind, text: impl Into<String>) -> Self {
        Block {
            id: BlockId(id),
            kind,
            heading: None,
            text: text.into(),
            span: 0..0,
        }
    }

    /// A heading block with its annotation. `text` is rendered as an ATX heading.
    pub fn heading(id: usize, level: u8, text: impl Into<String>) -> Self {
        let text = text.into();
        Block {
            id: BlockId(id),
            kind: BlockKind::Heading,
            text: format!("{} {}", "#".repeat(level as usize), text),
            heading: Some(Heading { level, text }),
            span: 0..0,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = span;
        self
    }

    pub fn is_heading(&self) -> bool {
        self.heading.is_some()
    }
}

/// Normalize heading text: strip leading/trailing whitespace, collapse interior whitespace.
pub fn normalize_heading_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
