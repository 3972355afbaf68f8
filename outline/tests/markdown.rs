use outline::block::BlockKind;
use outline::parser::Parser;
use outline::render::{render_markdown, render_markdown_with};

fn parse(source: &str) -> outline::BlockStream {
    Parser::new(source.to_string(), 0).parse()
}

const DOC: &str = "Intro text.

# A

Para one.

## A.1

```rust
fn main() {}
```

# B

- item
- item two
";

#[test]
fn splits_top_level_blocks() {
    let stream = parse(DOC);
    let kinds: Vec<BlockKind> = stream.blocks.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Paragraph,
            BlockKind::Heading,
            BlockKind::Paragraph,
            BlockKind::Heading,
            BlockKind::CodeBlock,
            BlockKind::Heading,
            BlockKind::List,
        ]
    );
    assert_eq!(stream.heading_count(), 3);
    for (i, block) in stream.blocks.iter().enumerate() {
        assert_eq!(block.id.0, i);
    }
}

#[test]
fn heading_annotations() {
    let stream = parse(DOC);
    let headings: Vec<(u8, &str)> = stream
        .blocks
        .iter()
        .filter_map(|b| b.heading.as_ref())
        .map(|h| (h.level, h.text.as_str()))
        .collect();
    assert_eq!(headings, vec![(1, "A"), (2, "A.1"), (1, "B")]);
}

#[test]
fn render_reproduces_normalized_source() {
    let stream = parse(DOC);
    assert_eq!(render_markdown(&stream.blocks), DOC);
}

#[test]
fn crlf_source_renders_with_crlf() {
    let source = "# A\r\n\r\nPara one\r\nstill para.\r\n\r\n## A.1\r\n\r\n- item\r\n- item two\r\n";
    let stream = parse(source);
    assert_eq!(stream.line_ending, "\r\n");
    assert_eq!(stream.heading_count(), 2);
    let rendered = render_markdown_with(&stream.blocks, stream.line_ending);
    assert_eq!(rendered, source);
    assert!(!rendered.replace("\r\n", "").contains('\n'));
}

#[test]
fn max_level_turns_deep_headings_into_content() {
    let stream = Parser::new(DOC.to_string(), 0).with_max_level(1).parse();
    assert_eq!(stream.heading_count(), 2);
    assert_eq!(stream.blocks[3].kind, BlockKind::Heading);
    assert!(stream.blocks[3].heading.is_none());
}

#[test]
fn setext_headings_are_recognized() {
    let stream = parse("Title\n=====\n\nBody\n");
    let heading = stream.blocks[0].heading.as_ref().unwrap();
    assert_eq!((heading.level, heading.text.as_str()), (1, "Title"));
    assert_eq!(stream.blocks[0].text, "Title\n=====");
}

#[test]
fn multi_line_setext_heading_joins_with_a_space() {
    let stream = parse("Getting\nstarted\n=======\n\nbody\n");
    let heading = stream.blocks[0].heading.as_ref().unwrap();
    assert_eq!((heading.level, heading.text.as_str()), (1, "Getting started"));
    assert_eq!(stream.blocks[0].text, "Getting\nstarted\n=======");
}

#[test]
fn front_matter_is_a_leading_block() {
    let stream = parse("---\ntitle: x\n---\n\n# A\n");
    assert_eq!(stream.blocks[0].kind, BlockKind::FrontMatter);
    assert_eq!(stream.heading_count(), 1);
}

#[test]
fn empty_source_has_no_blocks() {
    let stream = parse("");
    assert!(stream.blocks.is_empty());
    assert!(stream.warnings.is_empty());
}
