use outline::block::{Block, BlockKind};
use outline::parser::Parser;
use outline::render::render_markdown;
use outline::toc::{TocEntry, TocFile, TocNode};
use reorder::{
    Diagnostics, EmptyTargetPolicy, ExtraSectionPolicy, MissingTargetPolicy, PlacementAction,
    ReorgConfig, ReorgError, TargetTree, build_target_order_from_source, plan, reorganize,
    reorganize_with_toc,
};

/// `"# A"` is a level-1 heading, anything else a paragraph.
fn doc(lines: &[&str]) -> Vec<Block> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let hashes = line.chars().take_while(|&c| c == '#').count();
            if hashes > 0 {
                Block::heading(i, hashes as u8, line[hashes..].trim())
            } else {
                Block::content(i, BlockKind::Paragraph, *line)
            }
        })
        .collect()
}

fn texts(blocks: &[Block]) -> Vec<&str> {
    blocks.iter().map(|b| b.text.as_str()).collect()
}

fn ids(blocks: &[Block]) -> Vec<usize> {
    blocks.iter().map(|b| b.id.0).collect()
}

fn toc(headings: &[&str]) -> Vec<TocEntry> {
    headings.iter().map(|h| TocEntry::Heading(h.to_string())).collect()
}

fn targets(headings: &[&str]) -> TargetTree {
    TargetTree::from_toc(&toc(headings), &mut Diagnostics::new()).unwrap()
}

#[test]
fn reorders_top_level_sections_with_their_children() {
    let blocks = doc(&["# A", "p1", "## A.1", "p2", "# B", "p3"]);
    let result = reorganize(blocks, &targets(&["B", "A"]), &ReorgConfig::default()).unwrap();
    assert_eq!(
        texts(&result.blocks),
        vec!["# B", "p3", "# A", "p1", "## A.1", "p2"]
    );
    assert!(result.diagnostics.is_empty());
}

#[test]
fn top_level_order_follows_the_table_of_contents() {
    let blocks = doc(&["# One", "a", "# Two", "b", "# Three", "c", "# Four", "d"]);
    let order = ["Three", "One", "Four", "Two"];
    let result = reorganize(blocks, &targets(&order), &ReorgConfig::default()).unwrap();
    let headings: Vec<&str> = result
        .blocks
        .iter()
        .filter_map(|b| b.heading.as_ref())
        .map(|h| h.text.as_str())
        .collect();
    assert_eq!(headings, order);
    assert_eq!(result.blocks.len(), 8);
}

#[test]
fn preamble_always_comes_first() {
    let blocks = doc(&["lead", "more lead", "# A", "a", "# B", "b"]);
    let result = reorganize(blocks, &targets(&["B", "A"]), &ReorgConfig::default()).unwrap();
    assert_eq!(texts(&result.blocks), vec!["lead", "more lead", "# B", "b", "# A", "a"]);
}

#[test]
fn generated_order_reproduces_the_document() {
    let blocks = doc(&[
        "front",
        "# Intro",
        "a",
        "### Jump",
        "b",
        "## Notes",
        "# Body",
        "## Notes",
        "c",
        "# Intro",
        "d",
        "## Notes",
    ]);
    let generated = build_target_order_from_source(&blocks);
    assert_eq!(generated.len(), 7);
    let result = reorganize(blocks.clone(), &generated, &ReorgConfig::default()).unwrap();
    assert_eq!(result.blocks, blocks);
    assert_eq!(result.diagnostics.warnings().count(), 0);
}

#[test]
fn generated_order_survives_the_toc_file() {
    let blocks = doc(&["# A", "## A", "# B", "x", "## C", "# A"]);
    let file = TocFile {
        toc: build_target_order_from_source(&blocks).to_toc(),
    };
    let yaml = file.to_yaml().unwrap();
    assert!(yaml.contains("occurrence: 1"));
    let reread = TocFile::from_yaml(&yaml).unwrap();
    let result = reorganize_with_toc(blocks.clone(), &reread.toc, &ReorgConfig::default()).unwrap();
    assert_eq!(ids(&result.blocks), ids(&blocks));
}

#[test]
fn duplicate_heading_matches_first_occurrence() {
    let source = ["# Intro", "a", "# Body", "b", "# Intro", "c"];
    for _ in 0..3 {
        let planned = plan(doc(&source), &targets(&["Body", "Intro"]), &ReorgConfig::default()).unwrap();
        let placements: Vec<(usize, PlacementAction)> = planned
            .plan
            .walk()
            .into_iter()
            .map(|(_, e)| (planned.tree.get(e.source.unwrap()).occurrence_index, e.action))
            .collect();
        assert_eq!(
            placements,
            vec![
                (0, PlacementAction::Matched),
                (0, PlacementAction::Matched),
                (1, PlacementAction::WarnedExtra),
            ]
        );
        let duplicate_warning = planned
            .diagnostics
            .warnings()
            .find(|d| d.message.starts_with("duplicate heading"))
            .expect("duplicate warning");
        assert!(duplicate_warning.message.contains("matched occurrence 0"));
        assert!(duplicate_warning.message.contains("unused occurrence 1"));

        let result = planned.linearize();
        assert_eq!(ids(&result.blocks), vec![2, 3, 0, 1, 4, 5]);
    }
}

#[test]
fn missing_target_policies() {
    let source = ["# Intro", "a", "# Body", "b"];
    let order = ["Intro", "Conclusion", "Body"];

    let config = ReorgConfig::default().with_missing_target(MissingTargetPolicy::Error);
    let err = reorganize(doc(&source), &targets(&order), &config).unwrap_err();
    assert_eq!(
        err,
        ReorgError::MissingTarget {
            level: 1,
            heading_text: "Conclusion".into()
        }
    );
    assert!(err.to_string().contains("'Conclusion'"));

    let config = ReorgConfig::default().with_missing_target(MissingTargetPolicy::Warn);
    let result = reorganize(doc(&source), &targets(&order), &config).unwrap();
    assert_eq!(ids(&result.blocks), vec![0, 1, 2, 3]);
    let warnings: Vec<_> = result.diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("Conclusion"));

    let config = ReorgConfig::default().with_missing_target(MissingTargetPolicy::Ignore);
    let result = reorganize(doc(&source), &targets(&order), &config).unwrap();
    assert_eq!(ids(&result.blocks), vec![0, 1, 2, 3]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn extra_section_policies() {
    let source = ["# Intro", "a", "# Appendix", "b", "# Body", "c"];
    let order = ["Body", "Intro"];

    let config = ReorgConfig::default().with_extra_section(ExtraSectionPolicy::Append);
    let result = reorganize(doc(&source), &targets(&order), &config).unwrap();
    assert_eq!(
        texts(&result.blocks),
        vec!["# Body", "c", "# Intro", "a", "# Appendix", "b"]
    );
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics.warnings().count(), 0);

    let config = ReorgConfig::default().with_extra_section(ExtraSectionPolicy::Delete);
    let result = reorganize(doc(&source), &targets(&order), &config).unwrap();
    assert_eq!(texts(&result.blocks), vec!["# Body", "c", "# Intro", "a"]);

    let config = ReorgConfig::default().with_extra_section(ExtraSectionPolicy::Warn);
    let result = reorganize(doc(&source), &targets(&order), &config).unwrap();
    assert_eq!(
        texts(&result.blocks),
        vec!["# Body", "c", "# Intro", "a", "# Appendix", "b"]
    );
    let warnings: Vec<_> = result.diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].context.contains("Appendix"));
}

#[test]
fn extras_keep_their_relative_order_and_nesting() {
    let source = ["# X", "x", "## X.1", "# Keep", "k", "# Y", "## Y.1", "y"];
    let result = reorganize(doc(&source), &targets(&["Keep"]), &ReorgConfig::default()).unwrap();
    assert_eq!(
        texts(&result.blocks),
        vec!["# Keep", "k", "# X", "x", "## X.1", "# Y", "## Y.1", "y"]
    );
    assert_eq!(result.diagnostics.warnings().count(), 4);
}

#[test]
fn partially_listed_children() {
    let source = ["# Guide", "g", "## Install", "i", "## Usage", "u", "## FAQ", "f"];
    let entries = vec![TocEntry::Node(TocNode {
        heading: "Guide".into(),
        level: None,
        children: toc(&["Usage", "Install"]),
        occurrence: None,
    })];
    let config = ReorgConfig::default().with_extra_section(ExtraSectionPolicy::Append);
    let result = reorganize_with_toc(doc(&source), &entries, &config).unwrap();
    assert_eq!(
        texts(&result.blocks),
        vec!["# Guide", "g", "## Usage", "u", "## Install", "i", "## FAQ", "f"]
    );
}

#[test]
fn duplicate_siblings_abort_before_reconciliation() {
    let err = reorganize_with_toc(doc(&["# A"]), &toc(&["A", "A"]), &ReorgConfig::default())
        .unwrap_err();
    assert!(matches!(err, ReorgError::Config(_)));
}

#[test]
fn degenerate_inputs() {
    let result = reorganize(Vec::new(), &targets(&["A"]), &ReorgConfig::default()).unwrap();
    assert!(result.blocks.is_empty());

    let blocks = doc(&["lead", "# A", "a"]);
    let result = reorganize(blocks.clone(), &TargetTree::empty(), &ReorgConfig::default()).unwrap();
    assert_eq!(texts(&result.blocks), vec!["lead"]);

    let config = ReorgConfig::default().with_empty_target(EmptyTargetPolicy::Unchanged);
    let result = reorganize(blocks.clone(), &TargetTree::empty(), &config).unwrap();
    assert_eq!(result.blocks, blocks);
}

#[test]
fn markdown_end_to_end() {
    let source = "\
Front text.

# Usage

Run it.

## Flags

`-v`

# Install

```sh
cargo install mdreorg
```
";
    let stream = Parser::new(source.to_string(), 0).parse();
    let result = reorganize_with_toc(stream.blocks, &toc(&["Install", "Usage"]), &ReorgConfig::default())
        .unwrap();
    assert_eq!(
        render_markdown(&result.blocks),
        "\
Front text.

# Install

```sh
cargo install mdreorg
```

# Usage

Run it.

## Flags

`-v`
"
    );
}
