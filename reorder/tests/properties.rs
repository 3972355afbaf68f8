use std::collections::HashSet;

use outline::block::{Block, BlockKind};
use outline::toc::{TocEntry, TocNode};
use proptest::prelude::*;
use reorder::{
    Diagnostics, ExtraSectionPolicy, MissingTargetPolicy, ReorgConfig, TargetTree,
    build_target_order_from_source, reorganize,
};

const NAMES: [&str; 4] = ["Alpha", "Beta", "Gamma", "Delta"];

/// `None` is a paragraph, `Some((level, name))` a heading.
fn document() -> impl Strategy<Value = Vec<Block>> {
    prop::collection::vec(prop::option::of((1u8..=3, 0usize..NAMES.len())), 0..24).prop_map(
        |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Some((level, name)) => Block::heading(i, level, NAMES[name]),
                    None => Block::content(i, BlockKind::Paragraph, format!("paragraph {}", i)),
                })
                .collect()
        },
    )
}

fn entry(level: u8, name: usize, children: Vec<TocEntry>) -> TocEntry {
    TocEntry::Node(TocNode {
        heading: NAMES[name].to_string(),
        level: Some(level),
        children,
        occurrence: None,
    })
}

/// Two-level tables of contents with explicit levels.
fn toc() -> impl Strategy<Value = Vec<TocEntry>> {
    let leaf = (1u8..=3, 0usize..NAMES.len());
    prop::collection::vec((leaf.clone(), prop::collection::vec(leaf, 0..3)), 0..6).prop_map(
        |nodes| {
            nodes
                .into_iter()
                .map(|((level, name), children)| {
                    let children = children
                        .into_iter()
                        .map(|(level, name)| entry(level, name, Vec::new()))
                        .collect();
                    entry(level, name, children)
                })
                .collect()
        },
    )
}

fn extra_policy() -> impl Strategy<Value = ExtraSectionPolicy> {
    prop_oneof![
        Just(ExtraSectionPolicy::Append),
        Just(ExtraSectionPolicy::Delete),
        Just(ExtraSectionPolicy::Warn),
    ]
}

fn missing_policy() -> impl Strategy<Value = MissingTargetPolicy> {
    prop_oneof![
        Just(MissingTargetPolicy::Warn),
        Just(MissingTargetPolicy::Ignore),
    ]
}

proptest! {
    #[test]
    fn every_block_is_emitted_at_most_once(
        blocks in document(),
        entries in toc(),
        extra in extra_policy(),
        missing in missing_policy(),
    ) {
        // Randomly drawn siblings may repeat a key; those are rejected up front.
        let targets = TargetTree::from_toc(&entries, &mut Diagnostics::new());
        prop_assume!(targets.is_ok());
        let targets = targets.unwrap();

        let total = blocks.len();
        let config = ReorgConfig::default()
            .with_extra_section(extra)
            .with_missing_target(missing);
        let result = reorganize(blocks, &targets, &config).unwrap();

        let mut seen = HashSet::new();
        for block in &result.blocks {
            prop_assert!(seen.insert(block.id), "block {} emitted twice", block.id);
        }
        if extra != ExtraSectionPolicy::Delete && !targets.is_empty() {
            prop_assert_eq!(seen.len(), total);
        }
    }

    #[test]
    fn generated_order_is_a_fixed_point(blocks in document()) {
        let targets = build_target_order_from_source(&blocks);
        let result = reorganize(blocks.clone(), &targets, &ReorgConfig::default()).unwrap();
        prop_assert_eq!(result.blocks, blocks);
        prop_assert_eq!(result.diagnostics.warnings().count(), 0);
    }

    #[test]
    fn generated_order_matches_document_headings(blocks in document()) {
        let targets = build_target_order_from_source(&blocks);
        let from_targets: Vec<(u8, &str)> = targets
            .nodes()
            .iter()
            .map(|n| (n.level, n.heading_text.as_str()))
            .collect();
        let from_blocks: Vec<(u8, &str)> = blocks
            .iter()
            .filter_map(|b| b.heading.as_ref())
            .map(|h| (h.level, h.text.as_str()))
            .collect();
        prop_assert_eq!(from_targets, from_blocks);
    }
}
