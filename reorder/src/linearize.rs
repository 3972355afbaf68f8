use outline::block::Block;

use crate::reconcile::{PlacementEntry, ReconciliationPlan};
use crate::section::SectionTree;

/// A section's own blocks, waiting to be placed.
type Slot = Option<(Block, Vec<Block>)>;

/// Flatten a plan into the output block sequence.
///
/// The preamble comes first. Each section's blocks are moved out of the tree
/// the first time an entry names it, so no block can appear twice; a repeated
/// reference is logged and skipped.
pub fn linearize(tree: SectionTree, plan: ReconciliationPlan) -> Vec<Block> {
    let total = tree.block_count();
    let (preamble, sections) = tree.into_parts();
    let mut slots: Vec<Slot> = sections
        .into_iter()
        .map(|s| Some((s.heading, s.content_blocks)))
        .collect();

    let mut out = preamble;
    let mut dropped = 0;
    for entry in plan.into_entries() {
        place(entry, &mut slots, &mut out, &mut dropped);
    }

    let unplaced = slots.iter().filter(|s| s.is_some()).count();
    if unplaced > 0 {
        log::warn!("{} sections were not named by the plan and are dropped", unplaced);
    }
    log::debug!(
        "linearized {} of {} blocks ({} dropped)",
        out.len(),
        total,
        dropped
    );
    out
}

fn place(entry: PlacementEntry, slots: &mut [Slot], out: &mut Vec<Block>, dropped: &mut usize) {
    if let Some(id) = entry.source {
        match slots.get_mut(id.0).and_then(Option::take) {
            Some((heading, content)) if entry.action.emits_source() => {
                out.push(heading);
                out.extend(content);
            }
            Some((_, content)) => *dropped += 1 + content.len(),
            None => log::warn!("section {} placed more than once; repeat ignored", id),
        }
    }
    for child in entry.children {
        place(child, slots, out, dropped);
    }
}
