//! Reorders the sections of a block stream to follow a table of contents.
//!
//! The pipeline is: [`SectionTree::build`] → [`reconcile`] (against a
//! [`TargetTree`]) → [`linearize`]. Each stage consumes the complete output of
//! the previous one and returns a new value; findings that do not stop the run
//! are collected in [`Diagnostics`].

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod linearize;
pub mod reconcile;
pub mod section;
pub mod target;

pub use config::{EmptyTargetPolicy, ExtraSectionPolicy, MissingTargetPolicy, ReorgConfig};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{ConfigError, ReorgError};
pub use linearize::linearize;
pub use reconcile::{PlacementAction, PlacementEntry, ReconciliationPlan, reconcile};
pub use section::{SectionId, SectionKey, SectionTree};
pub use target::{TargetId, TargetNode, TargetTree};

use outline::block::Block;
use outline::toc::TocEntry;

/// Output of a successful run.
#[derive(Debug, Clone)]
pub struct Reorganized {
    pub blocks: Vec<Block>,
    pub diagnostics: Diagnostics,
}

/// A reconciled document that has not been linearized yet.
#[derive(Debug, Clone)]
pub struct Planned {
    pub tree: SectionTree,
    pub plan: ReconciliationPlan,
    pub diagnostics: Diagnostics,
}

impl Planned {
    pub fn linearize(self) -> Reorganized {
        Reorganized {
            blocks: linearize(self.tree, self.plan),
            diagnostics: self.diagnostics,
        }
    }
}

/// Build the section tree and reconcile it, stopping short of output.
pub fn plan(
    blocks: Vec<Block>,
    targets: &TargetTree,
    config: &ReorgConfig,
) -> Result<Planned, ReorgError> {
    let mut diagnostics = Diagnostics::new();
    let (tree, duplicates) = SectionTree::build(blocks);
    for duplicate in &duplicates {
        diagnostics.push(duplicate.to_diagnostic(&tree));
    }
    let plan = reconcile(&tree, targets, config, &mut diagnostics)?;
    Ok(Planned {
        tree,
        plan,
        diagnostics,
    })
}

/// Reorder `blocks` to follow `targets`.
///
/// Either every block is placed according to the plan, or an error is
/// returned and nothing is produced.
pub fn reorganize(
    blocks: Vec<Block>,
    targets: &TargetTree,
    config: &ReorgConfig,
) -> Result<Reorganized, ReorgError> {
    Ok(plan(blocks, targets, config)?.linearize())
}

/// [`reorganize`] straight from table-of-contents entries. Warnings about the
/// entries themselves come first in the returned diagnostics.
pub fn reorganize_with_toc(
    blocks: Vec<Block>,
    toc: &[TocEntry],
    config: &ReorgConfig,
) -> Result<Reorganized, ReorgError> {
    let mut diagnostics = Diagnostics::new();
    let targets = TargetTree::from_toc(toc, &mut diagnostics)?;
    let mut result = reorganize(blocks, &targets, config)?;
    diagnostics.extend(result.diagnostics);
    result.diagnostics = diagnostics;
    Ok(result)
}

/// A target tree describing the document as it is: one node per section, in
/// document order, repeated headings included and annotated with their
/// occurrence index.
pub fn build_target_order_from_source(blocks: &[Block]) -> TargetTree {
    let (tree, _) = SectionTree::build(blocks.to_vec());
    TargetTree::from_sections(&tree)
}
