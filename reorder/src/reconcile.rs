//! Matching a target tree against a section tree.
//!
//! Matching is global: a table-of-contents entry claims the first unclaimed
//! section with the same `(level, heading_text)` wherever it sits in the
//! source, so a section can be moved to a different parent. Entries are
//! visited in pre-order, which for a table of contents generated from the
//! document itself is document order; the k-th entry for a repeated heading
//! therefore claims the k-th occurrence.

use std::collections::HashMap;

use crate::config::{EmptyTargetPolicy, ExtraSectionPolicy, MissingTargetPolicy, ReorgConfig};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ReorgError;
use crate::section::{SectionId, SectionKey, SectionTree};
use crate::target::{TargetId, TargetTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementAction {
    /// Placed where the table of contents puts it. Entries without a target
    /// were carried along with a matched ancestor.
    Matched,
    AppendedExtra,
    DeletedExtra,
    WarnedExtra,
    MissingError,
    MissingWarn,
    MissingIgnored,
}

impl PlacementAction {
    /// Whether the source section of an entry with this action is written out.
    pub fn emits_source(&self) -> bool {
        match self {
            PlacementAction::Matched
            | PlacementAction::AppendedExtra
            | PlacementAction::WarnedExtra => true,
            PlacementAction::DeletedExtra
            | PlacementAction::MissingError
            | PlacementAction::MissingWarn
            | PlacementAction::MissingIgnored => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementAction::Matched => "matched",
            PlacementAction::AppendedExtra => "appended",
            PlacementAction::DeletedExtra => "deleted",
            PlacementAction::WarnedExtra => "appended (warned)",
            PlacementAction::MissingError => "missing",
            PlacementAction::MissingWarn => "missing (skipped)",
            PlacementAction::MissingIgnored => "missing (ignored)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementEntry {
    pub source: Option<SectionId>,
    pub target: Option<TargetId>,
    pub action: PlacementAction,
    /// Entries placed inside this one, in output order.
    pub children: Vec<PlacementEntry>,
}

impl PlacementEntry {
    fn new(source: Option<SectionId>, target: Option<TargetId>, action: PlacementAction) -> Self {
        PlacementEntry {
            source,
            target,
            action,
            children: Vec::new(),
        }
    }

    fn with_children(mut self, children: Vec<PlacementEntry>) -> Self {
        self.children = children;
        self
    }
}

/// The ordered placement of every section. The preamble is not part of the
/// plan; it always comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    entries: Vec<PlacementEntry>,
}

impl ReconciliationPlan {
    pub fn entries(&self) -> &[PlacementEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PlacementEntry> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry with its nesting depth, in pre-order.
    pub fn walk(&self) -> Vec<(usize, &PlacementEntry)> {
        fn visit<'a>(entries: &'a [PlacementEntry], depth: usize, out: &mut Vec<(usize, &'a PlacementEntry)>) {
            for entry in entries {
                out.push((depth, entry));
                visit(&entry.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        visit(&self.entries, 0, &mut out);
        out
    }

    pub fn count(&self, action: PlacementAction) -> usize {
        self.walk().iter().filter(|(_, e)| e.action == action).count()
    }
}

/// Produce the placement plan for `tree` according to `targets`.
///
/// Fails only under [`MissingTargetPolicy::Error`], naming the first entry in
/// pre-order that matched nothing. Every other outcome is recorded in
/// `diagnostics`.
pub fn reconcile(
    tree: &SectionTree,
    targets: &TargetTree,
    config: &ReorgConfig,
    diagnostics: &mut Diagnostics,
) -> Result<ReconciliationPlan, ReorgError> {
    if targets.is_empty() {
        return Ok(empty_target_plan(tree, config.empty_target, diagnostics));
    }

    let mut state = Reconciler::new(tree, targets);
    state.claim_all();

    let mut entries: Vec<PlacementEntry> = targets
        .roots()
        .iter()
        .map(|&t| state.target_entry(t, config.missing_target, diagnostics))
        .collect();

    if let Some(t) = first_missing_error(&entries) {
        let node = targets.get(t);
        return Err(ReorgError::MissingTarget {
            level: node.level,
            heading_text: node.heading_text.clone(),
        });
    }

    state.report_unused_duplicates(diagnostics);
    entries.extend(state.extra_entries(config.extra_section, diagnostics));

    let plan = ReconciliationPlan { entries };
    log::info!(
        "reconciled {} sections against {} entries: {} matched, {} extra, {} missing",
        tree.len(),
        targets.len(),
        state.claimed_count(),
        state.extra_count(),
        state.missing_count()
    );
    Ok(plan)
}

fn first_missing_error(entries: &[PlacementEntry]) -> Option<TargetId> {
    entries.iter().find_map(|entry| {
        if entry.action == PlacementAction::MissingError {
            entry.target
        } else {
            first_missing_error(&entry.children)
        }
    })
}

fn empty_target_plan(
    tree: &SectionTree,
    policy: EmptyTargetPolicy,
    diagnostics: &mut Diagnostics,
) -> ReconciliationPlan {
    let action = match policy {
        EmptyTargetPolicy::PreambleOnly => {
            if !tree.is_empty() {
                diagnostics.push(Diagnostic::note(
                    format!(
                        "table of contents is empty; {} sections dropped, only the preamble is kept",
                        tree.len()
                    ),
                    "table of contents",
                ));
            }
            PlacementAction::DeletedExtra
        }
        EmptyTargetPolicy::Unchanged => PlacementAction::Matched,
    };

    fn subtree(tree: &SectionTree, id: SectionId, action: PlacementAction) -> PlacementEntry {
        let children = tree
            .get(id)
            .children
            .iter()
            .map(|&c| subtree(tree, c, action))
            .collect();
        PlacementEntry::new(Some(id), None, action).with_children(children)
    }

    ReconciliationPlan {
        entries: tree
            .roots()
            .iter()
            .map(|&id| subtree(tree, id, action))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Reconciler state
// ---------------------------------------------------------------------------

struct Reconciler<'a> {
    tree: &'a SectionTree,
    targets: &'a TargetTree,
    /// Per section: the entry that claimed it.
    claims: Vec<Option<TargetId>>,
    /// Per target: the section it claimed.
    matches: Vec<Option<SectionId>>,
    /// Per section: moved along with a matched ancestor.
    carried: Vec<bool>,
    /// Entries that found no section, under any policy.
    missing: usize,
}

impl<'a> Reconciler<'a> {
    fn new(tree: &'a SectionTree, targets: &'a TargetTree) -> Self {
        Reconciler {
            tree,
            targets,
            claims: vec![None; tree.len()],
            matches: vec![None; targets.len()],
            carried: vec![false; tree.len()],
            missing: 0,
        }
    }

    /// Give every target the lowest unclaimed occurrence of its key.
    fn claim_all(&mut self) {
        let mut next_occurrence: HashMap<SectionKey, usize> = HashMap::new();
        for node in self.targets.nodes() {
            let key = node.key();
            let candidates = self.tree.occurrences(&key);
            let next = next_occurrence.entry(key).or_insert(0);
            if let Some(&section) = candidates.get(*next) {
                *next += 1;
                self.claims[section.0] = Some(node.id);
                self.matches[node.id.0] = Some(section);
            }
        }
    }

    fn target_entry(
        &mut self,
        t: TargetId,
        policy: MissingTargetPolicy,
        diagnostics: &mut Diagnostics,
    ) -> PlacementEntry {
        let targets = self.targets;
        let node = targets.get(t);
        let nested = |state: &mut Self, diagnostics: &mut Diagnostics| -> Vec<PlacementEntry> {
            node.children
                .iter()
                .map(|&c| state.target_entry(c, policy, diagnostics))
                .collect()
        };

        if let Some(section) = self.matches[t.0] {
            // A leaf entry moves the section's whole subtree.
            let children = if node.children.is_empty() {
                self.carried_children(section)
            } else {
                nested(self, diagnostics)
            };
            return PlacementEntry::new(Some(section), Some(t), PlacementAction::Matched)
                .with_children(children);
        }

        self.missing += 1;
        let action = match policy {
            MissingTargetPolicy::Error => PlacementAction::MissingError,
            MissingTargetPolicy::Warn => {
                diagnostics.push(Diagnostic::warning(
                    format!(
                        "heading {} is not in the document; entry skipped",
                        node.key()
                    ),
                    node.describe(),
                ));
                PlacementAction::MissingWarn
            }
            MissingTargetPolicy::Ignore => PlacementAction::MissingIgnored,
        };
        // Matched descendants of a missing entry take its place.
        let children = nested(self, diagnostics);
        PlacementEntry::new(None, Some(t), action).with_children(children)
    }

    fn carried_children(&mut self, section: SectionId) -> Vec<PlacementEntry> {
        let tree = self.tree;
        let unclaimed: Vec<SectionId> = tree
            .get(section)
            .children
            .iter()
            .copied()
            .filter(|c| self.claims[c.0].is_none())
            .collect();

        let mut entries = Vec::with_capacity(unclaimed.len());
        for child in unclaimed {
            self.carried[child.0] = true;
            let children = self.carried_children(child);
            entries.push(
                PlacementEntry::new(Some(child), None, PlacementAction::Matched).with_children(children),
            );
        }
        entries
    }

    fn is_extra(&self, id: SectionId) -> bool {
        self.claims[id.0].is_none() && !self.carried[id.0]
    }

    fn claimed_count(&self) -> usize {
        self.claims.iter().filter(|c| c.is_some()).count()
    }

    fn missing_count(&self) -> usize {
        self.missing
    }

    fn extra_count(&self) -> usize {
        (0..self.tree.len())
            .filter(|&i| self.is_extra(SectionId(i)))
            .count()
    }

    /// Warn about repeated headings that an entry matched while other
    /// occurrences of the same heading were left over.
    fn report_unused_duplicates(&self, diagnostics: &mut Diagnostics) {
        for section in self.tree.sections() {
            if section.occurrence_index != 0 {
                continue;
            }
            let occurrences = self.tree.occurrences(&section.key());
            if occurrences.len() < 2 {
                continue;
            }
            let (used, unused): (Vec<SectionId>, Vec<SectionId>) = occurrences
                .iter()
                .copied()
                .partition(|id| self.claims[id.0].is_some());
            let unused: Vec<SectionId> = unused.into_iter().filter(|&id| self.is_extra(id)).collect();
            if used.is_empty() || unused.is_empty() {
                continue;
            }

            let list = |ids: &[SectionId]| {
                ids.iter()
                    .map(|&id| self.tree.get(id).occurrence_index.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            diagnostics.push(
                Diagnostic::warning(
                    format!(
                        "duplicate heading {}: matched occurrence {}; unused occurrence {} treated as extra",
                        section.key(),
                        list(&used),
                        list(&unused)
                    ),
                    format!("heading {}", section.key()),
                )
                .with_span(self.tree.get(unused[0]).span()),
            );
        }
    }

    /// Entries for every section nothing claimed or carried, in document order.
    /// An extra section under an extra parent stays nested under it.
    fn extra_entries(
        &self,
        policy: ExtraSectionPolicy,
        diagnostics: &mut Diagnostics,
    ) -> Vec<PlacementEntry> {
        self.tree
            .sections()
            .iter()
            .filter(|s| self.is_extra(s.id) && s.parent.is_none_or(|p| !self.is_extra(p)))
            .map(|s| self.extra_entry(s.id, policy, diagnostics))
            .collect()
    }

    fn extra_entry(
        &self,
        id: SectionId,
        policy: ExtraSectionPolicy,
        diagnostics: &mut Diagnostics,
    ) -> PlacementEntry {
        let section = self.tree.get(id);
        let action = match policy {
            ExtraSectionPolicy::Append => {
                diagnostics.push(
                    Diagnostic::note("not in the table of contents; appended at the end", section.describe())
                        .with_span(section.span()),
                );
                PlacementAction::AppendedExtra
            }
            ExtraSectionPolicy::Delete => {
                diagnostics.push(
                    Diagnostic::note("not in the table of contents; deleted", section.describe())
                        .with_span(section.span()),
                );
                PlacementAction::DeletedExtra
            }
            ExtraSectionPolicy::Warn => {
                diagnostics.push(
                    Diagnostic::warning(
                        "not in the table of contents; appended at the end",
                        section.describe(),
                    )
                    .with_span(section.span()),
                );
                PlacementAction::WarnedExtra
            }
        };
        let children = section
            .children
            .iter()
            .filter(|&&c| self.is_extra(c))
            .map(|&c| self.extra_entry(c, policy, diagnostics))
            .collect();
        PlacementEntry::new(Some(id), None, action).with_children(children)
    }
}
