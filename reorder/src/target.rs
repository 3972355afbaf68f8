use std::collections::HashMap;
use std::fmt;

use outline::block::normalize_heading_text;
use outline::toc::{TocEntry, TocNode};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ConfigError;
use crate::section::{SectionId, SectionKey, SectionTree};

/// Index of a node in its [`TargetTree`]. Ids follow pre-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub usize);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// One desired heading: shaped like a section, without content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNode {
    pub id: TargetId,
    pub level: u8,
    pub heading_text: String,
    pub children: Vec<TargetId>,
    pub parent: Option<TargetId>,
    /// Occurrence of the source section this node was generated from.
    /// Only set for repeated headings; never used for matching.
    pub occurrence_index: Option<usize>,
}

impl TargetNode {
    pub fn key(&self) -> SectionKey {
        SectionKey::new(self.level, self.heading_text.clone())
    }

    pub fn describe(&self) -> String {
        format!("entry '{}' (level {})", self.heading_text, self.level)
    }
}

/// The desired order and nesting of headings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetTree {
    nodes: Vec<TargetNode>,
    roots: Vec<TargetId>,
}

impl TargetTree {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from table-of-contents entries.
    ///
    /// A declared level wins over nesting; an undeclared one is the parent's
    /// level plus one. Children at or above their parent's level are kept but
    /// warned about. Repeated sibling keys and unusable entries are errors,
    /// unless every repeat carries its own occurrence annotation.
    pub fn from_toc(
        entries: &[TocEntry],
        diagnostics: &mut Diagnostics,
    ) -> Result<TargetTree, ConfigError> {
        let mut tree = TargetTree::default();
        let roots = tree.add_entries(entries, None, diagnostics)?;
        tree.roots = roots;
        log::debug!(
            "built target tree: {} entries, {} top-level",
            tree.nodes.len(),
            tree.roots.len()
        );
        Ok(tree)
    }

    fn add_entries(
        &mut self,
        entries: &[TocEntry],
        parent: Option<TargetId>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<TargetId>, ConfigError> {
        let parent_level = parent.map_or(0, |p| self.get(p).level);
        let mut seen: HashMap<SectionKey, Vec<Option<usize>>> = HashMap::new();
        let mut ids = Vec::with_capacity(entries.len());

        for entry in entries {
            let heading_text = normalize_heading_text(entry.heading());
            if heading_text.is_empty() {
                return Err(ConfigError::InvalidEntry {
                    heading_text: entry.heading().to_string(),
                    reason: "heading text is empty".into(),
                });
            }

            let level = match entry.level() {
                Some(0) => {
                    return Err(ConfigError::InvalidEntry {
                        heading_text,
                        reason: "level must be at least 1".into(),
                    });
                }
                Some(level) => level,
                None => parent_level.saturating_add(1),
            };

            if let Some(p) = parent {
                if level <= parent_level {
                    diagnostics.push(Diagnostic::warning(
                        format!(
                            "level {} is not deeper than its parent's level {}; the declared level is used",
                            level, parent_level
                        ),
                        format!("entry '{}' under {}", heading_text, self.get(p).describe()),
                    ));
                }
            }

            let key = SectionKey::new(level, heading_text.clone());
            let occurrence = entry.occurrence();
            let earlier = seen.entry(key).or_default();
            let ambiguous = earlier
                .iter()
                .any(|&o| o.is_none() || occurrence.is_none() || o == occurrence);
            earlier.push(occurrence);
            if ambiguous {
                return Err(ConfigError::DuplicateSibling {
                    level,
                    heading_text,
                    parent: match parent {
                        Some(p) => self.get(p).describe(),
                        None => "the top level".to_string(),
                    },
                });
            }

            let id = TargetId(self.nodes.len());
            self.nodes.push(TargetNode {
                id,
                level,
                heading_text,
                children: Vec::new(),
                parent,
                occurrence_index: occurrence,
            });
            let children = self.add_entries(entry.children(), Some(id), diagnostics)?;
            self.nodes[id.0].children = children;
            ids.push(id);
        }

        Ok(ids)
    }

    /// One node per section, in document order, repeated headings included.
    pub fn from_sections(source: &SectionTree) -> TargetTree {
        let mut tree = TargetTree::default();
        let roots = source
            .roots()
            .iter()
            .map(|&s| tree.add_section(source, s, None))
            .collect();
        tree.roots = roots;
        tree
    }

    fn add_section(
        &mut self,
        source: &SectionTree,
        section_id: SectionId,
        parent: Option<TargetId>,
    ) -> TargetId {
        let section = source.get(section_id);
        let repeated = source.occurrences(&section.key()).len() > 1;
        let id = TargetId(self.nodes.len());
        self.nodes.push(TargetNode {
            id,
            level: section.level,
            heading_text: section.heading_text.clone(),
            children: Vec::new(),
            parent,
            occurrence_index: repeated.then_some(section.occurrence_index),
        });
        let children = section
            .children
            .iter()
            .map(|&c| self.add_section(source, c, Some(id)))
            .collect();
        self.nodes[id.0].children = children;
        id
    }

    /// Convert back to table-of-contents entries. Levels are always written out.
    pub fn to_toc(&self) -> Vec<TocEntry> {
        self.roots.iter().map(|&id| self.to_entry(id)).collect()
    }

    fn to_entry(&self, id: TargetId) -> TocEntry {
        let node = self.get(id);
        TocEntry::Node(TocNode {
            heading: node.heading_text.clone(),
            level: Some(node.level),
            children: node.children.iter().map(|&c| self.to_entry(c)).collect(),
            occurrence: node.occurrence_index,
        })
    }

    pub fn roots(&self) -> &[TargetId] {
        &self.roots
    }

    /// Every node in pre-order.
    pub fn nodes(&self) -> &[TargetNode] {
        &self.nodes
    }

    pub fn get(&self, id: TargetId) -> &TargetNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline::toc::TocFile;

    fn build(yaml: &str) -> (Result<TargetTree, ConfigError>, Diagnostics) {
        let file = TocFile::from_yaml(yaml).unwrap();
        let mut diagnostics = Diagnostics::new();
        let tree = TargetTree::from_toc(&file.toc, &mut diagnostics);
        (tree, diagnostics)
    }

    #[test]
    fn derives_levels_from_nesting() {
        let (tree, diagnostics) = build("toc:\n  - heading: A\n    children:\n      - A.1\n  - B\n");
        let tree = tree.unwrap();
        assert!(diagnostics.is_empty());
        let levels: Vec<(String, u8)> = tree
            .nodes()
            .iter()
            .map(|n| (n.heading_text.clone(), n.level))
            .collect();
        assert_eq!(
            levels,
            vec![("A".into(), 1), ("A.1".into(), 2), ("B".into(), 1)]
        );
        assert_eq!(tree.get(TargetId(1)).parent, Some(TargetId(0)));
        assert_eq!(tree.roots(), &[TargetId(0), TargetId(2)]);
    }

    #[test]
    fn declared_level_wins_and_mismatch_warns() {
        let (tree, diagnostics) =
            build("toc:\n  - heading: A\n    level: 2\n    children:\n      - heading: B\n        level: 1\n");
        let tree = tree.unwrap();
        assert_eq!(tree.get(TargetId(0)).level, 2);
        assert_eq!(tree.get(TargetId(1)).level, 1);
        assert_eq!(diagnostics.warnings().count(), 1);
        assert!(diagnostics.iter().next().unwrap().context.contains("'B'"));
    }

    #[test]
    fn duplicate_siblings_are_rejected() {
        let (tree, _) = build("toc:\n  - A\n  - heading: A\n    level: 1\n");
        assert_eq!(
            tree.unwrap_err(),
            ConfigError::DuplicateSibling {
                level: 1,
                heading_text: "A".into(),
                parent: "the top level".into(),
            }
        );
    }

    #[test]
    fn annotated_repeats_are_accepted() {
        let yaml = "toc:\n  - heading: A\n    occurrence: 0\n  - heading: A\n    occurrence: 1\n";
        let (tree, _) = build(yaml);
        assert_eq!(tree.unwrap().len(), 2);
        let (tree, _) = build("toc:\n  - heading: A\n    occurrence: 0\n  - A\n");
        assert!(matches!(tree, Err(ConfigError::DuplicateSibling { .. })));
    }

    #[test]
    fn same_text_at_different_levels_is_fine() {
        let (tree, _) = build("toc:\n  - A\n  - heading: A\n    level: 2\n");
        assert_eq!(tree.unwrap().len(), 2);
    }

    #[test]
    fn invalid_entries() {
        let (tree, _) = build("toc:\n  - heading: A\n    level: 0\n");
        assert!(matches!(tree, Err(ConfigError::InvalidEntry { .. })));
        let (tree, _) = build("toc:\n  - \"   \"\n");
        assert!(matches!(tree, Err(ConfigError::InvalidEntry { .. })));
    }

    #[test]
    fn heading_text_is_normalized() {
        let (tree, _) = build("toc:\n  - \"  Getting   started \"\n");
        assert_eq!(tree.unwrap().get(TargetId(0)).heading_text, "Getting started");
    }
}
