use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use outline::block::Block;

use crate::diagnostics::Diagnostic;

/// Index of a section in its tree's arena. Ids are assigned in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionId(pub usize);

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// The identity sections and table-of-contents entries are matched on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionKey {
    pub level: u8,
    pub heading_text: String,
}

impl SectionKey {
    pub fn new(level: u8, heading_text: impl Into<String>) -> Self {
        SectionKey {
            level,
            heading_text: heading_text.into(),
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' (level {})", self.heading_text, self.level)
    }
}

/// A heading together with everything it owns up to the next heading of the
/// same or a higher level.
#[derive(Debug, Clone)]
pub struct Section {
    pub id: SectionId,
    pub level: u8,
    pub heading_text: String,
    /// 0 for the first section with this `(level, heading_text)`, 1 for the next, ...
    pub occurrence_index: usize,
    pub heading: Block,
    /// Blocks between this heading and the next heading of any level.
    pub content_blocks: Vec<Block>,
    pub children: Vec<SectionId>,
    pub parent: Option<SectionId>,
}

impl Section {
    pub fn key(&self) -> SectionKey {
        SectionKey::new(self.level, self.heading_text.clone())
    }

    pub fn span(&self) -> Range<usize> {
        self.heading.span.clone()
    }

    /// Location text used in diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "section '{}' (level {}, occurrence {})",
            self.heading_text, self.level, self.occurrence_index
        )
    }
}

/// A `(level, heading_text)` key seen more than once in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateHeading {
    pub key: SectionKey,
    /// Sections sharing the key, in occurrence order.
    pub sections: Vec<SectionId>,
}

impl DuplicateHeading {
    pub fn to_diagnostic(&self, tree: &SectionTree) -> Diagnostic {
        let indices: Vec<String> = (0..self.sections.len()).map(|i| i.to_string()).collect();
        let mut diagnostic = Diagnostic::note(
            format!(
                "heading {} appears {} times (occurrences {})",
                self.key,
                self.sections.len(),
                indices.join(", ")
            ),
            format!("heading {}", self.key),
        );
        if let Some(&second) = self.sections.get(1) {
            diagnostic = diagnostic.with_span(tree.get(second).span());
        }
        diagnostic
    }
}

/// Sections of a document, arranged by heading level.
///
/// Sections live in an arena indexed by [`SectionId`]; parent and child links
/// are ids, never references. The tree is read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SectionTree {
    preamble: Vec<Block>,
    sections: Vec<Section>,
    roots: Vec<SectionId>,
    by_key: HashMap<SectionKey, Vec<SectionId>>,
}

impl SectionTree {
    /// Build the tree in one pass over the block stream.
    ///
    /// Never fails: level jumps are accepted, and repeated headings are
    /// reported rather than rejected.
    pub fn build(blocks: Vec<Block>) -> (SectionTree, Vec<DuplicateHeading>) {
        let mut tree = SectionTree::default();
        // Open sections, innermost last.
        let mut stack: Vec<SectionId> = Vec::new();

        for block in blocks {
            let Some(heading) = block.heading.clone() else {
                match stack.last() {
                    Some(&open) => tree.sections[open.0].content_blocks.push(block),
                    None => tree.preamble.push(block),
                }
                continue;
            };

            while let Some(&top) = stack.last() {
                if tree.sections[top.0].level >= heading.level {
                    stack.pop();
                } else {
                    break;
                }
            }

            let id = SectionId(tree.sections.len());
            let parent = stack.last().copied();
            let key = SectionKey::new(heading.level, heading.text.clone());
            let same_key = tree.by_key.entry(key).or_default();
            let occurrence_index = same_key.len();
            same_key.push(id);

            tree.sections.push(Section {
                id,
                level: heading.level,
                heading_text: heading.text,
                occurrence_index,
                heading: block,
                content_blocks: Vec::new(),
                children: Vec::new(),
                parent,
            });
            match parent {
                Some(p) => tree.sections[p.0].children.push(id),
                None => tree.roots.push(id),
            }
            stack.push(id);
        }

        let duplicates = tree.duplicates();
        log::debug!(
            "built section tree: {} sections, {} roots, {} preamble blocks, {} duplicated headings",
            tree.sections.len(),
            tree.roots.len(),
            tree.preamble.len(),
            duplicates.len()
        );
        (tree, duplicates)
    }

    /// Repeated keys, ordered by first appearance.
    fn duplicates(&self) -> Vec<DuplicateHeading> {
        self.sections
            .iter()
            .filter(|s| s.occurrence_index == 0)
            .filter_map(|s| {
                let key = s.key();
                let ids = self.by_key.get(&key)?;
                (ids.len() > 1).then(|| DuplicateHeading {
                    key,
                    sections: ids.clone(),
                })
            })
            .collect()
    }

    /// Blocks before the first heading.
    pub fn preamble(&self) -> &[Block] {
        &self.preamble
    }

    /// Top-level sections in document order.
    pub fn roots(&self) -> &[SectionId] {
        &self.roots
    }

    /// Every section, in document order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn get(&self, id: SectionId) -> &Section {
        &self.sections[id.0]
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections carrying `key`, ordered by occurrence index.
    pub fn occurrences(&self, key: &SectionKey) -> &[SectionId] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nesting depth of a section; roots are at depth 0.
    pub fn depth(&self, id: SectionId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).parent;
        }
        depth
    }

    /// Total number of blocks held by the tree.
    pub fn block_count(&self) -> usize {
        self.preamble.len()
            + self
                .sections
                .iter()
                .map(|s| 1 + s.content_blocks.len())
                .sum::<usize>()
    }

    /// Give up the tree, returning the preamble and the section arena.
    pub fn into_parts(self) -> (Vec<Block>, Vec<Section>) {
        (self.preamble, self.sections)
    }
}
