//! The table-of-contents file format.
//!
//! ```yaml
//! toc:
//!   - Introduction
//!   - heading: Usage
//!     level: 1
//!     children:
//!       - Install
//!       - heading: Configure
//! ```
//!
//! A bare string is a heading whose level is implied by its nesting depth.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TocError {
    #[error("invalid table of contents: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("table of contents must contain a top-level 'toc' key")]
    MissingTocKey,
}

/// One entry of a table of contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TocEntry {
    /// Shorthand: heading text only.
    Heading(String),
    Node(TocNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TocNode {
    pub heading: String,
    /// Declared heading level. Derived from nesting when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntry>,
    /// Which occurrence of a repeated heading this entry was generated from.
    /// Informational; matching always takes the first unused occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<usize>,
}

impl TocEntry {
    pub fn heading(&self) -> &str {
        match self {
            TocEntry::Heading(text) => text,
            TocEntry::Node(node) => &node.heading,
        }
    }

    pub fn level(&self) -> Option<u8> {
        match self {
            TocEntry::Heading(_) => None,
            TocEntry::Node(node) => node.level,
        }
    }

    pub fn children(&self) -> &[TocEntry] {
        match self {
            TocEntry::Heading(_) => &[],
            TocEntry::Node(node) => &node.children,
        }
    }

    pub fn occurrence(&self) -> Option<usize> {
        match self {
            TocEntry::Heading(_) => None,
            TocEntry::Node(node) => node.occurrence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TocFile {
    pub toc: Vec<TocEntry>,
}

#[derive(Deserialize)]
struct RawTocFile {
    toc: Option<Vec<TocEntry>>,
}

impl TocFile {
    pub fn from_yaml(text: &str) -> Result<Self, TocError> {
        let raw: RawTocFile = serde_yaml::from_str(text)?;
        let toc = raw.toc.ok_or(TocError::MissingTocKey)?;
        if toc.is_empty() {
            log::warn!("table of contents is empty");
        }
        Ok(TocFile { toc })
    }

    pub fn to_yaml(&self) -> Result<String, TocError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Total number of entries at every depth.
    pub fn entry_count(&self) -> usize {
        fn count(entries: &[TocEntry]) -> usize {
            entries.iter().map(|e| 1 + count(e.children())).sum()
        }
        count(&self.toc)
    }
}
