use thiserror::Error;

/// Problems with the table of contents itself, found before reconciliation starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("duplicate entry '{heading_text}' (level {level}) under {parent}")]
    DuplicateSibling {
        level: u8,
        heading_text: String,
        /// Human-readable name of the enclosing entry, or "the top level".
        parent: String,
    },
    #[error("invalid entry '{heading_text}': {reason}")]
    InvalidEntry { heading_text: String, reason: String },
}

/// Errors that abort a reorganization run. No output is produced when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorgError {
    #[error("invalid table of contents: {0}")]
    Config(#[from] ConfigError),
    #[error("heading '{heading_text}' (level {level}) is listed in the table of contents but not found in the document")]
    MissingTarget { level: u8, heading_text: String },
}
