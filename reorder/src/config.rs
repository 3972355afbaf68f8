use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What to do with a table-of-contents entry that matches no section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingTargetPolicy {
    /// Abort the run.
    Error,
    /// Skip the entry and record a warning.
    #[default]
    Warn,
    /// Skip the entry silently.
    Ignore,
}

/// What to do with a section that no table-of-contents entry claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtraSectionPolicy {
    /// Place it after all listed sections.
    Append,
    /// Drop it and its content.
    Delete,
    /// Place it like `Append` and record a warning.
    #[default]
    Warn,
}

/// What an empty table of contents means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyTargetPolicy {
    /// Keep only the content before the first heading.
    #[default]
    PreambleOnly,
    /// Leave the document as it is.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ReorgConfig {
    pub missing_target: MissingTargetPolicy,
    pub extra_section: ExtraSectionPolicy,
    pub empty_target: EmptyTargetPolicy,
}

impl ReorgConfig {
    pub fn with_missing_target(mut self, policy: MissingTargetPolicy) -> Self {
        self.missing_target = policy;
        self
    }

    pub fn with_extra_section(mut self, policy: ExtraSectionPolicy) -> Self {
        self.extra_section = policy;
        self
    }

    pub fn with_empty_target(mut self, policy: EmptyTargetPolicy) -> Self {
        self.empty_target = policy;
        self
    }
}

macro_rules! policy_names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const NAMES: &'static [&'static str] = &[$($name),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown policy '{}' (expected one of: {})",
                        other,
                        Self::NAMES.join(", ")
                    )),
                }
            }
        }
    };
}

policy_names!(MissingTargetPolicy {
    Error => "error",
    Warn => "warn",
    Ignore => "ignore",
});

policy_names!(ExtraSectionPolicy {
    Append => "append",
    Delete => "delete",
    Warn => "warn",
});

policy_names!(EmptyTargetPolicy {
    PreambleOnly => "preamble-only",
    Unchanged => "unchanged",
});
