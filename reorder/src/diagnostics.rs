use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label, Severity};

/// A non-fatal finding recorded while building, matching or placing sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Where the finding applies, e.g. `section 'Intro' (level 1, occurrence 1)`.
    pub context: String,
    /// Byte span of the related heading in the Markdown source, when there is one.
    pub span: Option<Range<usize>>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, context: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            context: context.into(),
            span: None,
        }
    }

    pub fn note(message: impl Into<String>, context: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Note,
            message: message.into(),
            context: context.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity >= Severity::Warning
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_codespan(&self, file_id: usize) -> CodespanDiagnostic<usize> {
        let diagnostic = CodespanDiagnostic::new(self.severity).with_message(&self.message);
        match &self.span {
            Some(span) => diagnostic
                .with_labels(vec![Label::primary(file_id, span.clone()).with_message(&self.context)]),
            None => diagnostic.with_notes(vec![self.context.clone()]),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Bug => "bug",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
        };
        write!(f, "{}: {} ({})", label, self.message, self.context)
    }
}

/// Ordered collection of diagnostics, passed explicitly through each stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::debug!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// Diagnostics at warning severity or above.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_warning())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
