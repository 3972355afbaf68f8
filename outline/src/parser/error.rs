use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// Non-fatal reader findings with source location information.
#[derive(Debug, Clone)]
pub struct ParseWarning {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl ParseWarning {
    pub fn new(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseWarning {
            message: message.into(),
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Warning)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}
