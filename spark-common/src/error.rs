//! Error handling for the Spark IR library
//!
//! This module defines the error type returned by construction-time
//! operations and the diagnostic types produced by the verifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by construction-time operations.
///
/// Every fallible operation fails as a whole: when a builder call or a
/// module operation returns one of these, nothing was appended and the
/// module is still in its last valid state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    /// An operand or result violated an operation's type contract.
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    /// A struct body was set twice, or layout was read before the body
    /// was set.
    #[error("incomplete struct type '{name}': {message}")]
    TypeIncomplete { name: String, message: String },

    /// A function or global name is already taken in the module.
    #[error("duplicate definition of '{name}' in module '{module}'")]
    DuplicateDefinition { module: String, name: String },

    /// A lookup by name found nothing.
    #[error("'{name}' not found in module '{module}'")]
    NotFound { module: String, name: String },

    /// An argument or struct field index is past the end.
    #[error("{what} index {index} out of range (limit {limit})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    /// The builder tried to emit into a block that already ends in a
    /// terminator.
    #[error("cannot append to block '{block}': it already has a terminator")]
    AppendAfterTerminator { block: String },

    /// The builder was used before `set_insert_point`.
    #[error("builder has no insertion point")]
    NoInsertPoint,
}

/// Severity levels for verifier diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A single verifier finding.
///
/// The message names the offending entity (function, block, instruction
/// position) since IR entities have no source locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;

        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::error("bad phi".to_string());
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "bad phi");
        assert!(diag.notes.is_empty());
    }

    #[test]
    fn test_diagnostic_with_notes() {
        let diag = Diagnostic::error("bad phi".to_string())
            .with_note("expected 2 incoming edges".to_string())
            .with_note("found 1".to_string());

        assert_eq!(diag.notes.len(), 2);
        assert_eq!(
            diag.to_string(),
            "error: bad phi\n  note: expected 2 incoming edges\n  note: found 1"
        );
    }

    #[test]
    fn test_error_display() {
        let err = IrError::DuplicateDefinition {
            module: "m".to_string(),
            name: "max".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate definition of 'max' in module 'm'");

        let err = IrError::IndexOutOfRange {
            what: "argument",
            index: 2,
            limit: 2,
        };
        assert_eq!(err.to_string(), "argument index 2 out of range (limit 2)");
    }
}
