//! Diagnostics reported instead of raised.
//!
//! Calling a definition that was never defined does not fail the caller; a
//! diagnostic naming the definition file is reported and the call yields
//! `none`. Where it goes is decided by the registry's [`DiagnosticSink`].

use serde::Serialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn new(code: &str, severity: Severity, message: String) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message,
            location: None,
        }
    }

    pub fn with_location(mut self, location: &Path) -> Self {
        self.location = Some(location.to_path_buf());
        self
    }

    /// A call reached a definition file that yields no definition
    pub fn missing_definition(location: &Path) -> Self {
        Self::new(
            "definition.missing",
            Severity::Error,
            format!("No definition found at {}", location.display()),
        )
        .with_location(location)
    }
}

/// Destination for diagnostics
#[derive(Debug, Clone, Default)]
pub enum DiagnosticSink {
    /// Print the message to standard error
    #[default]
    Stderr,
    /// Keep diagnostics in memory
    Collect(Rc<RefCell<Vec<Diagnostic>>>),
}

impl DiagnosticSink {
    pub fn collecting() -> Self {
        DiagnosticSink::Collect(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn emit(&self, diagnostic: Diagnostic) {
        tracing::debug!(code = %diagnostic.code, "{}", diagnostic.message);
        match self {
            DiagnosticSink::Stderr => eprintln!("{}", diagnostic.message),
            DiagnosticSink::Collect(store) => store.borrow_mut().push(diagnostic),
        }
    }

    /// Diagnostics collected so far (always empty for `Stderr`)
    pub fn collected(&self) -> Vec<Diagnostic> {
        match self {
            DiagnosticSink::Stderr => Vec::new(),
            DiagnosticSink::Collect(store) => store.borrow().clone(),
        }
    }
}
