//! Executing a definition file and extracting its definition.

use crate::error::{DefError, Result};
use defspace_lang::{ErrorContext, ImportResolver, Interpreter, Value};
use std::io::ErrorKind;
use std::path::Path;

/// Why a definition file produced no definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
    /// The file does not exist (any more)
    FileMissing,
    /// The file ran but bound nothing under its own name
    NoMatchingBinding,
    /// The file imports itself while it is still loading
    SelfImport,
}

/// Outcome of loading a definition file
#[derive(Debug, Clone)]
pub enum Loaded {
    Definition(Value),
    Absent(AbsentReason),
}

impl Loaded {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Loaded::Definition(value) => Some(value),
            Loaded::Absent(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Loaded::Definition(value) => Some(value),
            Loaded::Absent(_) => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Loaded::Absent(_))
    }
}

/// Name of the unit a definition file defines: its file stem
pub fn unit_name(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

/// Execute the file at `path` as a fresh unit and return the global binding
/// named like the file.
///
/// Imports are resolved through `imports`. A failed import of the unit's own
/// name is the unit importing itself while it loads and yields
/// [`AbsentReason::SelfImport`]; every other failure is returned.
pub fn load_definition(path: &Path, imports: &dyn ImportResolver) -> Result<Loaded> {
    let Some(unit) = unit_name(path) else {
        return Ok(Loaded::Absent(AbsentReason::FileMissing));
    };

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!("Definition file {} is missing", path.display());
            return Ok(Loaded::Absent(AbsentReason::FileMissing));
        }
        Err(source) => {
            return Err(DefError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    tracing::debug!("Loading {} from {}", unit, path.display());
    let mut interpreter = Interpreter::new(imports);
    match interpreter.execute_module(unit, &source) {
        Ok(module) => Ok(match module.get(unit) {
            Some(value) => Loaded::Definition(value),
            None => {
                tracing::debug!("{} does not bind {}", path.display(), unit);
                Loaded::Absent(AbsentReason::NoMatchingBinding)
            }
        }),
        Err(err) if err.missing_module() == Some(unit) => {
            tracing::debug!("{} imports itself while loading", path.display());
            Ok(Loaded::Absent(AbsentReason::SelfImport))
        }
        Err(err) => {
            let line_col = ErrorContext::new(&source, &err).line_col();
            Err(DefError::Definition {
                path: path.to_path_buf(),
                line_col,
                source: err,
            })
        }
    }
}
