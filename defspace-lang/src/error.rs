use std::fmt;
use std::sync::Arc;

pub use defspace_types::Span;

/// Errors raised while lexing, parsing or running a definition file
#[derive(Debug, Clone, thiserror::Error)]
pub enum LangError {
    #[error("Lexer error at {span:?}: {message}")]
    LexerError { span: Span, message: String },

    #[error("Parser error at {span:?}: {message}")]
    ParserError { span: Span, message: String },

    #[error("Unbound identifier at {span:?}: {name}")]
    UnboundIdentifier { span: Span, name: String },

    #[error("No module named {module}")]
    ModuleNotFound { span: Span, module: String },

    #[error("Type error at {span:?}: {message}")]
    TypeError { span: Span, message: String },

    #[error("Arity mismatch at {span:?}: {name} expected {expected}, got {got}")]
    ArityMismatch {
        span: Span,
        name: String,
        expected: String,
        got: usize,
    },

    #[error("Attribute error at {span:?}: {message}")]
    AttributeError { span: Span, message: String },

    #[error("Index error at {span:?}: {message}")]
    IndexError { span: Span, message: String },

    #[error("Evaluation error at {span:?}: {message}")]
    EvaluationError { span: Span, message: String },

    /// Failure inside code of another unit, reported at the call site
    #[error("in {unit}: {source}")]
    Raised {
        span: Span,
        unit: String,
        source: Box<LangError>,
    },

    /// Failure raised by a host object (a namespace or a deferred binding)
    #[error(transparent)]
    Host(Arc<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, LangError>;

impl LangError {
    pub fn type_error(message: impl Into<String>) -> Self {
        LangError::TypeError {
            span: Span::default(),
            message: message.into(),
        }
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        LangError::AttributeError {
            span: Span::default(),
            message: message.into(),
        }
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        LangError::IndexError {
            span: Span::default(),
            message: message.into(),
        }
    }

    pub fn evaluation_error(message: impl Into<String>) -> Self {
        LangError::EvaluationError {
            span: Span::default(),
            message: message.into(),
        }
    }

    pub fn host(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        LangError::Host(Arc::new(error))
    }

    /// Name of the module an `import` failed to find, if that is what this is
    pub fn missing_module(&self) -> Option<&str> {
        match self {
            LangError::ModuleNotFound { module, .. } => Some(module),
            _ => None,
        }
    }

    /// The embedder's error carried by a `Host` error
    pub fn host_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            LangError::Host(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }

    /// Mark an error that left code of `unit`, so its span is not read
    /// against the caller's source. The call site is filled in by [`at`].
    ///
    /// [`at`]: LangError::at
    pub fn raised_in(self, unit: &str) -> Self {
        match self.span() {
            Some(span) if span != Span::default() => LangError::Raised {
                span: Span::default(),
                unit: unit.to_string(),
                source: Box::new(self),
            },
            _ => self,
        }
    }

    /// The error as first raised, below any `Raised` wrappers
    pub fn origin(&self) -> &LangError {
        match self {
            LangError::Raised { source, .. } => source.origin(),
            other => other,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            LangError::LexerError { span, .. }
            | LangError::ParserError { span, .. }
            | LangError::UnboundIdentifier { span, .. }
            | LangError::ModuleNotFound { span, .. }
            | LangError::TypeError { span, .. }
            | LangError::ArityMismatch { span, .. }
            | LangError::AttributeError { span, .. }
            | LangError::IndexError { span, .. }
            | LangError::EvaluationError { span, .. }
            | LangError::Raised { span, .. } => Some(*span),
            LangError::Host(_) => None,
        }
    }

    /// Attach `span` if the error was raised without a location
    pub fn at(mut self, at: Span) -> Self {
        match &mut self {
            LangError::LexerError { span, .. }
            | LangError::ParserError { span, .. }
            | LangError::UnboundIdentifier { span, .. }
            | LangError::ModuleNotFound { span, .. }
            | LangError::TypeError { span, .. }
            | LangError::ArityMismatch { span, .. }
            | LangError::AttributeError { span, .. }
            | LangError::IndexError { span, .. }
            | LangError::EvaluationError { span, .. }
            | LangError::Raised { span, .. } => {
                if *span == Span::default() {
                    *span = at;
                }
            }
            LangError::Host(_) => {}
        }
        self
    }
}

/// Display context for better error messages
pub struct ErrorContext<'a> {
    pub source: &'a str,
    pub error: &'a LangError,
}

impl<'a> ErrorContext<'a> {
    pub fn new(source: &'a str, error: &'a LangError) -> Self {
        Self { source, error }
    }

    /// Get the source line containing the error
    pub fn source_line(&self) -> Option<&'a str> {
        let start = self.start()?;

        let line_start = self.source[..start]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let line_end = self.source[start..]
            .find('\n')
            .map(|pos| start + pos)
            .unwrap_or(self.source.len());

        Some(&self.source[line_start..line_end])
    }

    /// Get line and column numbers (1-indexed)
    pub fn line_col(&self) -> Option<(usize, usize)> {
        let start = self.start()?;

        let line = self.source[..start].matches('\n').count() + 1;
        let line_start = self.source[..start]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let col = start - line_start + 1;

        Some((line, col))
    }

    fn start(&self) -> Option<usize> {
        let span = self.error.span()?;
        // Runtime errors raised outside a source position carry the default span
        if span == Span::default() || span.start > self.source.len() {
            return None;
        }
        if !self.source.is_char_boundary(span.start) {
            return None;
        }
        Some(span.start)
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((line, col)) = self.line_col() else {
            return writeln!(f, "  {}", self.error);
        };
        writeln!(f, "Error at line {}, column {}:", line, col)?;
        writeln!(f, "  {}", self.error)?;

        if let Some(source_line) = self.source_line() {
            writeln!(f)?;
            writeln!(f, "  {}", source_line)?;
            let span = self.error.span().unwrap_or_default();
            let col_start = col - 1;
            let width = span
                .len()
                .min(source_line.len().saturating_sub(col_start))
                .max(1);
            let indicator = " ".repeat(col_start) + &"^".repeat(width);
            writeln!(f, "  {}", indicator)?;
        }

        Ok(())
    }
}
