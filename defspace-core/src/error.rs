use defspace_lang::LangError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DefError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Loading a definition file failed
    #[error("{}{}: {source}", .path.display(), position(.line_col))]
    Definition {
        path: PathBuf,
        line_col: Option<(usize, usize)>,
        #[source]
        source: LangError,
    },

    /// Calling or inspecting a loaded definition failed
    #[error(transparent)]
    Lang(#[from] LangError),

    #[error("Circular load of {name}: it is used while its own file is still loading")]
    CircularLoad { name: String },

    #[error("Unknown definition: {0}")]
    UnknownName(String),

    #[error("{} is not a directory with a usable name", .path.display())]
    InvalidSpace { path: PathBuf },

    #[error("Registry dropped before {name} was resolved")]
    Detached { name: String },
}

fn position(line_col: &Option<(usize, usize)>) -> String {
    match line_col {
        Some((line, col)) => format!(":{}:{}", line, col),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, DefError>;

impl DefError {
    /// The language error behind this failure, looking through load failures
    /// of other definitions it depended on
    pub fn lang_error(&self) -> Option<&LangError> {
        let source = match self {
            DefError::Definition { source, .. } | DefError::Lang(source) => source,
            _ => return None,
        };
        let source = source.origin();
        match source.host_error().and_then(|e| e.downcast_ref::<DefError>()) {
            Some(inner) => inner.lang_error(),
            None => Some(source),
        }
    }
}

/// Errors crossing back into script code. Failures of a call keep their
/// language error; anything tied to loading a file keeps the file.
impl From<DefError> for LangError {
    fn from(err: DefError) -> Self {
        match err {
            DefError::Lang(source) => source,
            other => LangError::host(other),
        }
    }
}
