use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for amalgamation
#[derive(Error, Debug)]
pub enum AmalgamError {
    /// A source file (entry or inlined) could not be opened or read as text
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An include marker line without a path token
    #[error("Error on include on line {line} of {file}")]
    MalformedDirective { file: PathBuf, line: usize },

    /// A local include whose target does not exist
    #[error("File {path} not found on line {line} of {file}")]
    ReferenceNotFound {
        path: PathBuf,
        file: PathBuf,
        line: usize,
    },

    /// A local include whose target exists but cannot be read
    #[error("Cannot read {path} on line {line} of {file}: {source}")]
    UnreadableReference {
        path: PathBuf,
        file: PathBuf,
        line: usize,
        #[source]
        source: io::Error,
    },

    /// A local include that leads back to a file already being expanded
    #[error("Include cycle detected: {}", format_chain(.chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    /// Path traversal security error
    #[error("Path traversal detected (include escapes the base directory): {path}")]
    PathTraversal { path: PathBuf },

    /// IO error when writing output
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, AmalgamError>;
