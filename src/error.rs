use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Failures raised by the curve-processing core.
///
/// Every variant carries enough context (file path, set index) to locate the
/// offending input.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot open {}: {source}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("set {set} has no values")]
    EmptyRow { set: usize },

    #[error("curve table has no rows")]
    EmptyTable,

    #[error("x-values size mismatch: expected {expected} values, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("malformed header in {}: {reason}", path.display())]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("set {set} has {found} values, expected {expected}")]
    RaggedRow {
        set: usize,
        expected: usize,
        found: usize,
    },

    #[error("set {set} has a non-finite value at position {index}")]
    NonFiniteValue { set: usize, index: usize },

    #[error("{}: set {set} ends after {found} of {expected} values", path.display())]
    TruncatedData {
        path: PathBuf,
        set: usize,
        expected: usize,
        found: usize,
    },

    #[error("{}:{line}: '{token}' is not a number", path.display())]
    MalformedValue {
        path: PathBuf,
        line: usize,
        token: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub fn not_found(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ScanError::FileNotFound {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
