use std::path::PathBuf;

use thiserror::Error;

/// Result alias for archive loading and analysis.
pub type Result<T> = std::result::Result<T, CandError>;

/// Which column registry a lookup was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `features` – columns of the feature vectors.
    Feature,
    /// `featureind` – axes of the location keys.
    Location,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Feature => write!(f, "feature"),
            ColumnKind::Location => write!(f, "location"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CandError {
    #[error("corrupt archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("missing {kind} column '{name}'")]
    MissingColumn { kind: ColumnKind, name: String },

    #[error("schema mismatch in {}: {reason}", path.display())]
    SchemaMismatch { path: PathBuf, reason: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CandError {
    pub(crate) fn corrupt(path: &std::path::Path, reason: impl Into<String>) -> Self {
        CandError::CorruptArchive {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CandError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn missing(kind: ColumnKind, name: &str) -> Self {
        CandError::MissingColumn {
            kind,
            name: name.to_string(),
        }
    }
}
