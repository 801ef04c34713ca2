use std::path::PathBuf;

use thiserror::Error;

/// Library error type for slideshow operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A directory could not be read while building the catalog.
    ///
    /// Catalog builds never return this; they count it and keep going.
    #[error("cannot enumerate {path}: {source}")]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image at `path` is corrupt or in an unsupported format.
    #[error("cannot decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Moving a file or directory to the trash failed.
    #[error("cannot delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog has no entries left to show.
    #[error("no images found")]
    EmptyCatalog,

    /// The `--regex` filter does not compile.
    #[error("invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Resampling a frame for display failed.
    #[error("render error: {0}")]
    Render(anyhow::Error),
}

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
