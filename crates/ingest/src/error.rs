//! Ingestion error types.

use std::path::PathBuf;

use crate::server::RemoteError;

/// Errors produced during ingestion.
///
/// Setup-time variants abort a run. Per-file and per-album variants are
/// caught at their own scope and recorded in the report instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("unsupported archive format: {}", .0.display())]
    UnsupportedArchive(PathBuf),

    #[error("cannot read archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("permission denied: {}", .0.display())]
    Permission(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot fetch supported media types: {0}")]
    Capabilities(RemoteError),

    #[error("cannot create album {album:?}: {message}")]
    AlbumCreation { album: String, message: String },

    #[error("cannot add assets to album {album:?}: {message}")]
    AlbumAssign { album: String, message: String },
}

impl IngestError {
    /// Maps an I/O error on `path`, singling out permission failures.
    pub(crate) fn from_io(path: PathBuf, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::Permission(path)
        } else {
            Self::Io(err)
        }
    }
}
