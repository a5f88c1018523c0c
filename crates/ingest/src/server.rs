//! Collaborator traits the pipeline talks to.
//!
//! The CLI implements these on top of `immich-client`. Keeping them as
//! traits keeps the pipeline transport-agnostic and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use immich_protocol::AssetUploadResponse;

use crate::types::{SupportedMedia, UploadRequest};

/// Boxed future returned by collaborator methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The server's answer to an upload: asset id plus created/replaced/duplicate.
pub type UploadResponse = AssetUploadResponse;

/// Failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// 4xx: the request itself is wrong. Never retried.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// 5xx: the server failed. Retried.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// No usable response. Retried.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built or the answer could not be read.
    /// Never retried.
    #[error("{0}")]
    Invalid(String),
}

impl RemoteError {
    /// Classifies a failed HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if (400..500).contains(&status) {
            Self::Rejected { status, message }
        } else {
            Self::Server { status, message }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Network(_))
    }
}

/// Error type of [`AssetUploader::upload`].
pub type UploadError = RemoteError;

/// An album as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
}

/// Source of the supported-extension sets. Queried once per run.
pub trait ServerCapabilities: Send + Sync {
    fn supported_media(&self) -> BoxFuture<'_, Result<SupportedMedia, RemoteError>>;
}

/// Album lookup and mutation.
pub trait AlbumDirectory: Send + Sync {
    fn list_albums(&self) -> BoxFuture<'_, Result<Vec<AlbumRef>, RemoteError>>;

    /// Creates an album and returns its id.
    fn create_album<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<String, RemoteError>>;

    /// Adds assets to an album in one call. Returns how many were added.
    fn add_assets<'a>(
        &'a self,
        album_id: &'a str,
        asset_ids: &'a [String],
    ) -> BoxFuture<'a, Result<usize, RemoteError>>;
}

/// Submits one multipart upload. Implementors stream the files from disk.
pub trait AssetUploader: Send + Sync {
    fn upload<'a>(
        &'a self,
        request: &'a UploadRequest,
    ) -> BoxFuture<'a, Result<UploadResponse, UploadError>>;
}

/// Everything the pipeline needs from a server.
pub trait ImmichServer: ServerCapabilities + AlbumDirectory + AssetUploader {}

impl<T: ServerCapabilities + AlbumDirectory + AssetUploader> ImmichServer for T {}
