//! Bulk ingestion of photos and videos into an Immich server.
//!
//! A run walks a file, directory or archive, classifies every file against
//! the server's supported extensions, folds sidecars and live-photo motion
//! files into their primary asset, fingerprints and uploads the bundles on
//! a bounded worker pool, and finally adds the uploaded assets to the
//! requested albums with one call per album.
//!
//! The server is reached through the traits in [`server`], so the pipeline
//! can run against the HTTP client or an in-memory double.

pub mod albums;
pub mod archive;
pub mod classify;
pub mod error;
pub mod expand;
pub mod fingerprint;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod server;
pub mod types;
pub mod upload;

#[cfg(test)]
mod testing;

pub use albums::{AlbumAssigner, AlbumAssignment};
pub use classify::{Dispatch, MediaClassifier, Verdict};
pub use error::IngestError;
pub use expand::{EntryError, PathExpander};
pub use fingerprint::{Fingerprint, HashAlgorithm, fingerprint};
pub use pipeline::{Ingestion, run_ingestion};
pub use report::ResultAggregator;
pub use retry::RetryPolicy;
pub use server::{
    AlbumDirectory, AlbumRef, AssetUploader, BoxFuture, ImmichServer, RemoteError,
    ServerCapabilities, UploadError, UploadResponse,
};
pub use types::{
    AlbumResult, AssetBundle, ClassifiedItem, DEFAULT_CONCURRENCY, FileEntry, IngestEvent,
    IngestOptions, IngestionReport, OutcomeStatus, Role, SkipReason, StatusCounts,
    SupportedMedia, UploadOutcome, UploadRequest,
};
pub use upload::{UploadOrchestrator, device_asset_id};

/// Device id sent with uploads when none is configured: the host name.
pub fn default_device_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "immich-rs".to_string())
}
