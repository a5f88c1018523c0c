//! Request and response types for the Immich REST API.
//!
//! Field names follow the server's camelCase JSON. Timestamps are kept as
//! the server's ISO 8601 strings so values survive a round trip unchanged.

pub mod album;
pub mod asset;
pub mod job;
pub mod server;
pub mod tag;
pub mod user;

// Re-export primary types for convenience.
pub use album::{Album, BulkIdsRequest, CreateAlbumRequest};
pub use asset::{
    Asset, AssetType, AssetUploadResponse, AssetUploadStatus, BulkIdResponse,
    BulkUpdateAssetsRequest, DeleteAssetsRequest, ExifInfo, MetadataSearchRequest,
    SearchResponse, Stack, UpdateAssetRequest,
};
pub use job::{AllJobStatus, JobCommand, JobName, JobStatus};
pub use server::{
    AssetStatistics, MediaKind, MediaTypes, PingResponse, ServerAbout, ServerStatistics,
};
pub use tag::{BulkTagAssetsResponse, Tag};
pub use user::User;
