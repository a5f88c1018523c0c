//! Async client for the Immich REST API.
//!
//! Authenticates with an API key and covers the server, asset, album, tag,
//! stack and job endpoints. Uploads stream file content from disk.

pub mod client;
pub mod error;
pub mod media;
pub mod upload;

#[cfg(test)]
mod mock;

pub use client::{Client, ClientConfig};
pub use error::Error;
pub use upload::{AssetUploadParams, UploadChecksum, format_timestamp};

