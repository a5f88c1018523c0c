//! Data types for the ingestion flow.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use immich_protocol::{MediaKind, MediaTypes};
use serde::Serialize;

use crate::fingerprint::Fingerprint;
use crate::retry::RetryPolicy;

/// A regular file discovered under the ingestion root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub source_path: PathBuf,
    /// Path relative to the root, `/`-separated.
    pub relative_path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl FileEntry {
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Directory part of the relative path, empty for top-level files.
    pub fn dir(&self) -> &str {
        self.relative_path
            .rsplit_once('/')
            .map_or("", |(dir, _)| dir)
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// Last extension, lowercased, without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                Some(ext.to_ascii_lowercase())
            }
            _ => None,
        }
    }
}

/// Role of a supported file within its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    PrimaryAsset,
    Sidecar,
    LivePhotoMotion,
}

/// A file with its role. Companions name their primary by relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedItem {
    pub entry: FileEntry,
    pub role: Role,
    pub primary: Option<String>,
}

/// Why a file produced a `Skipped` outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedMediaType(Option<String>),
    OrphanedSidecar,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedMediaType(Some(ext)) => write!(f, "unsupported media type: .{ext}"),
            Self::UnsupportedMediaType(None) => f.write_str("unsupported media type: no extension"),
            Self::OrphanedSidecar => f.write_str("sidecar without a matching asset"),
        }
    }
}

/// A primary asset with the companions that travel in its upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBundle {
    pub primary: FileEntry,
    pub sidecar: Option<FileEntry>,
    pub live_photo: Option<FileEntry>,
}

impl AssetBundle {
    pub fn single(primary: FileEntry) -> Self {
        Self {
            primary,
            sidecar: None,
            live_photo: None,
        }
    }

    pub fn companion_paths(&self) -> Vec<String> {
        self.sidecar
            .iter()
            .chain(self.live_photo.iter())
            .map(|e| e.relative_path.clone())
            .collect()
    }
}

/// Extension sets the server accepts, lowercased without dots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedMedia {
    pub image: HashSet<String>,
    pub video: HashSet<String>,
    pub sidecar: HashSet<String>,
}

impl SupportedMedia {
    pub fn kind_of(&self, ext: &str) -> Option<MediaKind> {
        if self.image.contains(ext) {
            Some(MediaKind::Image)
        } else if self.video.contains(ext) {
            Some(MediaKind::Video)
        } else if self.sidecar.contains(ext) || ext == "json" {
            // Takeout-style `<name>.<ext>.json` metadata is always accepted.
            Some(MediaKind::Sidecar)
        } else {
            None
        }
    }
}

impl From<&MediaTypes> for SupportedMedia {
    fn from(types: &MediaTypes) -> Self {
        let set = |list: &[String]| {
            list.iter()
                .map(|e| immich_protocol::server::normalize_extension(e))
                .collect()
        };
        Self {
            image: set(&types.image),
            video: set(&types.video),
            sidecar: set(&types.sidecar),
        }
    }
}

/// One upload, built from a bundle and consumed by a single submission.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub asset: FileEntry,
    pub sidecar: Option<FileEntry>,
    pub live_photo: Option<FileEntry>,
    pub fingerprint: Fingerprint,
    pub device_asset_id: String,
    pub device_id: String,
    pub original_file_name: String,
    pub file_created_at: DateTime<Utc>,
    pub file_modified_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub is_archived: bool,
}

/// Final status of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Created,
    Duplicate,
    Skipped,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Duplicate => "duplicate",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        })
    }
}

/// Result for one discovered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub relative_path: String,
    pub source_path: PathBuf,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Sidecar and live-photo files folded into this upload.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub companions: Vec<String>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub attempts: u32,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

impl UploadOutcome {
    pub fn skipped(entry: &FileEntry, reason: &SkipReason) -> Self {
        Self {
            relative_path: entry.relative_path.clone(),
            source_path: entry.source_path.clone(),
            status: OutcomeStatus::Skipped,
            asset_id: None,
            error: Some(reason.to_string()),
            companions: Vec::new(),
            attempts: 0,
        }
    }

    pub fn failed(relative_path: &str, source_path: PathBuf, error: String) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            source_path,
            status: OutcomeStatus::Failed,
            asset_id: None,
            error: Some(error),
            companions: Vec::new(),
            attempts: 0,
        }
    }
}

/// Outcome counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub created: usize,
    pub duplicate: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Created => self.created += 1,
            OutcomeStatus::Duplicate => self.duplicate += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.duplicate + self.skipped + self.failed
    }
}

/// Result of assigning assets to one album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumResult {
    pub album: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    /// True when the album did not exist and was created by this run.
    pub created: bool,
    /// Number of asset ids sent to the album.
    pub assets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AlbumResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Options for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub recursive: bool,
    /// Albums every uploaded asset is added to.
    pub albums: Vec<String>,
    /// Explicit sidecar, honored only when the root is a single file.
    pub sidecar_path: Option<PathBuf>,
    /// Maximum concurrent uploads. Clamped to at least 1.
    pub concurrency: usize,
    pub favorite: bool,
    pub archived: bool,
    pub device_id: String,
    pub retry: RetryPolicy,
}

pub const DEFAULT_CONCURRENCY: usize = 4;

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            albums: Vec::new(),
            sidecar_path: None,
            concurrency: DEFAULT_CONCURRENCY,
            favorite: false,
            archived: false,
            device_id: crate::default_device_id(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Progress event emitted during ingestion.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    /// A file was dispatched; `index` is its position in the report.
    Discovered { index: usize, relative_path: String },
    /// A file reached its final status.
    Outcome { index: usize, outcome: UploadOutcome },
    /// An album assignment finished.
    AlbumAssigned(AlbumResult),
    /// The run is over.
    Finished { counts: StatusCounts, cancelled: bool },
}

/// Summary of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub root: PathBuf,
    pub counts: StatusCounts,
    /// Outcomes in discovery order.
    pub outcomes: Vec<UploadOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub albums: Vec<AlbumResult>,
    pub cancelled: bool,
}

impl IngestionReport {
    /// True when at least one upload failed. Skips and duplicates never count.
    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
