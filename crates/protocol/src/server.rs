use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response of `GET /server/ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub res: String,
}

impl PingResponse {
    pub fn is_pong(&self) -> bool {
        self.res == "pong"
    }
}

/// Per-user storage usage reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageByUser {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub photos: u64,
    #[serde(default)]
    pub videos: u64,
    #[serde(default)]
    pub usage: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_size_in_bytes: Option<u64>,
}

/// Response of `GET /server/statistics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatistics {
    pub photos: u64,
    pub videos: u64,
    pub usage: u64,
    #[serde(default)]
    pub usage_by_user: Vec<UsageByUser>,
}

/// Response of `GET /assets/statistics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStatistics {
    pub images: u64,
    pub videos: u64,
    pub total: u64,
}

/// Broad category of a file extension as understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Sidecar,
}

/// Response of `GET /server/media-types`.
///
/// Extensions are reported with a leading dot (`.jpg`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTypes {
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(default)]
    pub video: Vec<String>,
    #[serde(default)]
    pub sidecar: Vec<String>,
}

impl MediaTypes {
    /// Look up the category of an extension. Accepts `jpg`, `.jpg` or `.JPG`.
    pub fn kind_of(&self, extension: &str) -> Option<MediaKind> {
        let wanted = normalize_extension(extension);
        let has = |list: &[String]| list.iter().any(|e| normalize_extension(e) == wanted);
        if has(&self.image) {
            Some(MediaKind::Image)
        } else if has(&self.video) {
            Some(MediaKind::Video)
        } else if has(&self.sidecar) {
            Some(MediaKind::Sidecar)
        } else {
            None
        }
    }
}

/// Lowercase an extension and strip any leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

/// Response of `GET /server/about`.
///
/// Only the fields the CLI renders are typed; the rest are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAbout {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_url: Option<String>,
    #[serde(default)]
    pub licensed: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
