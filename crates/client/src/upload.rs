//! Multipart encoding for `POST /assets` and `PUT /assets/{id}/original`.
//!
//! File parts are streamed from disk with a known length so large videos
//! are never buffered in memory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;

use crate::Error;
use crate::media::content_type_for;

/// Duration sent for every upload; the server derives the real value.
pub const DEFAULT_DURATION: &str = "00:00:00.000000";

/// Content hash declared alongside an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadChecksum {
    pub algorithm: String,
    pub value: String,
}

/// Everything needed to build one upload request.
#[derive(Debug, Clone)]
pub struct AssetUploadParams {
    pub asset_path: PathBuf,
    pub sidecar_path: Option<PathBuf>,
    pub live_photo_path: Option<PathBuf>,
    pub device_asset_id: String,
    pub device_id: String,
    pub file_created_at: DateTime<Utc>,
    pub file_modified_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub checksum: Option<UploadChecksum>,
}

impl AssetUploadParams {
    /// Fills identity fields from the file's metadata.
    ///
    /// The device asset id is `<file name>-<size>-<mtime seconds>` with
    /// whitespace removed, the same shape the ingestion pipeline uses for a
    /// single-file root.
    pub async fn from_path(path: &Path, device_id: &str) -> Result<Self, Error> {
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified: DateTime<Utc> = meta.modified().map(Into::into).unwrap_or_else(|_| Utc::now());
        let created: DateTime<Utc> = meta.created().map(Into::into).unwrap_or(modified);

        Ok(Self {
            asset_path: path.to_path_buf(),
            sidecar_path: None,
            live_photo_path: None,
            device_asset_id: strip_whitespace(&format!(
                "{name}-{}-{}",
                meta.len(),
                modified.timestamp()
            )),
            device_id: device_id.to_string(),
            file_created_at: created,
            file_modified_at: modified,
            is_favorite: false,
            is_archived: false,
            checksum: None,
        })
    }

    /// Text fields in the order they are written to the form.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("deviceAssetId", self.device_asset_id.clone()),
            ("deviceId", self.device_id.clone()),
            ("fileCreatedAt", format_timestamp(&self.file_created_at)),
            ("fileModifiedAt", format_timestamp(&self.file_modified_at)),
            ("isFavorite", self.is_favorite.to_string()),
            ("isArchived", self.is_archived.to_string()),
            ("duration", DEFAULT_DURATION.to_string()),
        ];
        if let Some(checksum) = &self.checksum {
            fields.push(("checksum", checksum.value.clone()));
            fields.push(("checksumAlgorithm", checksum.algorithm.clone()));
        }
        fields
    }

    /// Builds the multipart body, opening every file part.
    pub(crate) async fn into_form(&self) -> Result<Form, Error> {
        let mut form = Form::new();
        for (name, value) in self.text_fields() {
            form = form.text(name, value);
        }
        form = form.part("assetData", file_part(&self.asset_path).await?);
        if let Some(sidecar) = &self.sidecar_path {
            form = form.part("sidecarData", file_part(sidecar).await?);
        }
        if let Some(motion) = &self.live_photo_path {
            form = form.part("livePhotoData", file_part(motion).await?);
        }
        Ok(form)
    }
}

/// RFC 3339 in UTC with millisecond precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

async fn file_part(path: &Path) -> Result<Part, Error> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let body = Body::wrap_stream(ReaderStream::new(file));
    Ok(Part::stream_with_length(body, len)
        .file_name(name)
        .mime_str(content_type_for(path))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params() -> AssetUploadParams {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        AssetUploadParams {
            asset_path: PathBuf::from("IMG_1.jpg"),
            sidecar_path: None,
            live_photo_path: None,
            device_asset_id: "IMG_1.jpg-10".into(),
            device_id: "laptop".into(),
            file_created_at: ts,
            file_modified_at: ts,
            is_favorite: true,
            is_archived: false,
            checksum: None,
        }
    }

    #[test]
    fn text_fields_without_checksum() {
        let fields = params().text_fields();
        let names: Vec<_> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            vec![
                "deviceAssetId",
                "deviceId",
                "fileCreatedAt",
                "fileModifiedAt",
                "isFavorite",
                "isArchived",
                "duration"
            ]
        );
        assert_eq!(fields[2].1, "2024-05-01T12:30:00.000Z");
        assert_eq!(fields[4].1, "true");
        assert_eq!(fields[6].1, DEFAULT_DURATION);
    }

    #[test]
    fn text_fields_with_checksum() {
        let mut p = params();
        p.checksum = Some(UploadChecksum {
            algorithm: "sha256".into(),
            value: "ab12".into(),
        });
        let fields = p.text_fields();
        assert!(fields.contains(&("checksum", "ab12".to_string())));
        assert!(fields.contains(&("checksumAlgorithm", "sha256".to_string())));
    }

    #[tokio::test]
    async fn from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("My Photo.jpg");
        std::fs::write(&path, b"0123456789").unwrap();

        let p = AssetUploadParams::from_path(&path, "host").await.unwrap();
        assert_eq!(
            p.device_asset_id,
            format!("MyPhoto.jpg-10-{}", p.file_modified_at.timestamp())
        );
        assert_eq!(p.device_id, "host");
        assert!(p.sidecar_path.is_none());
    }

    #[tokio::test]
    async fn from_path_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = AssetUploadParams::from_path(dir.path(), "host").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = AssetUploadParams::from_path(Path::new("/nonexistent/x.jpg"), "host")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
