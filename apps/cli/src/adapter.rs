//! Bridges `immich_client::Client` to the collaborator traits the ingestion
//! pipeline runs against.

use std::io::ErrorKind;
use std::sync::Arc;

use immich_client::{AssetUploadParams, Client, Error, UploadChecksum};
use immich_ingest::{
    AlbumDirectory, AlbumRef, AssetUploader, BoxFuture, RemoteError, ServerCapabilities,
    SupportedMedia, UploadError, UploadRequest, UploadResponse,
};
use tracing::warn;

/// Implements every ingest trait by delegating to a shared [`Client`].
pub struct ClientServer {
    client: Arc<Client>,
}

impl ClientServer {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

/// Sorts a client failure into the retry classes the pipeline understands.
pub fn remote_error(err: Error) -> RemoteError {
    match err {
        Error::Api {
            status, message, ..
        } => RemoteError::from_status(status, message),
        Error::Http(e) => match e.status() {
            Some(status) => RemoteError::from_status(status.as_u16(), e.to_string()),
            None => RemoteError::Network(e.to_string()),
        },
        // A file that cannot be opened will not open on a retry either.
        Error::Io(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            RemoteError::Invalid(e.to_string())
        }
        Error::Io(e) => RemoteError::Network(e.to_string()),
        other => RemoteError::Invalid(other.to_string()),
    }
}

/// Multipart parameters for one pipeline upload request.
pub fn upload_params(request: &UploadRequest) -> AssetUploadParams {
    AssetUploadParams {
        asset_path: request.asset.source_path.clone(),
        sidecar_path: request.sidecar.as_ref().map(|e| e.source_path.clone()),
        live_photo_path: request.live_photo.as_ref().map(|e| e.source_path.clone()),
        device_asset_id: request.device_asset_id.clone(),
        device_id: request.device_id.clone(),
        file_created_at: request.file_created_at,
        file_modified_at: request.file_modified_at,
        is_favorite: request.is_favorite,
        is_archived: request.is_archived,
        checksum: Some(UploadChecksum {
            algorithm: request.fingerprint.algorithm.as_str().to_string(),
            value: request.fingerprint.hex(),
        }),
    }
}

impl ServerCapabilities for ClientServer {
    fn supported_media(&self) -> BoxFuture<'_, Result<SupportedMedia, RemoteError>> {
        Box::pin(async move {
            let types = self.client.media_types().await.map_err(remote_error)?;
            Ok(SupportedMedia::from(&types))
        })
    }
}

impl AlbumDirectory for ClientServer {
    fn list_albums(&self) -> BoxFuture<'_, Result<Vec<AlbumRef>, RemoteError>> {
        Box::pin(async move {
            let albums = self.client.albums().await.map_err(remote_error)?;
            Ok(albums
                .into_iter()
                .map(|a| AlbumRef {
                    id: a.id,
                    name: a.album_name,
                })
                .collect())
        })
    }

    fn create_album<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<String, RemoteError>> {
        Box::pin(async move {
            let album = self
                .client
                .create_album(name, "", &[])
                .await
                .map_err(remote_error)?;
            Ok(album.id)
        })
    }

    fn add_assets<'a>(
        &'a self,
        album_id: &'a str,
        asset_ids: &'a [String],
    ) -> BoxFuture<'a, Result<usize, RemoteError>> {
        Box::pin(async move {
            let results = self
                .client
                .add_assets_to_album(album_id, asset_ids)
                .await
                .map_err(remote_error)?;
            let mut added = 0;
            for item in results {
                if item.success {
                    added += 1;
                } else {
                    // "duplicate" here means the asset was already in the album.
                    warn!(
                        album_id,
                        asset_id = %item.id,
                        error = item.error.as_deref().unwrap_or("unknown"),
                        "asset not added to album"
                    );
                }
            }
            Ok(added)
        })
    }
}

impl AssetUploader for ClientServer {
    fn upload<'a>(
        &'a self,
        request: &'a UploadRequest,
    ) -> BoxFuture<'a, Result<UploadResponse, UploadError>> {
        Box::pin(async move {
            let params = upload_params(request);
            self.client.upload_asset(&params).await.map_err(remote_error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use immich_ingest::{FileEntry, Fingerprint, HashAlgorithm};

    fn entry(rel: &str) -> FileEntry {
        FileEntry {
            source_path: format!("/photos/{rel}").into(),
            relative_path: rel.into(),
            size: 3,
            modified: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            created: None,
        }
    }

    #[test]
    fn api_errors_keep_their_status_class() {
        let err = Error::Api {
            status: 400,
            message: "bad file".into(),
            endpoint: "/assets".into(),
        };
        assert!(matches!(
            remote_error(err),
            RemoteError::Rejected { status: 400, .. }
        ));

        let err = Error::Api {
            status: 502,
            message: "bad gateway".into(),
            endpoint: "/assets".into(),
        };
        assert!(remote_error(err).is_transient());
    }

    #[test]
    fn local_failures_are_classified() {
        let io = Error::Io(std::io::Error::other("connection reset"));
        assert!(matches!(remote_error(io), RemoteError::Network(_)));

        let invalid = Error::InvalidArgument("nope".into());
        assert!(!remote_error(invalid).is_transient());
    }

    #[test]
    fn unreadable_local_file_is_not_retried() {
        for kind in [ErrorKind::NotFound, ErrorKind::PermissionDenied] {
            let err = Error::Io(std::io::Error::new(kind, "IMG_1.xmp"));
            let mapped = remote_error(err);
            assert!(matches!(mapped, RemoteError::Invalid(_)), "{kind:?}");
            assert!(!mapped.is_transient());
        }
    }

    #[tokio::test]
    async fn missing_sidecar_fails_upload_once() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("a.jpg");
        std::fs::write(&photo, b"abc").unwrap();

        let mut request_entry = entry("a.jpg");
        request_entry.source_path = photo;
        let mut sidecar = entry("a.xmp");
        sidecar.source_path = dir.path().join("a.xmp");

        let config = immich_client::ClientConfig::new("http://127.0.0.1:9", "key");
        let server = ClientServer::new(Arc::new(Client::new(&config).unwrap()));
        let request = UploadRequest {
            asset: request_entry,
            sidecar: Some(sidecar),
            live_photo: None,
            fingerprint: Fingerprint {
                algorithm: HashAlgorithm::Sha256,
                digest: vec![1],
            },
            device_asset_id: "a.jpg-3-0".into(),
            device_id: "laptop".into(),
            original_file_name: "a.jpg".into(),
            file_created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            file_modified_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            is_favorite: false,
            is_archived: false,
        };
        let err = server.upload(&request).await.unwrap_err();
        assert!(matches!(err, RemoteError::Invalid(_)));
    }

    #[test]
    fn params_carry_companions_and_checksum() {
        let request = UploadRequest {
            asset: entry("trip/a.jpg"),
            sidecar: Some(entry("trip/a.xmp")),
            live_photo: Some(entry("trip/a.mov")),
            fingerprint: Fingerprint {
                algorithm: HashAlgorithm::Sha256,
                digest: vec![0xab, 0xcd],
            },
            device_asset_id: "trip/a.jpg-3-1714564800".into(),
            device_id: "laptop".into(),
            original_file_name: "a.jpg".into(),
            file_created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            file_modified_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            is_favorite: true,
            is_archived: false,
        };

        let params = upload_params(&request);
        assert_eq!(params.asset_path, std::path::PathBuf::from("/photos/trip/a.jpg"));
        assert_eq!(
            params.sidecar_path.as_deref(),
            Some(std::path::Path::new("/photos/trip/a.xmp"))
        );
        assert_eq!(
            params.live_photo_path.as_deref(),
            Some(std::path::Path::new("/photos/trip/a.mov"))
        );
        assert!(params.is_favorite);
        let checksum = params.checksum.unwrap();
        assert_eq!(checksum.algorithm, "sha256");
        assert_eq!(checksum.value, "abcd");
    }
}
