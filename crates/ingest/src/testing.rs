//! In-memory server for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use immich_protocol::AssetUploadStatus;
use tokio_util::sync::CancellationToken;

use crate::server::{
    AlbumDirectory, AlbumRef, AssetUploader, BoxFuture, RemoteError, ServerCapabilities,
    UploadError, UploadResponse,
};
use crate::types::{SupportedMedia, UploadRequest};

/// Deduplicates by fingerprint like the real server. Scripted failures are
/// consumed per file name before the default behaviour applies.
#[derive(Default)]
pub struct MockServer {
    pub media: SupportedMedia,
    pub albums: Vec<AlbumRef>,
    pub scripted: Mutex<HashMap<String, VecDeque<Result<UploadResponse, UploadError>>>>,
    /// Cancels the token once this many upload calls have been made.
    pub cancel_after: Option<(usize, CancellationToken)>,
    /// How long each upload call stays in flight.
    pub upload_delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub media_calls: Mutex<usize>,
    pub uploads: Mutex<Vec<UploadRequest>>,
    pub seen: Mutex<HashMap<String, String>>,
    pub created_albums: Mutex<Vec<String>>,
    pub added: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockServer {
    pub fn new() -> Self {
        let set = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            media: SupportedMedia {
                image: set(&["jpg", "jpeg", "heic", "png"]),
                video: set(&["mov", "mp4"]),
                sidecar: set(&["xmp"]),
            },
            ..Default::default()
        }
    }

    pub fn script(&self, file_name: &str, responses: Vec<Result<UploadResponse, UploadError>>) {
        self.scripted
            .lock()
            .unwrap()
            .insert(file_name.to_string(), responses.into());
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn uploads_of(&self, file_name: &str) -> usize {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.original_file_name == file_name)
            .count()
    }
}

impl ServerCapabilities for MockServer {
    fn supported_media(&self) -> BoxFuture<'_, Result<SupportedMedia, RemoteError>> {
        *self.media_calls.lock().unwrap() += 1;
        Box::pin(async move { Ok(self.media.clone()) })
    }
}

impl AlbumDirectory for MockServer {
    fn list_albums(&self) -> BoxFuture<'_, Result<Vec<AlbumRef>, RemoteError>> {
        Box::pin(async move { Ok(self.albums.clone()) })
    }

    fn create_album<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<String, RemoteError>> {
        Box::pin(async move {
            self.created_albums.lock().unwrap().push(name.to_string());
            Ok(format!("album-{name}"))
        })
    }

    fn add_assets<'a>(
        &'a self,
        album_id: &'a str,
        asset_ids: &'a [String],
    ) -> BoxFuture<'a, Result<usize, RemoteError>> {
        Box::pin(async move {
            self.added
                .lock()
                .unwrap()
                .push((album_id.to_string(), asset_ids.to_vec()));
            Ok(asset_ids.len())
        })
    }
}

impl AssetUploader for MockServer {
    fn upload<'a>(
        &'a self,
        request: &'a UploadRequest,
    ) -> BoxFuture<'a, Result<UploadResponse, UploadError>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            let _in_flight = InFlight(&self.in_flight);

            let calls = {
                let mut uploads = self.uploads.lock().unwrap();
                uploads.push(request.clone());
                uploads.len()
            };
            if let Some((n, token)) = &self.cancel_after
                && calls >= *n
            {
                token.cancel();
            }
            match self.upload_delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }

            let scripted = self
                .scripted
                .lock()
                .unwrap()
                .get_mut(&request.original_file_name)
                .and_then(|q| q.pop_front());
            if let Some(response) = scripted {
                return response;
            }

            let mut seen = self.seen.lock().unwrap();
            let key = request.fingerprint.hex();
            if let Some(id) = seen.get(&key) {
                return Ok(UploadResponse {
                    id: id.clone(),
                    status: AssetUploadStatus::Duplicate,
                });
            }
            let id = format!("asset-{}", request.original_file_name);
            seen.insert(key, id.clone());
            Ok(UploadResponse {
                id,
                status: AssetUploadStatus::Created,
            })
        })
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
