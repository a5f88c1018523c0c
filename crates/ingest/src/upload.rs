//! Per-asset upload with bounded retries.

use std::sync::{Arc, Mutex};

use immich_protocol::AssetUploadStatus;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::albums::AlbumAssignment;
use crate::error::IngestError;
use crate::fingerprint::{Fingerprint, fingerprint};
use crate::retry::RetryPolicy;
use crate::server::ImmichServer;
use crate::types::{AssetBundle, FileEntry, IngestOptions, OutcomeStatus, UploadOutcome, UploadRequest};

/// Stable id for a file: relative path, size and mtime, whitespace removed.
pub fn device_asset_id(entry: &FileEntry) -> String {
    format!(
        "{}-{}-{}",
        entry.relative_path,
        entry.size,
        entry.modified.timestamp()
    )
    .chars()
    .filter(|c| !c.is_whitespace())
    .collect()
}

/// Uploads bundles one at a time; clones share the album registry.
#[derive(Clone)]
pub struct UploadOrchestrator {
    server: Arc<dyn ImmichServer>,
    retry: RetryPolicy,
    device_id: Arc<str>,
    favorite: bool,
    archived: bool,
    albums: Arc<[String]>,
    assignment: Arc<Mutex<AlbumAssignment>>,
    cancel: CancellationToken,
}

impl UploadOrchestrator {
    pub fn new(
        server: Arc<dyn ImmichServer>,
        options: &IngestOptions,
        cancel: CancellationToken,
    ) -> Self {
        let mut albums: Vec<String> = Vec::new();
        for name in options.albums.iter().map(|a| a.trim()) {
            if !name.is_empty() && !albums.iter().any(|a| a == name) {
                albums.push(name.to_string());
            }
        }
        Self {
            server,
            retry: options.retry,
            device_id: options.device_id.as_str().into(),
            favorite: options.favorite,
            archived: options.archived,
            albums: albums.into(),
            assignment: Arc::new(Mutex::new(AlbumAssignment::new())),
            cancel,
        }
    }

    /// Takes the ids registered so far, leaving an empty registry.
    pub fn take_assignment(&self) -> AlbumAssignment {
        let mut guard = self.assignment.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    pub fn build_request(&self, bundle: AssetBundle, fingerprint: Fingerprint) -> UploadRequest {
        let AssetBundle {
            primary,
            sidecar,
            live_photo,
        } = bundle;
        UploadRequest {
            device_asset_id: device_asset_id(&primary),
            device_id: self.device_id.to_string(),
            original_file_name: primary.file_name().to_string(),
            file_created_at: primary.created.unwrap_or(primary.modified),
            file_modified_at: primary.modified,
            is_favorite: self.favorite,
            is_archived: self.archived,
            fingerprint,
            asset: primary,
            sidecar,
            live_photo,
        }
    }

    /// Fingerprints and uploads one bundle. Never fails: every error ends up
    /// in the returned outcome.
    pub async fn upload(&self, bundle: AssetBundle) -> UploadOutcome {
        let companions = bundle.companion_paths();
        let path = bundle.primary.source_path.clone();
        let relative_path = bundle.primary.relative_path.clone();

        let fingerprint = match fingerprint(path.clone()).await {
            Ok(fp) => fp,
            Err(e) => {
                let err = IngestError::from_io(path.clone(), e);
                warn!(file = %relative_path, error = %err, "cannot read file");
                let mut outcome = UploadOutcome::failed(&relative_path, path, err.to_string());
                outcome.companions = companions;
                return outcome;
            }
        };
        let request = self.build_request(bundle, fingerprint);

        let max_attempts = self.retry.attempts();
        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            match self.server.upload(&request).await {
                Ok(resp) => break Ok(resp),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        file = %relative_path,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "upload failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            break Err(format!("{e} (cancelled before retry)"));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => break Err(e.to_string()),
            }
        };

        let mut outcome = UploadOutcome {
            relative_path,
            source_path: path,
            status: OutcomeStatus::Failed,
            asset_id: None,
            error: None,
            companions,
            attempts: attempt,
        };

        match result {
            Ok(resp) => {
                outcome.status = match resp.status {
                    AssetUploadStatus::Created | AssetUploadStatus::Replaced => {
                        OutcomeStatus::Created
                    }
                    AssetUploadStatus::Duplicate => OutcomeStatus::Duplicate,
                };
                debug!(
                    file = %outcome.relative_path,
                    id = %resp.id,
                    status = %outcome.status,
                    attempts = attempt,
                    "upload finished"
                );
                if !self.albums.is_empty() {
                    self.assignment
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .register(&self.albums, &resp.id);
                }
                outcome.asset_id = Some(resp.id);
            }
            Err(message) => {
                warn!(file = %outcome.relative_path, attempts = attempt, error = %message, "upload failed");
                outcome.error = Some(message);
            }
        }

        outcome
    }
}
