//! The ingestion run: expand, classify, upload with bounded concurrency,
//! then assign albums.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::albums::AlbumAssigner;
use crate::classify::{Dispatch, MediaClassifier};
use crate::error::IngestError;
use crate::expand::{PathExpander, file_entry};
use crate::report::ResultAggregator;
use crate::server::ImmichServer;
use crate::types::{FileEntry, IngestEvent, IngestOptions, IngestionReport, UploadOutcome};
use crate::upload::UploadOrchestrator;

/// Discovered entries buffered between the walker thread and the dispatcher.
const DISCOVERY_BUFFER: usize = 256;

/// One configured run. Take the event receiver and the cancellation token
/// before calling [`Ingestion::run`].
pub struct Ingestion {
    server: Arc<dyn ImmichServer>,
    options: IngestOptions,
    events_tx: mpsc::UnboundedSender<IngestEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<IngestEvent>>,
    cancel: CancellationToken,
}

impl Ingestion {
    pub fn new(server: Arc<dyn ImmichServer>, options: IngestOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            server,
            options,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Progress events. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<IngestEvent>> {
        self.events_rx.take()
    }

    /// Cancelling stops new dispatches. In-flight uploads finish and are
    /// reported.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the whole batch.
    ///
    /// Only setup failures are returned as errors: a missing root, an
    /// unsupported archive, or a server that cannot list its media types.
    /// Everything per-file or per-album ends up in the report.
    pub async fn run(mut self, root: &Path) -> Result<IngestionReport, IngestError> {
        // Nobody listens when the receiver was never taken.
        drop(self.events_rx.take());

        let concurrency = self.options.concurrency.max(1);
        let recursive = self.options.recursive;
        let open_root = root.to_path_buf();
        let expander =
            tokio::task::spawn_blocking(move || PathExpander::open(&open_root, recursive))
                .await
                .map_err(|e| IngestError::Io(std::io::Error::other(e)))??;

        let media = self
            .server
            .supported_media()
            .await
            .map_err(IngestError::Capabilities)?;
        debug!(
            images = media.image.len(),
            videos = media.video.len(),
            sidecars = media.sidecar.len(),
            "supported media loaded"
        );

        let explicit_sidecar = match &self.options.sidecar_path {
            Some(path) if expander.is_single_file() => Some(sidecar_entry(path)?),
            Some(path) => {
                warn!(sidecar = %path.display(), "explicit sidecar ignored for directory input");
                None
            }
            None => None,
        };

        info!(root = %root.display(), concurrency, "ingestion started");

        // The walker hands the expander back when done so the archive
        // scratch directory outlives every upload reading from it.
        let (entries_tx, mut entries_rx) = mpsc::channel(DISCOVERY_BUFFER);
        let walker = tokio::task::spawn_blocking(move || {
            let mut expander = expander;
            for item in expander.by_ref() {
                if entries_tx.blocking_send(item).is_err() {
                    break;
                }
            }
            expander
        });

        let mut dispatcher = Dispatcher::new(
            UploadOrchestrator::new(self.server.clone(), &self.options, self.cancel.clone()),
            concurrency,
            self.events_tx.clone(),
            self.cancel.clone(),
        );
        dispatcher.explicit_sidecar = explicit_sidecar;
        let mut classifier = MediaClassifier::new(media);

        'discover: loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                item = entries_rx.recv() => item,
            };
            let finished = item.is_none();
            let work = match item {
                Some(Ok(entry)) => classifier.push(entry),
                Some(Err(err)) => classifier.push_unreadable(err),
                None => classifier.finish(),
            };
            for unit in work {
                if !dispatcher.dispatch(unit).await {
                    break 'discover;
                }
            }
            if finished {
                break;
            }
        }
        drop(entries_rx);

        dispatcher.drain().await;
        let scratch = walker.await;
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            info!("ingestion cancelled, no further uploads dispatched");
        }

        let assignment = dispatcher.orchestrator.take_assignment();
        let albums = AlbumAssigner::new(&*self.server).assign(assignment).await;
        for album in &albums {
            let _ = self.events_tx.send(IngestEvent::AlbumAssigned(album.clone()));
        }
        drop(scratch);

        let report = dispatcher
            .aggregator
            .report(root.to_path_buf(), albums, cancelled);
        info!(
            created = report.counts.created,
            duplicate = report.counts.duplicate,
            skipped = report.counts.skipped,
            failed = report.counts.failed,
            cancelled,
            "ingestion finished"
        );
        let _ = self.events_tx.send(IngestEvent::Finished {
            counts: report.counts,
            cancelled,
        });
        Ok(report)
    }
}

/// Runs one ingestion with a private cancellation token and no events.
pub async fn run_ingestion(
    server: Arc<dyn ImmichServer>,
    root: &Path,
    options: IngestOptions,
) -> Result<IngestionReport, IngestError> {
    Ingestion::new(server, options).run(root).await
}

fn sidecar_entry(path: &Path) -> Result<FileEntry, IngestError> {
    let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IngestError::PathNotFound(path.to_path_buf()),
        _ => IngestError::from_io(path.to_path_buf(), e),
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(file_entry(path.to_path_buf(), name, &meta))
}

struct Dispatcher {
    aggregator: Arc<ResultAggregator>,
    orchestrator: UploadOrchestrator,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
    events: mpsc::UnboundedSender<IngestEvent>,
    cancel: CancellationToken,
    explicit_sidecar: Option<FileEntry>,
}

impl Dispatcher {
    fn new(
        orchestrator: UploadOrchestrator,
        concurrency: usize,
        events: mpsc::UnboundedSender<IngestEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            aggregator: Arc::new(ResultAggregator::new()),
            orchestrator,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            tasks: JoinSet::new(),
            events,
            cancel,
            explicit_sidecar: None,
        }
    }

    /// Hands one unit of work to the pool. Returns false once cancelled.
    async fn dispatch(&mut self, unit: Dispatch) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match unit {
            Dispatch::Skip { entry, reason } => {
                debug!(file = %entry.relative_path, %reason, "skipped");
                self.complete(UploadOutcome::skipped(&entry, &reason));
            }
            Dispatch::Unreadable {
                source_path,
                relative_path,
                error,
            } => {
                warn!(file = %relative_path, %error, "cannot inspect file");
                self.complete(UploadOutcome::failed(&relative_path, source_path, error));
            }
            Dispatch::Upload(mut bundle) => {
                let permit = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return false,
                    permit = self.semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return false,
                    },
                };
                if let Some(sidecar) = self.explicit_sidecar.take() {
                    bundle.sidecar = Some(sidecar);
                }

                let index = self.aggregator.reserve();
                let _ = self.events.send(IngestEvent::Discovered {
                    index,
                    relative_path: bundle.primary.relative_path.clone(),
                });

                let orchestrator = self.orchestrator.clone();
                let aggregator = self.aggregator.clone();
                let events = self.events.clone();
                self.tasks.spawn(async move {
                    let _permit = permit;
                    let outcome = orchestrator.upload(bundle).await;
                    aggregator.record(index, outcome.clone());
                    let _ = events.send(IngestEvent::Outcome { index, outcome });
                });
            }
        }
        self.reap();
        true
    }

    fn complete(&mut self, outcome: UploadOutcome) {
        let relative_path = outcome.relative_path.clone();
        let index = self.aggregator.push(outcome.clone());
        let _ = self.events.send(IngestEvent::Discovered {
            index,
            relative_path,
        });
        let _ = self.events.send(IngestEvent::Outcome { index, outcome });
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            log_join(result);
        }
    }

    async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            log_join(result);
        }
    }
}

// A panicked upload leaves its slot empty; the report simply omits it.
fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        warn!(error = %e, "upload task ended abnormally");
    }
}
