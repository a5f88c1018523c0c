//! Progress bar fed by ingestion events.

use std::time::Duration;

use immich_ingest::{IngestEvent, OutcomeStatus};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

const BAR_TEMPLATE: &str =
    "[{elapsed_precise}] {prefix:.bold}▕{bar:30.blue}▏{pos}/{len} {wide_msg}";
const STEADY_TICK_MS: u64 = 100;

fn new_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    pb.set_prefix("Uploading");
    pb.enable_steady_tick(Duration::from_millis(STEADY_TICK_MS));
    pb
}

/// Drains `events` into a progress bar until the run finishes.
pub fn spawn(mut events: UnboundedReceiver<IngestEvent>, visible: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let pb = new_bar(visible);
        while let Some(event) = events.recv().await {
            match event {
                IngestEvent::Discovered { relative_path, .. } => {
                    pb.inc_length(1);
                    pb.set_message(relative_path);
                }
                IngestEvent::Outcome { outcome, .. } => {
                    pb.inc(1);
                    if outcome.status == OutcomeStatus::Failed {
                        pb.println(format!(
                            "failed: {} ({})",
                            outcome.relative_path,
                            outcome.error.as_deref().unwrap_or("unknown error")
                        ));
                    }
                }
                IngestEvent::AlbumAssigned(album) => {
                    pb.set_message(format!("album {}", album.album));
                }
                IngestEvent::Finished { .. } => {
                    pb.finish_and_clear();
                }
            }
        }
        pb.finish_and_clear();
    })
}
