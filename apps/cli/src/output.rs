//! Human-readable and JSON rendering.

use std::fmt::Write;

use immich_ingest::{IngestionReport, OutcomeStatus};
use serde::Serialize;

/// Prints `value` as pretty JSON, or the human rendering otherwise.
pub fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        let text = human(value);
        if !text.is_empty() {
            println!("{}", text.trim_end());
        }
    }
    Ok(())
}

/// Summary table of an ingestion run: failures first, then the totals.
pub fn render_report(report: &IngestionReport, verbose: bool) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let show = verbose || outcome.status == OutcomeStatus::Failed;
        if !show {
            continue;
        }
        let status = outcome.status.to_string();
        let _ = write!(out, "{status:<9} {}", outcome.relative_path);
        if let Some(id) = &outcome.asset_id {
            let _ = write!(out, " -> {id}");
        }
        if !outcome.companions.is_empty() {
            let _ = write!(out, " (+{})", outcome.companions.join(", "));
        }
        if let Some(error) = &outcome.error {
            let _ = write!(out, ": {error}");
        }
        out.push('\n');
    }

    for album in &report.albums {
        match &album.error {
            None => {
                let verb = if album.created { "created" } else { "updated" };
                let _ = writeln!(out, "album {:?} {verb}: {} assets", album.album, album.assets);
            }
            Some(error) => {
                let _ = writeln!(out, "album {:?} failed: {error}", album.album);
            }
        }
    }

    let c = report.counts;
    let _ = writeln!(
        out,
        "{} created, {} duplicate, {} skipped, {} failed",
        c.created, c.duplicate, c.skipped, c.failed
    );
    if report.cancelled {
        out.push_str("cancelled before all files were processed\n");
    }
    out
}
