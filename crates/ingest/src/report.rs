//! Thread-safe outcome accumulation.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::types::{AlbumResult, IngestionReport, StatusCounts, UploadOutcome};

/// Collects outcomes in discovery order while uploads finish out of order.
///
/// A slot is reserved when an item is dispatched and filled when it
/// completes. Slots that are never filled are dropped from the report.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    slots: Mutex<Vec<Option<UploadOutcome>>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<UploadOutcome>>> {
        // A panicked writer cannot leave a half-written slot behind.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reserves the next position and returns its index.
    pub fn reserve(&self) -> usize {
        let mut slots = self.lock();
        slots.push(None);
        slots.len() - 1
    }

    /// Fills a reserved slot.
    pub fn record(&self, index: usize, outcome: UploadOutcome) {
        if let Some(slot) = self.lock().get_mut(index) {
            *slot = Some(outcome);
        }
    }

    /// Reserves and fills in one step. Returns the index.
    pub fn push(&self, outcome: UploadOutcome) -> usize {
        let mut slots = self.lock();
        slots.push(Some(outcome));
        slots.len() - 1
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for outcome in self.lock().iter().flatten() {
            counts.add(outcome.status);
        }
        counts
    }

    /// Completed outcomes in discovery order.
    pub fn outcomes(&self) -> Vec<UploadOutcome> {
        self.lock().iter().flatten().cloned().collect()
    }

    pub fn report(
        &self,
        root: PathBuf,
        albums: Vec<AlbumResult>,
        cancelled: bool,
    ) -> IngestionReport {
        let outcomes = self.outcomes();
        let mut counts = StatusCounts::default();
        for outcome in &outcomes {
            counts.add(outcome.status);
        }
        IngestionReport {
            root,
            counts,
            outcomes,
            albums,
            cancelled,
        }
    }
}
