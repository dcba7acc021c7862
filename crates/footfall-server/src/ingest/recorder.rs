use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use footfall_core::store::VisitStore;
use footfall_core::visit::NewVisit;

/// Outcome of [`VisitRecorder::submit`]. Callers are free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Queued,
    /// The pending buffer was full; the visit was discarded.
    Dropped,
}

/// Best-effort background writer for visits.
///
/// `submit` only pushes onto an in-memory buffer, so request handlers never
/// wait on the store. `flush` drains the buffer and writes each visit with a
/// single-row insert. Failed writes are logged and dropped: nothing is
/// retried and nothing is reported back to the request that produced the
/// visit.
pub struct VisitRecorder {
    store: Arc<dyn VisitStore>,
    max_pending: usize,
    pending: Mutex<Vec<NewVisit>>,
}

impl VisitRecorder {
    pub fn new(store: Arc<dyn VisitStore>, max_pending: usize) -> Self {
        Self {
            store,
            max_pending: max_pending.max(1),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub async fn submit(&self, visit: NewVisit) -> Submission {
        let mut pending = self.pending.lock().await;
        if pending.len() >= self.max_pending {
            debug!(max_pending = self.max_pending, "Visit buffer full, dropping visit");
            return Submission::Dropped;
        }
        pending.push(visit);
        Submission::Queued
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Write every pending visit. Returns how many were stored.
    ///
    /// The lock is held only for the `std::mem::take`, so submissions keep
    /// flowing while the inserts run.
    pub async fn flush(&self) -> usize {
        let batch: Vec<NewVisit> = {
            let mut pending = self.pending.lock().await;
            std::mem::take(&mut *pending)
        };
        if batch.is_empty() {
            return 0;
        }

        let total = batch.len();
        let mut written = 0;
        for visit in &batch {
            match self.store.insert_visit(visit).await {
                Ok(()) => written += 1,
                Err(e) => warn!(page = %visit.page, error = %e, "Visit write failed, dropped"),
            }
        }
        debug!(written, dropped = total - written, "Visit buffer flushed");
        written
    }
}
