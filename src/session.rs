// ABOUTME: Sync session state - phase machine plus counters shared with coordinators
// ABOUTME: Polling predicates read from here; only the running cycle mutates it

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

/// Where a sync cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    /// Upload batches are being sent.
    Exporting,
    /// The remote export is being downloaded for the delete check.
    FetchingRemote,
    /// Remote records are being compared with local entries.
    Reconciling,
    /// Delete batches are in flight.
    Deleting,
}

/// Inputs that move a session between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    ExportRequested,
    UploadsFinished { record_sync: bool },
    UploadFailed,
    RemoteFetched,
    FetchFailed,
    Reconciled { candidates: usize },
    ReconcileFailed,
    DeletesFinished,
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl SyncPhase {
    /// Pure transition function for the sync state machine.
    pub fn on(self, event: SyncEvent) -> SyncResult<SyncPhase> {
        use SyncEvent::*;
        use SyncPhase::*;

        let next = match (self, event) {
            (Idle, ExportRequested) => Exporting,
            (Exporting, UploadsFinished { record_sync: true }) => FetchingRemote,
            (Exporting, UploadsFinished { record_sync: false }) => Idle,
            (Exporting, UploadFailed) => Idle,
            (FetchingRemote, RemoteFetched) => Reconciling,
            (FetchingRemote, FetchFailed) => Idle,
            (Reconciling, Reconciled { candidates }) if candidates > 0 => Deleting,
            (Reconciling, Reconciled { .. }) => Idle,
            (Reconciling, ReconcileFailed) => Idle,
            (Deleting, DeletesFinished) => Idle,
            (from, event) => {
                return Err(SyncError::InvalidTransition {
                    from,
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }

    /// Upload requests are queued or in flight.
    pub fn is_exporting(&self) -> bool {
        matches!(self, SyncPhase::Exporting)
    }

    /// The fetch/reconcile/delete tail of the cycle is running.
    pub fn has_deletes_pending(&self) -> bool {
        matches!(
            self,
            SyncPhase::FetchingRemote | SyncPhase::Reconciling | SyncPhase::Deleting
        )
    }
}

/// Snapshot of the session counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionCounters {
    pub entries_updated: u64,
    pub entries_deleted: u64,
    pub upload_batches_sent: usize,
    pub upload_batches_total: usize,
    pub completed_batches: usize,
    pub total_batches: usize,
}

/// State for one sync target.
///
/// Counters are atomics so delete batches can complete in any order; the phase
/// sits behind a mutex so a transition is observed all at once.
#[derive(Debug)]
pub struct SyncSession {
    id: Uuid,
    phase: Mutex<SyncPhase>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    entries_updated: AtomicU64,
    entries_deleted: AtomicU64,
    upload_batches_sent: AtomicUsize,
    upload_batches_total: AtomicUsize,
    completed_batches: AtomicUsize,
    total_batches: AtomicUsize,
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: Mutex::new(SyncPhase::Idle),
            started_at: Mutex::new(None),
            entries_updated: AtomicU64::new(0),
            entries_deleted: AtomicU64::new(0),
            upload_batches_sent: AtomicUsize::new(0),
            upload_batches_total: AtomicUsize::new(0),
            completed_batches: AtomicUsize::new(0),
            total_batches: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock_phase(&self) -> MutexGuard<'_, SyncPhase> {
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> SyncPhase {
        *self.lock_phase()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `event` to the current phase and return the new phase.
    pub fn transition(&self, event: SyncEvent) -> SyncResult<SyncPhase> {
        let mut phase = self.lock_phase();
        let next = phase.on(event)?;
        tracing::debug!(session = %self.id, "Sync phase {:?} -> {:?} on {}", *phase, next, event);
        *phase = next;
        Ok(next)
    }

    /// Claim the session for a new cycle and reset every counter.
    ///
    /// Fails with `SessionBusy` when a cycle is already running.
    pub fn begin_export(&self) -> SyncResult<()> {
        let mut phase = self.lock_phase();
        if *phase != SyncPhase::Idle {
            return Err(SyncError::SessionBusy(*phase));
        }
        *phase = phase.on(SyncEvent::ExportRequested)?;
        drop(phase);

        self.entries_updated.store(0, Ordering::SeqCst);
        self.entries_deleted.store(0, Ordering::SeqCst);
        self.upload_batches_sent.store(0, Ordering::SeqCst);
        self.upload_batches_total.store(0, Ordering::SeqCst);
        self.completed_batches.store(0, Ordering::SeqCst);
        self.total_batches.store(0, Ordering::SeqCst);
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
        Ok(())
    }

    pub fn has_requests_pending(&self) -> bool {
        self.phase().is_exporting()
    }

    pub fn has_delete_requests_pending(&self) -> bool {
        self.phase().has_deletes_pending()
    }

    pub fn set_upload_batches_total(&self, total: usize) {
        self.upload_batches_total.store(total, Ordering::SeqCst);
    }

    /// Record one acknowledged upload batch.
    pub fn record_upload_batch(&self, acknowledged: u64) {
        self.entries_updated.fetch_add(acknowledged, Ordering::SeqCst);
        self.upload_batches_sent.fetch_add(1, Ordering::SeqCst);
    }

    /// Publish the delete batch total before any batch is sent.
    pub fn start_delete_batches(&self, total: usize) {
        self.completed_batches.store(0, Ordering::SeqCst);
        self.total_batches.store(total, Ordering::SeqCst);
    }

    /// Count one finished delete batch and return the completed count so far.
    pub fn complete_delete_batch(&self, deleted: u64) -> usize {
        self.entries_deleted.fetch_add(deleted, Ordering::SeqCst);
        self.completed_batches.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True while fewer delete batches have completed than were started.
    pub fn delete_batches_outstanding(&self) -> bool {
        self.completed_batches.load(Ordering::SeqCst) < self.total_batches.load(Ordering::SeqCst)
    }

    pub fn counters(&self) -> SessionCounters {
        SessionCounters {
            entries_updated: self.entries_updated.load(Ordering::SeqCst),
            entries_deleted: self.entries_deleted.load(Ordering::SeqCst),
            upload_batches_sent: self.upload_batches_sent.load(Ordering::SeqCst),
            upload_batches_total: self.upload_batches_total.load(Ordering::SeqCst),
            completed_batches: self.completed_batches.load(Ordering::SeqCst),
            total_batches: self.total_batches.load(Ordering::SeqCst),
        }
    }
}
