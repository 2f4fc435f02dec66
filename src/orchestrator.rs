// ABOUTME: Drives one sync cycle - upload, fetch the remote export, reconcile, delete
// ABOUTME: Exposes polling predicates and a wait_while adapter for batch callers

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::delete::{BatchDeleteCoordinator, DeleteSummary};
use crate::error::SyncResult;
use crate::model::SourceEntry;
use crate::reconcile::RecordReconciler;
use crate::remote::{RemoteApi, Transport};
use crate::session::{SyncEvent, SyncPhase, SyncSession};
use crate::tabular::parse_records;
use crate::upload::{BatchUploadCoordinator, UploadSettings, UploadSummary};

/// Shortest sleep between two polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Behaviour switches for a sync cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    /// Delete remote records that no longer exist locally after uploading.
    pub record_sync: bool,
    pub upload: UploadSettings,
}

/// What a finished cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub session_id: Uuid,
    pub upload: UploadSummary,
    pub deletion_candidates: usize,
    pub delete: DeleteSummary,
}

impl SyncReport {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            upload: UploadSummary::default(),
            deletion_candidates: 0,
            delete: DeleteSummary::default(),
        }
    }

    pub fn entries_updated(&self) -> u64 {
        self.upload.entries_updated
    }

    pub fn entries_deleted(&self) -> u64 {
        self.delete.entries_deleted
    }
}

/// Runs sync cycles against one remote view with one session.
pub struct SyncOrchestrator<T: Transport + ?Sized> {
    transport: Arc<T>,
    api: RemoteApi,
    settings: SyncSettings,
    session: Arc<SyncSession>,
}

impl<T: Transport + ?Sized> SyncOrchestrator<T> {
    pub fn new(transport: Arc<T>, api: RemoteApi, settings: SyncSettings) -> Self {
        Self {
            transport,
            api,
            settings,
            session: Arc::new(SyncSession::new()),
        }
    }

    pub fn session(&self) -> &Arc<SyncSession> {
        &self.session
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Upload requests are queued or in flight.
    pub fn has_requests_pending(&self) -> bool {
        self.session.has_requests_pending()
    }

    /// The fetch, reconcile or delete part of the cycle is still running.
    pub fn has_delete_requests_pending(&self) -> bool {
        self.session.has_delete_requests_pending()
    }

    /// Run a full cycle and wait for it.
    pub async fn export(&self, entries: &[SourceEntry]) -> SyncResult<SyncReport> {
        self.session.begin_export()?;
        self.run_cycle(entries).await
    }

    async fn run_cycle(&self, entries: &[SourceEntry]) -> SyncResult<SyncReport> {
        let mut report = SyncReport::new(self.session.id());
        let record_sync = self.settings.record_sync;

        let uploader = BatchUploadCoordinator::new(
            self.transport.as_ref(),
            &self.api,
            &self.session,
            &self.settings.upload,
        );
        match uploader.run(entries).await {
            Ok(summary) => {
                report.upload = summary;
                self.session
                    .transition(SyncEvent::UploadsFinished { record_sync })?;
            }
            Err(e) => {
                self.session.transition(SyncEvent::UploadFailed)?;
                return Err(e);
            }
        }

        if !record_sync {
            return Ok(report);
        }

        let csv = match self.fetch_remote_export().await {
            Ok(csv) => {
                self.session.transition(SyncEvent::RemoteFetched)?;
                csv
            }
            Err(e) => {
                tracing::error!("Failed to fetch remote export: {}", e);
                self.session.transition(SyncEvent::FetchFailed)?;
                return Err(e);
            }
        };

        let remote = match parse_records(&csv) {
            Ok(remote) => remote,
            Err(e) => {
                tracing::error!("Failed to read remote export: {}", e);
                self.session.transition(SyncEvent::ReconcileFailed)?;
                return Err(e);
            }
        };

        let candidates = RecordReconciler::new(self.settings.upload.combined_namespace_ids)
            .deletion_candidates(entries, &remote);
        report.deletion_candidates = candidates.len();
        tracing::info!(
            "{} of {} remote records have no local entry",
            candidates.len(),
            remote.len()
        );

        let phase = self.session.transition(SyncEvent::Reconciled {
            candidates: candidates.len(),
        })?;
        if phase == SyncPhase::Deleting {
            report.delete = BatchDeleteCoordinator::new(
                self.transport.as_ref(),
                &self.api,
                &self.session,
            )
            .run(&candidates)
            .await;
            self.session.transition(SyncEvent::DeletesFinished)?;
        }

        Ok(report)
    }

    async fn fetch_remote_export(&self) -> SyncResult<String> {
        let response = self
            .transport
            .send(self.api.export_csv_request())
            .await?
            .into_success()?;
        tracing::debug!("Fetched remote export ({} bytes)", response.body.len());
        Ok(response.body)
    }
}

impl<T: Transport + ?Sized + 'static> SyncOrchestrator<T> {
    /// Claim the session now and run the cycle on a spawned task.
    ///
    /// The phase is already `Exporting` when this returns, so a caller polling
    /// `has_requests_pending` right away sees the cycle.
    pub fn start_export(
        self: &Arc<Self>,
        entries: Vec<SourceEntry>,
    ) -> SyncResult<JoinHandle<SyncResult<SyncReport>>> {
        self.session.begin_export()?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.run_cycle(&entries).await }))
    }
}

/// Sleep in `interval` steps (at least [`MIN_POLL_INTERVAL`]) while `predicate` holds.
pub async fn wait_while<F>(mut predicate: F, interval: Duration)
where
    F: FnMut() -> bool,
{
    let interval = interval.max(MIN_POLL_INTERVAL);
    while predicate() {
        tokio::time::sleep(interval).await;
    }
}
