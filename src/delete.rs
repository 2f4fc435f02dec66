// ABOUTME: Concurrent batch deletion of orphaned remote records
// ABOUTME: Publishes the batch total up front and counts every completion, success or not

use futures::stream::{FuturesUnordered, StreamExt};

use crate::keys::sanitize_deletion_id;
use crate::model::DeletionCandidate;
use crate::remote::{RemoteApi, Transport};
use crate::session::SyncSession;
use crate::upload::partition;

/// Ids per delete request. Fixed by the remote API.
pub const DELETE_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteSummary {
    pub batches: usize,
    pub failed_batches: usize,
    pub entries_deleted: u64,
}

/// Issues every delete batch at once and tallies completions as they arrive.
pub struct BatchDeleteCoordinator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    api: &'a RemoteApi,
    session: &'a SyncSession,
}

impl<'a, T: Transport + ?Sized> BatchDeleteCoordinator<'a, T> {
    pub fn new(transport: &'a T, api: &'a RemoteApi, session: &'a SyncSession) -> Self {
        Self {
            transport,
            api,
            session,
        }
    }

    /// Delete `candidates` remotely. Failed batches are logged and left alone.
    pub async fn run(&self, candidates: &[DeletionCandidate]) -> DeleteSummary {
        let ids: Vec<String> = candidates
            .iter()
            .map(|candidate| sanitize_deletion_id(candidate.as_str()))
            .collect();
        let batches = partition(&ids, DELETE_BATCH_SIZE);
        let total = batches.len();
        self.session.start_delete_batches(total);

        tracing::info!("Deleting {} remote records in {} batches", ids.len(), total);

        let mut in_flight: FuturesUnordered<_> = batches
            .into_iter()
            .enumerate()
            .map(|(index, batch)| async move {
                let result = match self.api.delete_request(batch) {
                    Ok(request) => self
                        .transport
                        .send(request)
                        .await
                        .and_then(|response| response.into_success()),
                    Err(e) => Err(e),
                };
                (index, batch.len(), result)
            })
            .collect();

        let mut summary = DeleteSummary {
            batches: total,
            ..DeleteSummary::default()
        };
        while let Some((index, size, result)) = in_flight.next().await {
            let deleted = match result {
                Ok(_) => size as u64,
                Err(e) => {
                    summary.failed_batches += 1;
                    tracing::error!("Delete batch {} ({} ids) failed: {}", index + 1, size, e);
                    0
                }
            };
            summary.entries_deleted += deleted;
            let completed = self.session.complete_delete_batch(deleted);
            tracing::debug!("Delete batches completed: {}/{}", completed, total);
        }

        tracing::info!("Number of entries deleted: {}", summary.entries_deleted);
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{SyncError, SyncResult};
    use crate::remote::{BatchRequest, TransportResponse};

    #[derive(Default)]
    struct RecordingTransport {
        bodies: Mutex<Vec<String>>,
        fail_containing: Option<&'static str>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: BatchRequest) -> SyncResult<TransportResponse> {
            let body = request.body.unwrap_or_default();
            self.bodies.lock().unwrap().push(body.clone());
            match self.fail_containing {
                Some(marker) if body.contains(marker) => Err(SyncError::TransportFailure(
                    "connection reset".to_string(),
                )),
                _ => Ok(TransportResponse::new(200, "")),
            }
        }
    }

    fn api() -> RemoteApi {
        RemoteApi::new(Some("https://remote.test/v1"), "view", "export", "import")
    }

    fn candidates(count: usize) -> Vec<DeletionCandidate> {
        (0..count)
            .map(|i| DeletionCandidate::new(format!("key{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_batches_of_one_thousand() {
        let transport = RecordingTransport::default();
        let session = SyncSession::new();
        let api = api();

        let summary = BatchDeleteCoordinator::new(&transport, &api, &session)
            .run(&candidates(2001))
            .await;

        assert_eq!(summary.batches, 3);
        assert_eq!(summary.failed_batches, 0);
        assert_eq!(summary.entries_deleted, 2001);
        assert_eq!(transport.bodies.lock().unwrap().len(), 3);
        assert!(!session.delete_batches_outstanding());
        assert_eq!(session.counters().completed_batches, 3);
    }

    #[tokio::test]
    async fn test_failed_batch_still_completes() {
        let transport = RecordingTransport {
            fail_containing: Some("\"key1000\""),
            ..RecordingTransport::default()
        };
        let session = SyncSession::new();
        let api = api();

        let summary = BatchDeleteCoordinator::new(&transport, &api, &session)
            .run(&candidates(1500))
            .await;

        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.entries_deleted, 1000);
        assert_eq!(session.counters().entries_deleted, 1000);
        assert_eq!(session.counters().completed_batches, 2);
        assert!(!session.delete_batches_outstanding());
    }

    #[tokio::test]
    async fn test_ids_are_sanitized_before_sending() {
        let transport = RecordingTransport::default();
        let session = SyncSession::new();
        let api = api();

        BatchDeleteCoordinator::new(&transport, &api, &session)
            .run(&[DeletionCandidate::new("ui,,start"), DeletionCandidate::new("ui , stop")])
            .await;

        let bodies = transport.bodies.lock().unwrap();
        assert_eq!(bodies[0], r#"{"ids":["ui,start","ui,stop"]}"#);
    }

    #[tokio::test]
    async fn test_no_candidates_sends_nothing() {
        let transport = RecordingTransport::default();
        let session = SyncSession::new();
        let api = api();

        let summary = BatchDeleteCoordinator::new(&transport, &api, &session)
            .run(&[])
            .await;

        assert_eq!(summary, DeleteSummary::default());
        assert!(transport.bodies.lock().unwrap().is_empty());
    }
}
