// ABOUTME: Batch upload of local entries - one request in flight at a time
// ABOUTME: Stops at the first failed batch and counts acknowledged records per response

use std::collections::VecDeque;

use crate::culture::{same_culture, ColumnLayout};
use crate::error::{SyncError, SyncResult};
use crate::keys::upload_id;
use crate::model::SourceEntry;
use crate::remote::{BatchRequest, Cell, RemoteApi, Transport, UploadRecord};
use crate::session::SyncSession;

/// Default maximum records per upload request.
pub const DEFAULT_MAX_RECORDS_PER_REQUEST: usize = 1000;

/// How local entries are shaped into upload batches.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_records_per_request: usize,
    pub combined_namespace_ids: bool,
    /// Also send translation cells, not just the native text.
    pub include_translations: bool,
    pub native_culture: String,
    pub columns: ColumnLayout,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_records_per_request: DEFAULT_MAX_RECORDS_PER_REQUEST,
            combined_namespace_ids: false,
            include_translations: false,
            native_culture: "en-US".to_string(),
            columns: ColumnLayout::default(),
        }
    }
}

/// Totals for a finished upload stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadSummary {
    pub batches: usize,
    pub entries_updated: u64,
}

/// Split `items` into consecutive chunks of at most `max` elements.
pub fn partition<T>(items: &[T], max: usize) -> Vec<&[T]> {
    items.chunks(max.max(1)).collect()
}

/// Shape one local entry as a remote record.
pub fn to_upload_record(entry: &SourceEntry, settings: &UploadSettings) -> UploadRecord {
    let mut cells = vec![Cell {
        column_id: settings.columns.source_column(&settings.native_culture),
        value: entry.native_text.clone(),
    }];

    if settings.include_translations {
        cells.extend(
            entry
                .translations
                .iter()
                .filter(|(culture, _)| !same_culture(culture, &settings.native_culture))
                .map(|(culture, text)| Cell {
                    column_id: settings.columns.target_column(culture),
                    value: text.clone(),
                }),
        );
    }

    UploadRecord {
        id: upload_id(&entry.namespace, &entry.key, settings.combined_namespace_ids),
        path: entry.namespace.clone(),
        cells,
    }
}

/// Count acknowledgements in an upload response. An empty body counts as none.
pub fn parse_acknowledgements(body: &str) -> SyncResult<u64> {
    if body.trim().is_empty() {
        return Ok(0);
    }
    let acks: Vec<serde_json::Value> = serde_json::from_str(body).map_err(|e| {
        SyncError::ParseFailure(format!("upload acknowledgement is not a JSON array: {}", e))
    })?;
    Ok(acks.len() as u64)
}

/// Sends upload batches strictly in order, one at a time.
pub struct BatchUploadCoordinator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    api: &'a RemoteApi,
    session: &'a SyncSession,
    settings: &'a UploadSettings,
}

impl<'a, T: Transport + ?Sized> BatchUploadCoordinator<'a, T> {
    pub fn new(
        transport: &'a T,
        api: &'a RemoteApi,
        session: &'a SyncSession,
        settings: &'a UploadSettings,
    ) -> Self {
        Self {
            transport,
            api,
            session,
            settings,
        }
    }

    /// Build the FIFO queue of upload requests for `entries`.
    pub fn build_requests(&self, entries: &[SourceEntry]) -> SyncResult<VecDeque<BatchRequest>> {
        partition(entries, self.settings.max_records_per_request)
            .into_iter()
            .map(|chunk| {
                let records: Vec<UploadRecord> = chunk
                    .iter()
                    .map(|entry| to_upload_record(entry, self.settings))
                    .collect();
                self.api.upload_request(&records)
            })
            .collect()
    }

    /// Send every batch in order. The first failure abandons the rest of the queue.
    pub async fn run(&self, entries: &[SourceEntry]) -> SyncResult<UploadSummary> {
        let mut queue = self.build_requests(entries)?;
        let total = queue.len();
        self.session.set_upload_batches_total(total);

        tracing::info!(
            "Uploading {} entries in {} batches (max {} per request)",
            entries.len(),
            total,
            self.settings.max_records_per_request
        );

        let mut summary = UploadSummary::default();
        while let Some(request) = queue.pop_front() {
            let batch_number = summary.batches + 1;
            let result = match self.transport.send(request).await {
                Ok(response) => response
                    .into_success()
                    .and_then(|response| parse_acknowledgements(&response.body)),
                Err(e) => Err(e),
            };

            match result {
                Ok(acknowledged) => {
                    self.session.record_upload_batch(acknowledged);
                    summary.batches = batch_number;
                    summary.entries_updated += acknowledged;
                    tracing::debug!(
                        "Upload batch {}/{} acknowledged {} records",
                        batch_number,
                        total,
                        acknowledged
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Upload batch {}/{} failed, abandoning {} queued batches: {}",
                        batch_number,
                        total,
                        queue.len(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        tracing::info!("Number of entries updated: {}", summary.entries_updated);
        Ok(summary)
    }
}
