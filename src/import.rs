// ABOUTME: Downloads records from the configured import views
// ABOUTME: Feeds both translation import and source-change download; a failed view is skipped

use crate::error::SyncResult;
use crate::remote::{RemoteApi, RemoteRecord, Transport};

/// Records gathered from every import view, in view order.
#[derive(Debug, Default)]
pub struct ImportedRecords {
    pub records: Vec<RemoteRecord>,
    pub failed_views: Vec<String>,
}

pub struct ImportFetcher<'a, T: Transport + ?Sized> {
    transport: &'a T,
    api: &'a RemoteApi,
}

impl<'a, T: Transport + ?Sized> ImportFetcher<'a, T> {
    pub fn new(transport: &'a T, api: &'a RemoteApi) -> Self {
        Self { transport, api }
    }

    async fn fetch_view(&self, view_id: &str) -> SyncResult<Vec<RemoteRecord>> {
        let response = self
            .transport
            .send(self.api.fetch_records_request(view_id))
            .await?
            .into_success()?;
        let records: Vec<RemoteRecord> = serde_json::from_str(&response.body)?;
        tracing::info!("Import view {}: {} records", view_id, records.len());
        Ok(records)
    }

    /// Fetch every non-blank view in order. A failed view is logged and skipped.
    pub async fn fetch_all(&self, view_ids: &[String]) -> ImportedRecords {
        let mut imported = ImportedRecords::default();
        for view_id in view_ids.iter().filter(|id| !id.trim().is_empty()) {
            match self.fetch_view(view_id).await {
                Ok(records) => imported.records.extend(records),
                Err(e) => {
                    tracing::error!("Failed to import view {}: {}", view_id, e);
                    imported.failed_views.push(view_id.clone());
                }
            }
        }
        imported
    }
}
