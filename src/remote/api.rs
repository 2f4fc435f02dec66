// ABOUTME: Builds requests for the remote record API endpoints
// ABOUTME: Export key covers upload and CSV export; import key covers import and delete

use crate::error::SyncResult;

use super::models::{DeleteRecordsRequest, UploadRecord};
use super::transport::{BatchRequest, Method};

/// Default base URL of the remote record API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.gridly.com/v1";

/// Endpoint and credential set for one sync target.
#[derive(Debug, Clone)]
pub struct RemoteApi {
    base_url: String,
    view_id: String,
    export_api_key: String,
    import_api_key: String,
}

impl RemoteApi {
    pub fn new(
        base_url: Option<&str>,
        view_id: impl Into<String>,
        export_api_key: impl Into<String>,
        import_api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            view_id: view_id.into(),
            export_api_key: export_api_key.into(),
            import_api_key: import_api_key.into(),
        }
    }

    fn records_url(&self, view_id: &str) -> String {
        format!("{}/views/{}/records", self.base_url, view_id)
    }

    fn export_url(&self) -> String {
        format!("{}/views/{}/export", self.base_url, self.view_id)
    }

    fn authorization(key: &str) -> String {
        format!("ApiKey {}", key)
    }

    /// `POST /views/{viewId}/records` carrying one upload batch.
    pub fn upload_request(&self, records: &[UploadRecord]) -> SyncResult<BatchRequest> {
        let body = serde_json::to_string(records)?;
        Ok(BatchRequest::new(Method::Post, self.records_url(&self.view_id))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Authorization", Self::authorization(&self.export_api_key))
            .body(body))
    }

    /// `GET /views/{viewId}/export` returning the view as CSV.
    pub fn export_csv_request(&self) -> BatchRequest {
        BatchRequest::new(Method::Get, self.export_url())
            .header("Accept", "text/csv")
            .header("Authorization", Self::authorization(&self.export_api_key))
    }

    /// `DELETE /views/{viewId}/records` for one batch of ids.
    pub fn delete_request(&self, ids: &[String]) -> SyncResult<BatchRequest> {
        let body = serde_json::to_string(&DeleteRecordsRequest { ids })?;
        Ok(BatchRequest::new(Method::Delete, self.records_url(&self.view_id))
            .header("Content-Type", "application/json")
            .header("Authorization", Self::authorization(&self.import_api_key))
            .body(body))
    }

    /// `GET /views/{viewId}/records` on an import view.
    pub fn fetch_records_request(&self, import_view_id: &str) -> BatchRequest {
        BatchRequest::new(Method::Get, self.records_url(import_view_id))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Authorization", Self::authorization(&self.import_api_key))
    }
}
