// ABOUTME: Transport seam between coordinators and the network
// ABOUTME: Coordinators build BatchRequests; a Transport executes them and returns status + body

use async_trait::async_trait;

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// One outbound network operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl BatchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into `SyncError::HttpError`.
    pub fn into_success(self) -> SyncResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        if self.status == 401 {
            tracing::warn!("Remote rejected the API key; check the configured key for this operation");
        }
        Err(SyncError::HttpError {
            status: self.status,
            body: self.body,
        })
    }
}

/// Executes requests. Failures to send or to receive a response are
/// `SyncError::TransportFailure`; any received response is returned as-is.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: BatchRequest) -> SyncResult<TransportResponse>;
}
