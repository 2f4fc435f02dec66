// ABOUTME: reqwest-backed Transport used against the live remote service
// ABOUTME: Maps send/receive errors to TransportFailure and leaves status handling to callers

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::transport::{BatchRequest, Method, Transport, TransportResponse};
use crate::error::{SyncError, SyncResult};

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: BatchRequest) -> SyncResult<TransportResponse> {
        let mut builder = self
            .client
            .request(to_reqwest(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            SyncError::TransportFailure(format!(
                "{:?} {} could not be sent: {}",
                request.method, request.url, e
            ))
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            SyncError::TransportFailure(format!(
                "no response body from {}: {}",
                request.url, e
            ))
        })?;

        tracing::debug!("{:?} {} -> {}", request.method, request.url, status);
        Ok(TransportResponse { status, body })
    }
}
