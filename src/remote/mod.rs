// ABOUTME: Remote record API access - request building, transport seam, HTTP client
// ABOUTME: Coordinators depend only on Transport so they run without a live network

pub mod api;
pub mod client;
pub mod models;
pub mod transport;

pub use api::{RemoteApi, DEFAULT_API_BASE_URL};
pub use client::HttpTransport;
pub use models::{Cell, RemoteCell, RemoteRecord, UploadRecord};
pub use transport::{BatchRequest, Method, Transport, TransportResponse};
