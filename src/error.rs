// ABOUTME: Error kinds produced by the sync engine core
// ABOUTME: CLI and config layers wrap these in anyhow with extra context

use thiserror::Error;

use crate::session::SyncPhase;

/// Errors raised by the parser, coordinators and orchestrator.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required column is absent from the remote export header.
    #[error("required column '{column}' not found in remote export header")]
    MissingColumn { column: &'static str },

    /// The request could not be sent or no response was received.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// The remote answered with a non-success status code.
    #[error("remote returned HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// A JSON or CSV payload could not be interpreted.
    #[error("failed to parse payload: {0}")]
    ParseFailure(String),

    /// A cycle is already running for this session.
    #[error("a sync cycle is already in progress (phase: {0:?})")]
    SessionBusy(SyncPhase),

    #[error("invalid sync transition from {from:?} on {event}")]
    InvalidTransition { from: SyncPhase, event: String },
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::ParseFailure(err.to_string())
    }
}
