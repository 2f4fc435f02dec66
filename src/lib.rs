// ABOUTME: Library root for localization-sync
// ABOUTME: Two-way sync of localization entries against a remote record store

pub mod commands;
pub mod config;
pub mod culture;
pub mod delete;
pub mod error;
pub mod import;
pub mod keys;
pub mod local;
pub mod model;
pub mod orchestrator;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod source_changes;
pub mod tabular;
pub mod translations;
pub mod upload;

pub use error::{SyncError, SyncResult};
pub use model::{DeletionCandidate, Record, RemoteRecordSet, SourceEntry};
pub use orchestrator::{SyncOrchestrator, SyncReport, SyncSettings};
pub use session::{SyncPhase, SyncSession};
