// ABOUTME: Reconciler for record sync - detects remote records the local side no longer owns
// ABOUTME: Compares remote (path, id) pairs against local (namespace, key) pairs

use std::collections::{HashMap, HashSet};

use crate::keys::deletion_id;
use crate::model::{DeletionCandidate, RemoteRecordSet, SourceEntry};

/// Reconciler finds remote records that have no local counterpart.
///
/// The comparison is one-directional: a remote record is kept only when some
/// local entry has the same namespace (remote path) and key (remote id).
/// Local-only entries are never proposed for deletion. Paths and ids are
/// compared without regard to case.
#[derive(Debug, Clone, Copy)]
pub struct RecordReconciler {
    combined_namespace_ids: bool,
}

/// Why a remote record was selected for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanReason {
    /// The path exists locally but no local entry under it has this id.
    UnknownId,
    /// No local entry uses this path at all.
    UnknownPath,
}

impl RecordReconciler {
    pub fn new(combined_namespace_ids: bool) -> Self {
        Self {
            combined_namespace_ids,
        }
    }

    /// Local namespace -> keys, both lowercased.
    fn index(local: &[SourceEntry]) -> HashMap<String, HashSet<String>> {
        let mut index: HashMap<String, HashSet<String>> = HashMap::new();
        for entry in local {
            let (namespace, key) = entry.identity();
            index
                .entry(namespace.to_lowercase())
                .or_default()
                .insert(key.to_lowercase());
        }
        index
    }

    /// Classify one remote record against the local index.
    fn classify(
        index: &HashMap<String, HashSet<String>>,
        path: &str,
        id: &str,
    ) -> Option<OrphanReason> {
        match index.get(&path.to_lowercase()) {
            Some(keys) if keys.contains(&id.to_lowercase()) => None,
            Some(_) => Some(OrphanReason::UnknownId),
            None => Some(OrphanReason::UnknownPath),
        }
    }

    /// Compute the deletion candidates for `remote`, preserving remote order.
    pub fn deletion_candidates(
        &self,
        local: &[SourceEntry],
        remote: &RemoteRecordSet,
    ) -> Vec<DeletionCandidate> {
        let index = Self::index(local);

        let mut candidates = Vec::new();
        for record in &remote.records {
            if !record.is_data_record() {
                tracing::debug!("Skipping non-data remote record {:?}", record);
                continue;
            }

            if let Some(reason) = Self::classify(&index, &record.path, &record.id) {
                tracing::debug!(
                    "No local match for remote record id={} path={} ({:?}), adding to delete list",
                    record.id,
                    record.path,
                    reason
                );
                candidates.push(DeletionCandidate::new(deletion_id(
                    &record.path,
                    &record.id,
                    self.combined_namespace_ids,
                )));
            }
        }

        tracing::info!(
            "Reconciled {} remote records against {} local entries: {} to delete",
            remote.records.len(),
            local.len(),
            candidates.len()
        );

        candidates
    }
}
