// ABOUTME: Core data types shared by the parser, reconciler and coordinators
// ABOUTME: Records mirror remote rows; source entries mirror local text

use std::collections::BTreeMap;
use std::fmt;

/// Literal id carried by the header row when it is scanned as data.
pub const HEADER_ARTIFACT_ID: &str = "Record ID";

/// One row identity in the remote view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub id: String,
    pub path: String,
}

impl Record {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// Header rows and empty ids never take part in reconciliation. The header
    /// id is matched without regard to case, like the column lookup.
    pub fn is_data_record(&self) -> bool {
        !self.id.is_empty() && !self.id.eq_ignore_ascii_case(HEADER_ARTIFACT_ID)
    }
}

/// A local localizable string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceEntry {
    pub namespace: String,
    pub key: String,
    pub native_text: String,
    /// Culture name (e.g. "fr-FR") to translated text.
    pub translations: BTreeMap<String, String>,
}

impl SourceEntry {
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        native_text: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            native_text: native_text.into(),
            translations: BTreeMap::new(),
        }
    }

    pub fn with_translation(mut self, culture: &str, text: &str) -> Self {
        self.translations
            .insert(culture.to_string(), text.to_string());
        self
    }

    /// The `(namespace, key)` pair that identifies this entry.
    pub fn identity(&self) -> (&str, &str) {
        (&self.namespace, &self.key)
    }
}

/// Column positions of the fields needed from a remote export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices {
    pub record_id: usize,
    pub path: usize,
}

impl ColumnIndices {
    /// Minimum number of fields a row needs to cover both columns.
    pub fn required_len(&self) -> usize {
        self.record_id.max(self.path) + 1
    }
}

/// Parsed result of one remote export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecordSet {
    pub records: Vec<Record>,
    pub columns: ColumnIndices,
}

impl RemoteRecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A remote record id formatted for a delete request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletionCandidate(String);

impl DeletionCandidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeletionCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
