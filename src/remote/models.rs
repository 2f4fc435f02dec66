// ABOUTME: JSON payloads exchanged with the remote record API
// ABOUTME: Upload records, delete bodies, and records returned by the import endpoint

use serde::{Deserialize, Serialize};

use crate::keys::split_combined;

/// One cell of a record: a column id and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "columnId")]
    pub column_id: String,
    pub value: String,
}

/// A record as sent in an upload batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRecord {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteRecordsRequest<'a> {
    pub ids: &'a [String],
}

/// Cell as returned by the records endpoint. Non-string values are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCell {
    #[serde(rename = "columnId", default)]
    pub column_id: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl RemoteCell {
    pub fn text(&self) -> Option<(&str, &str)> {
        let column = self.column_id.as_deref()?;
        let value = self.value.as_ref()?.as_str()?;
        Some((column, value))
    }
}

/// Record as returned by `GET /views/{viewId}/records`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub cells: Vec<RemoteCell>,
}

impl RemoteRecord {
    /// `(namespace, key)` of this record, or `None` without an id.
    ///
    /// With combined ids the id is split at its first delimiter; otherwise the
    /// path is the namespace. Spaces are removed from the namespace.
    pub fn identity(&self, combined_namespace_ids: bool) -> Option<(String, &str)> {
        let id = self.id.as_deref().filter(|id| !id.is_empty())?;
        let (namespace, key) = match split_combined(id) {
            Some(parts) if combined_namespace_ids => parts,
            _ => (self.path.as_deref().unwrap_or_default(), id),
        };
        Some((namespace.chars().filter(|c| *c != ' ').collect(), key))
    }

    /// Text of the first cell whose column id satisfies `matches`.
    pub fn text_where(&self, matches: impl Fn(&str) -> bool) -> Option<&str> {
        self.cells
            .iter()
            .filter_map(RemoteCell::text)
            .find(|&(column, _)| matches(column))
            .map(|(_, value)| value)
    }
}
