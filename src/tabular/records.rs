// ABOUTME: Turns a remote CSV export into Record values
// ABOUTME: Header resolution and row extraction are separate, independently testable steps

use crate::error::{SyncError, SyncResult};
use crate::keys::strip_namespace;
use crate::model::{ColumnIndices, Record, RemoteRecordSet, HEADER_ARTIFACT_ID};

use super::scanner::{trim_quotes, RowScanner};

pub const RECORD_ID_COLUMN: &str = "Record ID";
pub const PATH_COLUMN: &str = "Path";

/// Locate the `Record ID` and `Path` columns in the first row of `content`.
///
/// Header cells are quote-trimmed and compared case-insensitively. Only the
/// first row is scanned.
pub fn resolve_columns(content: &str) -> SyncResult<ColumnIndices> {
    let header = RowScanner::new(content).next().unwrap_or_default();

    let mut record_id = None;
    let mut path = None;
    for (index, cell) in header.iter().enumerate() {
        let name = trim_quotes(cell);
        if name.eq_ignore_ascii_case(RECORD_ID_COLUMN) {
            record_id = Some(index);
        } else if name.eq_ignore_ascii_case(PATH_COLUMN) {
            path = Some(index);
        }
    }

    match (record_id, path) {
        (Some(record_id), Some(path)) => Ok(ColumnIndices { record_id, path }),
        (None, _) => Err(SyncError::MissingColumn {
            column: RECORD_ID_COLUMN,
        }),
        (_, None) => Err(SyncError::MissingColumn {
            column: PATH_COLUMN,
        }),
    }
}

/// Extract records from every row of `content` using resolved column indices.
///
/// The header row is scanned like any other row and dropped by its id. Rows too
/// short to cover both columns are ignored. Duplicates are kept.
pub fn parse_rows(content: &str, columns: ColumnIndices) -> Vec<Record> {
    let required = columns.required_len();

    RowScanner::new(content)
        .filter(|fields| fields.len() >= required)
        .filter_map(|fields| {
            let id = strip_namespace(trim_quotes(&fields[columns.record_id]));
            if id.eq_ignore_ascii_case(HEADER_ARTIFACT_ID) {
                return None;
            }
            let path = trim_quotes(&fields[columns.path]);
            Some(Record::new(id, path))
        })
        .collect()
}

/// Resolve columns and parse all rows. Fails without partial output when a
/// required column is missing.
pub fn parse_records(content: &str) -> SyncResult<RemoteRecordSet> {
    let columns = resolve_columns(content)?;
    let records = parse_rows(content, columns);
    tracing::debug!(
        "Parsed {} remote records (Record ID column {}, Path column {})",
        records.len(),
        columns.record_id,
        columns.path
    );
    Ok(RemoteRecordSet { records, columns })
}
