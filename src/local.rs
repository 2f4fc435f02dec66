// ABOUTME: Loads a target's local entries from a CSV file
// ABOUTME: Header is Namespace,Key,NativeText followed by optional culture columns

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::model::SourceEntry;

pub const NAMESPACE_COLUMN: &str = "Namespace";
pub const KEY_COLUMN: &str = "Key";
pub const NATIVE_TEXT_COLUMN: &str = "NativeText";

struct EntryColumns {
    namespace: usize,
    key: usize,
    native_text: usize,
    /// (index, culture) for every translation column.
    cultures: Vec<(usize, String)>,
}

fn resolve_entry_columns(header: &csv::StringRecord) -> Result<EntryColumns> {
    let find = |name: &str| {
        header
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(name))
    };

    let (Some(namespace), Some(key), Some(native_text)) = (
        find(NAMESPACE_COLUMN),
        find(KEY_COLUMN),
        find(NATIVE_TEXT_COLUMN),
    ) else {
        bail!(
            "Local entries header must contain {}, {} and {} columns",
            NAMESPACE_COLUMN,
            KEY_COLUMN,
            NATIVE_TEXT_COLUMN
        );
    };

    let cultures = header
        .iter()
        .enumerate()
        .filter(|(index, _)| ![namespace, key, native_text].contains(index))
        .map(|(index, cell)| (index, cell.trim().to_string()))
        .filter(|(_, culture)| !culture.is_empty())
        .collect();

    Ok(EntryColumns {
        namespace,
        key,
        native_text,
        cultures,
    })
}

fn field(row: &csv::StringRecord, index: usize) -> String {
    row.get(index).unwrap_or_default().to_string()
}

/// Parse local entries from CSV text.
///
/// Rows without a key are skipped. A repeated `(namespace, key)` keeps the
/// position of its first row and the values of its last.
pub fn parse_entries(content: &str) -> Result<Vec<SourceEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let header = reader
        .headers()
        .context("Failed to read local entries header")?
        .clone();
    if header.is_empty() {
        bail!("Local entries file is empty");
    }
    let columns = resolve_entry_columns(&header)?;

    let mut entries: Vec<SourceEntry> = Vec::new();
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    for row in reader.records() {
        let row = row.context("Malformed local entries row")?;
        let key = field(&row, columns.key);
        if key.trim().is_empty() {
            tracing::warn!(
                "Skipping local entry on line {} without a key",
                row.position().map_or(0, |p| p.line())
            );
            continue;
        }

        let mut entry = SourceEntry::new(
            field(&row, columns.namespace),
            key,
            field(&row, columns.native_text),
        );
        for (index, culture) in &columns.cultures {
            let text = field(&row, *index);
            if !text.is_empty() {
                entry = entry.with_translation(culture, &text);
            }
        }

        let identity = (entry.namespace.clone(), entry.key.clone());
        match positions.get(&identity) {
            Some(&position) => {
                tracing::debug!(
                    "Duplicate local entry {},{} - keeping the later value",
                    identity.0,
                    identity.1
                );
                entries[position] = entry;
            }
            None => {
                positions.insert(identity, entries.len());
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}

pub fn load_entries(path: &Path) -> Result<Vec<SourceEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read local entries from {}", path.display()))?;
    let entries = parse_entries(&content)
        .with_context(|| format!("Invalid local entries file {}", path.display()))?;
    tracing::info!("Loaded {} local entries from {}", entries.len(), path.display());
    Ok(entries)
}
