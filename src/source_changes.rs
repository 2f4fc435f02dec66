// ABOUTME: Source-change download - current source text pulled from import views
// ABOUTME: Writes one Key,SourceString CSV per namespace under the target's output directory

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::culture::{same_culture, ColumnLayout};
use crate::remote::RemoteRecord;

pub const KEY_HEADER: &str = "Key";
pub const SOURCE_STRING_HEADER: &str = "SourceString";

/// Source text for one key as currently held remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChange {
    pub namespace: String,
    pub key: String,
    pub source_text: String,
}

/// Pull source changes out of records returned by an import view.
///
/// The source cell is the first `src_` column naming `native_culture`.
/// Records without an id, without source text, or without a namespace are skipped.
pub fn extract_changes(
    records: &[RemoteRecord],
    columns: &ColumnLayout,
    native_culture: &str,
    combined_namespace_ids: bool,
) -> Vec<SourceChange> {
    records
        .iter()
        .filter_map(|record| {
            let (namespace, key) = record.identity(combined_namespace_ids)?;
            let source_text = record
                .text_where(|column| {
                    columns
                        .source_culture_of(column)
                        .is_some_and(|culture| same_culture(&culture, native_culture))
                })
                .filter(|text| !text.is_empty())?;

            if namespace.is_empty() {
                tracing::warn!("Skipping remote record '{}' with no namespace", key);
                return None;
            }

            Some(SourceChange {
                namespace,
                key: key.to_string(),
                source_text: source_text.to_string(),
            })
        })
        .collect()
}

/// Group changes by namespace. Within a namespace a repeated key keeps its
/// first position and its last text.
pub fn group_by_namespace(changes: Vec<SourceChange>) -> BTreeMap<String, Vec<(String, String)>> {
    let mut groups: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    let mut positions: HashMap<(String, String), usize> = HashMap::new();

    for change in changes {
        let rows = groups.entry(change.namespace.clone()).or_default();
        match positions.get(&(change.namespace.clone(), change.key.clone())) {
            Some(&position) => rows[position].1 = change.source_text,
            None => {
                positions.insert((change.namespace, change.key.clone()), rows.len());
                rows.push((change.key, change.source_text));
            }
        }
    }
    groups
}

/// Render a `Key,SourceString` file: bare header, every row field quoted.
pub fn render_key_value_csv(rows: &[(String, String)]) -> Result<String> {
    let header = format!("{},{}\n", KEY_HEADER, SOURCE_STRING_HEADER);
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(header.into_bytes());
    for (key, text) in rows {
        writer.write_record([key, text])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// File name stem for a namespace, confined to a single path component.
///
/// Separators become `_`; names that would refer to the directory itself or
/// its parent yield `None`.
pub fn namespace_file_stem(namespace: &str) -> Option<String> {
    let stem: String = namespace
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    match stem.trim() {
        "" | "." | ".." => None,
        _ => Some(stem),
    }
}

/// Write one `{namespace}.csv` per group into `dir`.
pub fn write_namespace_files(
    dir: &Path,
    groups: &BTreeMap<String, Vec<(String, String)>>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(groups.len());
    for (namespace, rows) in groups {
        let Some(stem) = namespace_file_stem(namespace) else {
            tracing::warn!("Skipping namespace '{}': not usable as a file name", namespace);
            continue;
        };
        let path = dir.join(format!("{}.csv", stem));
        let content = render_key_value_csv(rows)
            .with_context(|| format!("Failed to render {}", path.display()))?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Wrote {} source strings to {}", rows.len(), path.display());
        written.push(path);
    }
    Ok(written)
}
