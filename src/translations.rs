// ABOUTME: Translation import - per-culture text pulled from import views
// ABOUTME: Renders one gettext PO file per culture at {output_dir}/{target}/{culture}/{target}.po

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::culture::{same_culture, ColumnLayout};
use crate::keys::KEY_DELIMITER;
use crate::remote::RemoteRecord;

/// One translatable string and its text in a single culture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    pub namespace: String,
    pub key: String,
    pub source_text: String,
    /// Empty when the remote view has no translation yet.
    pub translation: String,
}

impl TranslationEntry {
    /// `namespace,key`, or the bare key without a namespace.
    pub fn context(&self) -> String {
        if self.namespace.is_empty() {
            self.key.clone()
        } else {
            format!("{}{}{}", self.namespace, KEY_DELIMITER, self.key)
        }
    }
}

/// Collect `culture` translations from import records.
///
/// Records without an id or without native source text are skipped. A repeated
/// `(namespace, key)` keeps its first position and its last texts.
pub fn extract_translations(
    records: &[RemoteRecord],
    columns: &ColumnLayout,
    native_culture: &str,
    culture: &str,
    combined_namespace_ids: bool,
) -> Vec<TranslationEntry> {
    let mut entries: Vec<TranslationEntry> = Vec::new();
    let mut positions: HashMap<(String, String), usize> = HashMap::new();

    for record in records {
        let Some((namespace, key)) = record.identity(combined_namespace_ids) else {
            continue;
        };
        let Some(source_text) = record
            .text_where(|column| {
                columns
                    .source_culture_of(column)
                    .is_some_and(|c| same_culture(&c, native_culture))
            })
            .filter(|text| !text.is_empty())
        else {
            continue;
        };
        let translation = record
            .text_where(|column| {
                columns
                    .target_culture_of(column)
                    .is_some_and(|c| same_culture(&c, culture))
            })
            .unwrap_or_default();

        let entry = TranslationEntry {
            namespace,
            key: key.to_string(),
            source_text: source_text.to_string(),
            translation: translation.to_string(),
        };
        let identity = (entry.namespace.clone(), entry.key.clone());
        match positions.get(&identity) {
            Some(&position) => entries[position] = entry,
            None => {
                positions.insert(identity, entries.len());
                entries.push(entry);
            }
        }
    }
    entries
}

/// Escape text for a double-quoted PO string.
pub fn po_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a PO catalog for one target and culture.
pub fn render_po(target: &str, culture: &str, entries: &[TranslationEntry]) -> String {
    let mut out = String::new();
    out.push_str("msgid \"\"\nmsgstr \"\"\n");
    out.push_str(&format!("\"Project-Id-Version: {}\\n\"\n", po_escape(target)));
    out.push_str(&format!("\"Language: {}\\n\"\n", po_escape(culture)));
    out.push_str("\"MIME-Version: 1.0\\n\"\n");
    out.push_str("\"Content-Type: text/plain; charset=UTF-8\\n\"\n");
    out.push_str("\"Content-Transfer-Encoding: 8bit\\n\"\n");

    for entry in entries {
        out.push('\n');
        out.push_str(&format!("#. Key:\t{}\n", po_escape(&entry.key)));
        out.push_str(&format!("msgctxt \"{}\"\n", po_escape(&entry.context())));
        out.push_str(&format!("msgid \"{}\"\n", po_escape(&entry.source_text)));
        out.push_str(&format!("msgstr \"{}\"\n", po_escape(&entry.translation)));
    }
    out
}

/// Write `{target_dir}/{culture}/{target}.po`.
pub fn write_po_file(
    target_dir: &Path,
    target: &str,
    culture: &str,
    entries: &[TranslationEntry],
) -> Result<PathBuf> {
    let dir = target_dir.join(culture);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let path = dir.join(format!("{}.po", target));
    std::fs::write(&path, render_po(target, culture, entries))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!("Wrote {} translations to {}", entries.len(), path.display());
    Ok(path)
}
