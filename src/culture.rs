// ABOUTME: Culture name conversion and remote column naming
// ABOUTME: Maps local cultures like "en-US" to remote column suffixes like "enUS"

use std::collections::BTreeMap;

use serde::Deserialize;

pub const DEFAULT_SOURCE_PREFIX: &str = "src_";
pub const DEFAULT_TARGET_PREFIX: &str = "tg_";

/// How local cultures map onto remote column ids.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnLayout {
    /// Prefix of the source-language column id.
    pub source_language_prefix: String,
    /// Prefix of translation column ids.
    pub target_language_prefix: String,
    /// Explicit overrides, local culture -> remote culture.
    pub culture_mapping: BTreeMap<String, String>,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            source_language_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            target_language_prefix: DEFAULT_TARGET_PREFIX.to_string(),
            culture_mapping: BTreeMap::new(),
        }
    }
}

impl ColumnLayout {
    /// `en-US` -> `enUS` unless the mapping says otherwise.
    pub fn to_remote_culture(&self, culture: &str) -> String {
        match self.culture_mapping.get(culture) {
            Some(mapped) => mapped.clone(),
            None => culture.replace('-', ""),
        }
    }

    /// Inverse of [`to_remote_culture`](Self::to_remote_culture).
    pub fn from_remote_culture(&self, remote: &str) -> String {
        if let Some((local, _)) = self.culture_mapping.iter().find(|(_, r)| r.as_str() == remote) {
            return local.clone();
        }

        let is_region_form = remote.len() == 4
            && remote.is_char_boundary(2)
            && remote[..2].chars().all(|c| c.is_ascii_lowercase())
            && remote[2..].chars().all(|c| c.is_ascii_uppercase());
        if is_region_form {
            format!("{}-{}", &remote[..2], &remote[2..])
        } else {
            remote.to_string()
        }
    }

    pub fn source_column(&self, native_culture: &str) -> String {
        format!(
            "{}{}",
            self.source_language_prefix,
            self.to_remote_culture(native_culture)
        )
    }

    pub fn target_column(&self, culture: &str) -> String {
        format!(
            "{}{}",
            self.target_language_prefix,
            self.to_remote_culture(culture)
        )
    }

    /// Local culture named by a source column id, if `column_id` is one.
    pub fn source_culture_of(&self, column_id: &str) -> Option<String> {
        strip_prefix_ignore_case(column_id, &self.source_language_prefix)
            .map(|remote| self.from_remote_culture(remote))
    }

    /// Local culture named by a translation column id, if `column_id` is one.
    pub fn target_culture_of(&self, column_id: &str) -> Option<String> {
        strip_prefix_ignore_case(column_id, &self.target_language_prefix)
            .map(|remote| self.from_remote_culture(remote))
    }
}

/// Culture names compare without regard to case (`en-us` is `en-US`).
pub fn same_culture(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}
