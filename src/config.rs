// ABOUTME: TOML configuration - remote credentials, sync switches, targets and sections
// ABOUTME: Loaded once per run, validated up front, then turned into per-target settings

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::culture::{same_culture, ColumnLayout};
use crate::orchestrator::SyncSettings;
use crate::remote::{RemoteApi, DEFAULT_API_BASE_URL};
use crate::upload::{UploadSettings, DEFAULT_MAX_RECORDS_PER_REQUEST};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_NATIVE_CULTURE: &str = "en-US";
pub const DEFAULT_OUTPUT_DIR: &str = "Saved/Temp/Localization";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub columns: ColumnLayout,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionConfig>,
}

/// Where the remote API lives and which keys and views to use.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub api_base_url: String,
    pub export_api_key: String,
    pub export_view_id: String,
    pub import_api_key: String,
    pub import_view_ids: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            export_api_key: String::new(),
            export_view_id: String::new(),
            import_api_key: String::new(),
            import_view_ids: Vec::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub export_max_records_per_request: usize,
    /// Delete remote records with no local entry after each export.
    pub sync_records: bool,
    pub use_combined_namespace_id: bool,
    pub include_target_translations: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            export_max_records_per_request: DEFAULT_MAX_RECORDS_PER_REQUEST,
            sync_records: false,
            use_combined_namespace_id: false,
            include_target_translations: false,
        }
    }
}

/// One group of local entries synced to the remote view.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    /// CSV file with `Namespace,Key,NativeText` and optional culture columns.
    pub entries: PathBuf,
    #[serde(default = "default_native_culture")]
    pub native_culture: String,
    /// Cultures the target is translated into. The native culture may be listed.
    #[serde(default)]
    pub cultures: Vec<String>,
}

impl TargetConfig {
    /// Cultures to import translations for: every listed culture except the
    /// native one, first occurrence kept.
    pub fn translation_cultures(&self) -> Vec<&str> {
        let mut cultures: Vec<&str> = Vec::new();
        for culture in &self.cultures {
            if same_culture(culture, &self.native_culture)
                || cultures.iter().any(|seen| same_culture(seen, culture))
            {
                continue;
            }
            cultures.push(culture);
        }
        cultures
    }
}

/// A named batch invocation (`run --section <name>`).
#[derive(Debug, Clone, Deserialize)]
pub struct SectionConfig {
    #[serde(default)]
    pub export: bool,
    /// Import translations for every non-native culture.
    #[serde(default)]
    pub import: bool,
    /// Download current source text per namespace.
    #[serde(default)]
    pub source_changes: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// True when `name` can be used as one path component under the output directory.
pub fn is_path_component(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn default_native_culture() -> String {
    DEFAULT_NATIVE_CULTURE.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Config {
    /// Read, parse and validate a config file.
    ///
    /// Relative target and output paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!(
            "Loaded config from {} ({} targets, {} sections)",
            path.display(),
            config.targets.len(),
            config.sections.len()
        );
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.remote.api_base_url).with_context(|| {
            format!("api_base_url '{}' is not a valid URL", self.remote.api_base_url)
        })?;

        if self.sync.export_max_records_per_request == 0 {
            bail!("export_max_records_per_request must be greater than 0");
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                bail!("Every [[targets]] entry needs a name");
            }
            if !is_path_component(&target.name) {
                bail!("Target name '{}' must not contain path separators", target.name);
            }
            if !names.insert(target.name.as_str()) {
                bail!("Duplicate target name '{}'", target.name);
            }
            if let Some(culture) = target.cultures.iter().find(|c| !is_path_component(c)) {
                bail!(
                    "Target '{}' lists culture '{}', which is not a valid directory name",
                    target.name,
                    culture
                );
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for target in &mut self.targets {
            if target.entries.is_relative() {
                target.entries = base.join(&target.entries);
            }
        }
        for section in self.sections.values_mut() {
            if section.output_dir.is_relative() {
                section.output_dir = base.join(&section.output_dir);
            }
        }
    }

    pub fn section(&self, name: &str) -> Result<&SectionConfig> {
        match self.sections.get(name) {
            Some(section) => Ok(section),
            None => {
                let available: Vec<&str> = self.sections.keys().map(String::as_str).collect();
                bail!(
                    "Section '{}' not found in config (available: {})",
                    name,
                    if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    }
                )
            }
        }
    }

    /// Every target with `all` (the CLI default), otherwise only the first one.
    pub fn targets_to_process(&self, all: bool) -> &[TargetConfig] {
        if all {
            &self.targets
        } else {
            &self.targets[..self.targets.len().min(1)]
        }
    }

    pub fn sync_settings(&self, target: &TargetConfig) -> SyncSettings {
        SyncSettings {
            record_sync: self.sync.sync_records,
            upload: UploadSettings {
                max_records_per_request: self.sync.export_max_records_per_request,
                combined_namespace_ids: self.sync.use_combined_namespace_id,
                include_translations: self.sync.include_target_translations,
                native_culture: target.native_culture.clone(),
                columns: self.columns.clone(),
            },
        }
    }
}

impl RemoteSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn api(&self) -> RemoteApi {
        RemoteApi::new(
            Some(&self.api_base_url),
            self.export_view_id.clone(),
            self.export_api_key.clone(),
            self.import_api_key.clone(),
        )
    }

    /// Export needs the export view and key; record sync deletes with the import key.
    pub fn ensure_export_ready(&self, record_sync: bool) -> Result<()> {
        self.ensure_base_url()?;
        if self.export_view_id.trim().is_empty() {
            bail!("Remote provider unavailable: export_view_id is not set");
        }
        if self.export_api_key.trim().is_empty() {
            bail!("Remote provider unavailable: export_api_key is not set");
        }
        if record_sync && self.import_api_key.trim().is_empty() {
            bail!("Remote provider unavailable: sync_records needs import_api_key to delete records");
        }
        Ok(())
    }

    pub fn ensure_import_ready(&self) -> Result<()> {
        self.ensure_base_url()?;
        if self.import_api_key.trim().is_empty() {
            bail!("Remote provider unavailable: import_api_key is not set");
        }
        if self.import_view_ids.iter().all(|id| id.trim().is_empty()) {
            bail!("Remote provider unavailable: import_view_ids is empty");
        }
        Ok(())
    }

    fn ensure_base_url(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            bail!("Remote provider unavailable: api_base_url is not set");
        }
        Ok(())
    }
}
