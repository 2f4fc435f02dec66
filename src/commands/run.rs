// ABOUTME: Batch entry point - exports, imports translations and downloads source changes per target
// ABOUTME: Stage failures are logged and the run carries on; only setup errors are fatal

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{Config, SectionConfig, TargetConfig};
use crate::import::ImportFetcher;
use crate::local::load_entries;
use crate::orchestrator::{wait_while, SyncOrchestrator, SyncReport, DEFAULT_POLL_INTERVAL};
use crate::remote::{HttpTransport, RemoteRecord, Transport};
use crate::source_changes::{extract_changes, group_by_namespace, write_namespace_files};
use crate::translations::{extract_translations, write_po_file};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the sync configuration file
    #[arg(long)]
    pub config: PathBuf,
    /// Section of the config file to run
    #[arg(long)]
    pub section: String,
    /// Import translations for every non-native culture from the import views
    #[arg(long)]
    pub import: bool,
    /// Upload local entries to the export view
    #[arg(long)]
    pub export: bool,
    /// Download current source text per namespace from the import views
    #[arg(long)]
    pub source_changes: bool,
    /// Process every configured target; `--all-targets=false` keeps only the first
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    pub all_targets: bool,
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// What a run will do after flags and section settings are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    pub export: bool,
    pub import: bool,
    pub source_changes: bool,
}

impl Stages {
    pub fn resolve(args: &RunArgs, section: &SectionConfig) -> Result<Self> {
        let stages = Self {
            export: args.export || section.export,
            import: args.import || section.import,
            source_changes: args.source_changes || section.source_changes,
        };
        if !stages.export && !stages.reads_import_views() {
            bail!(
                "Nothing to do for section '{}': pass --export, --import or --source-changes, or enable them in the section",
                args.section
            );
        }
        Ok(stages)
    }

    /// Whether any stage downloads from the import views.
    pub fn reads_import_views(&self) -> bool {
        self.import || self.source_changes
    }
}

pub async fn command(args: RunArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let section = config.section(&args.section)?;
    let stages = Stages::resolve(&args, section)?;

    if stages.export {
        config.remote.ensure_export_ready(config.sync.sync_records)?;
    }
    if stages.reads_import_views() {
        config.remote.ensure_import_ready()?;
    }

    let targets = config.targets_to_process(args.all_targets);
    if targets.is_empty() {
        bail!("No [[targets]] configured in {}", args.config.display());
    }

    if stages.export && !confirm_export(&config, targets, args.yes)? {
        tracing::info!("Export cancelled by user");
        return Ok(());
    }

    let transport = Arc::new(HttpTransport::new(config.remote.request_timeout())?);

    tracing::info!(
        "Running section '{}' for {} target(s) (export: {}, import: {}, source changes: {})",
        args.section,
        targets.len(),
        stages.export,
        stages.import,
        stages.source_changes
    );

    for target in targets {
        if stages.export {
            match export_target(&config, target, Arc::clone(&transport)).await {
                Ok(report) => tracing::info!(
                    "Target '{}' exported: {} entries updated, {} deleted",
                    target.name,
                    report.entries_updated(),
                    report.entries_deleted()
                ),
                Err(e) => tracing::error!("Export of target '{}' failed: {:#}", target.name, e),
            }
        }

        if stages.reads_import_views() {
            if let Err(e) = import_target(
                &config,
                target,
                &section.output_dir,
                stages,
                transport.as_ref(),
            )
            .await
            {
                tracing::error!("Import of target '{}' failed: {:#}", target.name, e);
            }
        }
    }

    Ok(())
}

fn confirm_export(config: &Config, targets: &[TargetConfig], yes: bool) -> Result<bool> {
    if yes || !std::io::stdin().is_terminal() {
        return Ok(true);
    }

    let mut prompt = format!(
        "Upload {} target(s) to remote view '{}'?",
        targets.len(),
        config.remote.export_view_id
    );
    if config.sync.sync_records {
        prompt.push_str(" Remote records missing locally will be deleted.");
    }

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

fn progress_bar(target: &str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len} batches") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(format!("{}: uploading", target));
    bar
}

/// Run one export cycle for `target`, polling the session to drive progress output.
pub async fn export_target<T>(
    config: &Config,
    target: &TargetConfig,
    transport: Arc<T>,
) -> Result<SyncReport>
where
    T: Transport + 'static,
{
    let entries = load_entries(&target.entries)?;
    let orchestrator = Arc::new(SyncOrchestrator::new(
        transport,
        config.remote.api(),
        config.sync_settings(target),
    ));
    let handle = orchestrator.start_export(entries)?;
    let session = Arc::clone(orchestrator.session());

    let bar = progress_bar(&target.name);
    wait_while(
        || {
            let counters = session.counters();
            bar.set_length(counters.upload_batches_total as u64);
            bar.set_position(counters.upload_batches_sent as u64);
            orchestrator.has_requests_pending()
        },
        DEFAULT_POLL_INTERVAL,
    )
    .await;

    bar.set_message(format!("{}: removing stale records", target.name));
    wait_while(
        || {
            let counters = session.counters();
            bar.set_length(counters.total_batches as u64);
            bar.set_position(counters.completed_batches as u64);
            orchestrator.has_delete_requests_pending()
        },
        DEFAULT_POLL_INTERVAL,
    )
    .await;
    bar.finish_and_clear();

    let report = handle.await.context("Sync task did not complete")??;
    Ok(report)
}

/// Files written by the import stages of one target.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub translation_files: Vec<PathBuf>,
    pub source_change_files: Vec<PathBuf>,
}

/// Fetch the import views once and run the requested import stages for
/// `target`, writing under `output_dir/{target}`.
pub async fn import_target<T>(
    config: &Config,
    target: &TargetConfig,
    output_dir: &Path,
    stages: Stages,
    transport: &T,
) -> Result<ImportReport>
where
    T: Transport + ?Sized,
{
    let api = config.remote.api();
    let imported = ImportFetcher::new(transport, &api)
        .fetch_all(&config.remote.import_view_ids)
        .await;
    if !imported.failed_views.is_empty() {
        tracing::warn!(
            "{} import view(s) failed: {}",
            imported.failed_views.len(),
            imported.failed_views.join(", ")
        );
    }

    let target_dir = output_dir.join(&target.name);
    let mut report = ImportReport::default();
    if stages.import {
        report.translation_files =
            import_translations(config, target, &target_dir, &imported.records)?;
    }
    if stages.source_changes {
        report.source_change_files =
            download_source_changes(config, target, &target_dir, &imported.records)?;
    }
    Ok(report)
}

/// Write one PO file per non-native culture of `target`.
fn import_translations(
    config: &Config,
    target: &TargetConfig,
    target_dir: &Path,
    records: &[RemoteRecord],
) -> Result<Vec<PathBuf>> {
    let cultures = target.translation_cultures();
    if cultures.is_empty() {
        tracing::warn!(
            "Target '{}' lists no cultures besides {}; no translations imported",
            target.name,
            target.native_culture
        );
        return Ok(Vec::new());
    }

    let mut written = Vec::with_capacity(cultures.len());
    for culture in cultures {
        let entries = extract_translations(
            records,
            &config.columns,
            &target.native_culture,
            culture,
            config.sync.use_combined_namespace_id,
        );
        let translated = entries.iter().filter(|e| !e.translation.is_empty()).count();
        let path = write_po_file(target_dir, &target.name, culture, &entries)?;
        tracing::info!(
            "Target '{}' {}: {} of {} strings translated, wrote {}",
            target.name,
            culture,
            translated,
            entries.len(),
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}

/// Write one `Key,SourceString` file per namespace of `target`.
fn download_source_changes(
    config: &Config,
    target: &TargetConfig,
    target_dir: &Path,
    records: &[RemoteRecord],
) -> Result<Vec<PathBuf>> {
    let changes = extract_changes(
        records,
        &config.columns,
        &target.native_culture,
        config.sync.use_combined_namespace_id,
    );
    let groups = group_by_namespace(changes);
    let written = write_namespace_files(target_dir, &groups)?;
    tracing::info!(
        "Target '{}': wrote {} source change file(s) to {}",
        target.name,
        written.len(),
        target_dir.display()
    );
    Ok(written)
}
