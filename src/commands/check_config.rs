// ABOUTME: Validates a sync configuration file and prints what a run would use
// ABOUTME: Never contacts the remote service

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug, Clone)]
pub struct CheckConfigArgs {
    /// Path to the sync configuration file
    #[arg(long)]
    pub config: PathBuf,
    /// Also check that this section exists and its provider is ready
    #[arg(long)]
    pub section: Option<String>,
}

pub async fn command(args: CheckConfigArgs) -> Result<()> {
    let config = Config::load(&args.config)?;

    println!("Config OK: {}", args.config.display());
    println!("  Remote API:      {}", config.remote.api_base_url);
    println!(
        "  Export view:     {}",
        display_or_unset(&config.remote.export_view_id)
    );
    println!(
        "  Import views:    {}",
        if config.remote.import_view_ids.is_empty() {
            "(unset)".to_string()
        } else {
            config.remote.import_view_ids.join(", ")
        }
    );
    println!(
        "  Batch size:      {}",
        config.sync.export_max_records_per_request
    );
    println!("  Record sync:     {}", config.sync.sync_records);
    println!("  Combined ids:    {}", config.sync.use_combined_namespace_id);
    for target in &config.targets {
        let cultures = target.translation_cultures();
        println!(
            "  Target:          {} ({}, {}{})",
            target.name,
            target.entries.display(),
            target.native_culture,
            if cultures.is_empty() {
                String::new()
            } else {
                format!(" -> {}", cultures.join(", "))
            }
        );
    }

    if let Some(name) = &args.section {
        let section = config.section(name)?;
        if section.export {
            config.remote.ensure_export_ready(config.sync.sync_records)?;
        }
        if section.import || section.source_changes {
            config.remote.ensure_import_ready()?;
        }
        println!(
            "  Section '{}':    export={}, import={}, source_changes={}, output={}",
            name,
            section.export,
            section.import,
            section.source_changes,
            section.output_dir.display()
        );
    }

    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "(unset)"
    } else {
        value
    }
}
