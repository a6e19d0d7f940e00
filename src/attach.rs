//! `dash attach`, `dash attachments`, and `dash export`.

use std::path::PathBuf;

use anyhow::{bail, Result};

use dash_store_core::{ExportOutcome, StoreBackend};

use crate::app::App;
use crate::config::Config;
use crate::fs_platform::FsPlatform;
use crate::stats::format_bytes;

/// Save the given files as attachments, or paths read from stdin when none
/// are given. Fails if any file could not be saved; the others are kept.
pub async fn run_attach(config: &Config, paths: Vec<PathBuf>) -> Result<()> {
    let platform = FsPlatform::new(&config.attachments).with_selection(paths);
    let app = App::open_with(config, platform, config.search.options(None)).await?;

    let report = app.attachments.upload_interactive().await?;
    let summaries = app.store().list_attachments().await?;

    for id in &report.saved {
        if let Some(a) = summaries.iter().find(|a| a.id == *id) {
            println!(
                "Saved attachment {}: {} ({}, {})",
                a.id,
                a.name,
                a.mode.as_str(),
                format_bytes(a.size)
            );
        }
    }
    for failure in &report.failed {
        eprintln!("Failed: {}: {}", failure.name, failure.error);
    }

    app.close().await;

    if report.saved.is_empty() && report.failed.is_empty() {
        println!("No files selected.");
    }
    if !report.failed.is_empty() {
        bail!("{} attachment(s) could not be saved", report.failed.len());
    }
    Ok(())
}

pub async fn run_list_attachments(config: &Config) -> Result<()> {
    let app = App::open(config).await?;
    let attachments = app.attachments.list().await?;
    app.close().await;

    if attachments.is_empty() {
        println!("No attachments.");
        return Ok(());
    }

    println!(
        "  {:>4}  {:<8} {:>10}  {:<16}  {:<24} {}",
        "ID", "STORAGE", "SIZE", "CREATED", "TYPE", "NAME"
    );
    println!("  {}", "-".repeat(76));
    for a in &attachments {
        println!(
            "  {:>4}  {:<8} {:>10}  {:<16}  {:<24} {}",
            a.id,
            a.mode.as_str(),
            format_bytes(a.size),
            a.created_at.format("%Y-%m-%d %H:%M"),
            a.mime,
            a.name
        );
    }
    Ok(())
}

pub async fn run_export(config: &Config, id: i64) -> Result<()> {
    let app = App::open(config).await?;
    let outcome = app.attachments.export_attachment(id).await;
    let delivered = app.platform.delivered();
    app.close().await;

    match outcome? {
        ExportOutcome::DeliveredViaHandle => {
            println!("Exported attachment {} to its external file.", id);
        }
        ExportOutcome::Downloaded => match delivered.last() {
            Some(path) => println!("Downloaded attachment {} to {}", id, path.display()),
            None => println!("Downloaded attachment {}.", id),
        },
        ExportOutcome::NotFound => bail!("attachment not found: {}", id),
        ExportOutcome::HandleExpired => {
            bail!("attachment {} is no longer available at its external location", id)
        }
    }
    Ok(())
}
