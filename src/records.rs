//! `dash note add`, `dash task add`, and `dash event add`.
//!
//! Records are added through the [`RecordStore`](dash_store_core::RecordStore)
//! of an [`App`], so each one is indexed as soon as it is stored.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};

use dash_store_core::{Event, Note, Task};

use crate::app::App;
use crate::config::Config;

fn tags_option(tags: Vec<String>) -> Option<Vec<String>> {
    (!tags.is_empty()).then_some(tags)
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date (midnight UTC).
pub fn parse_when(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    bail!("invalid date '{}': expected YYYY-MM-DD or an RFC 3339 timestamp", s)
}

pub async fn run_add_note(
    config: &Config,
    title: Option<String>,
    html: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let app = App::open(config).await?;
    let note = app
        .records
        .add_note(Note {
            id: 0,
            title,
            content_html: html,
            tags: tags_option(tags),
        })
        .await?;
    println!("Added note {}.", note.id);
    app.close().await;
    Ok(())
}

pub async fn run_add_task(
    config: &Config,
    title: Option<String>,
    status: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let app = App::open(config).await?;
    let task = app
        .records
        .add_task(Task {
            id: 0,
            title,
            status,
            tags: tags_option(tags),
        })
        .await?;
    println!("Added task {}.", task.id);
    app.close().await;
    Ok(())
}

pub async fn run_add_event(
    config: &Config,
    title: Option<String>,
    description: Option<String>,
    at: Option<String>,
) -> Result<()> {
    let starts_at = at.as_deref().map(parse_when).transpose()?;

    let app = App::open(config).await?;
    let event = app
        .records
        .add_event(Event {
            id: 0,
            title,
            description,
            starts_at,
        })
        .await?;
    println!("Added event {}.", event.id);
    app.close().await;
    Ok(())
}
