//! `dash search` and `dash reindex`.
//!
//! Each invocation is a cold start: the query engine is loaded from the
//! persisted index on the first search, so `reindex` is only needed after
//! the index and the records have drifted apart.

use anyhow::{bail, Result};
use serde::Serialize;

use dash_store_core::search::ScoredDocument;
use dash_store_core::SearchDocument;

use crate::app::App;
use crate::config::Config;
use crate::fs_platform::FsPlatform;

const EXCERPT_CHARS: usize = 160;

#[derive(Debug, Serialize)]
struct SearchHit<'a> {
    #[serde(flatten)]
    document: &'a SearchDocument,
    score: f64,
}

/// Run a fuzzy search and print the hits, most relevant first.
pub async fn run_search(config: &Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    if limit == Some(0) {
        bail!("--limit must be >= 1");
    }

    let app = App::open_with(
        config,
        FsPlatform::new(&config.attachments),
        config.search.options(limit),
    )
    .await?;
    let hits = app.index.search_scored(query).await?;
    app.close().await;

    if json {
        let out: Vec<SearchHit<'_>> = hits
            .iter()
            .map(|hit| SearchHit {
                document: &hit.document,
                score: hit.score,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        print_hit(i + 1, hit);
    }
    Ok(())
}

fn print_hit(rank: usize, hit: &ScoredDocument) {
    let doc = &hit.document;
    let title = if doc.title.is_empty() {
        "(untitled)"
    } else {
        doc.title.as_str()
    };

    println!("{}. [{:.4}] {} / {}", rank, hit.score, doc.source_type, title);
    if !doc.content.is_empty() {
        println!("    excerpt: \"{}\"", excerpt(&doc.content));
    }
    if !doc.tags.is_empty() {
        println!("    tags: {}", doc.tags.join(", "));
    }
    println!("    id: {}", doc.id);
    println!();
}

fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Rebuild the persisted index and engine from every note, task, and event.
pub async fn run_reindex(config: &Config) -> Result<()> {
    let app = App::open(config).await?;
    let count = app.index.build().await?;
    app.close().await;

    println!("Indexed {} records.", count);
    Ok(())
}
