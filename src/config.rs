//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/dash.sqlite"
//!
//! [attachments]
//! external_dir = "./data/files"   # optional: enables external storage
//! downloads_dir = "./downloads"
//!
//! [search]
//! threshold = 0.3
//! limit = 20
//! ```
//!
//! Every section except `[db]` may be omitted.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use dash_store_core::{FieldWeights, SearchOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttachmentsConfig {
    /// Where large attachments are written. Unset disables external storage.
    #[serde(default)]
    pub external_dir: Option<PathBuf>,
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            external_dir: None,
            downloads_dir: default_downloads_dir(),
        }
    }
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_distance")]
    pub distance: usize,
    #[serde(default)]
    pub location: usize,
    #[serde(default)]
    pub ignore_location: bool,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub weights: WeightsConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            distance: default_distance(),
            location: 0,
            ignore_location: false,
            limit: None,
            weights: WeightsConfig::default(),
        }
    }
}

fn default_threshold() -> f64 {
    0.3
}
fn default_distance() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeightsConfig {
    #[serde(default = "default_title_weight")]
    pub title: f64,
    #[serde(default = "default_content_weight")]
    pub content: f64,
    #[serde(default = "default_minor_weight")]
    pub tags: f64,
    #[serde(default = "default_minor_weight")]
    pub source_type: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            title: default_title_weight(),
            content: default_content_weight(),
            tags: default_minor_weight(),
            source_type: default_minor_weight(),
        }
    }
}

fn default_title_weight() -> f64 {
    0.5
}
fn default_content_weight() -> f64 {
    0.3
}
fn default_minor_weight() -> f64 {
    0.1
}

impl SearchConfig {
    /// Engine options for this config. A CLI `--limit` overrides the
    /// configured one.
    pub fn options(&self, limit: Option<usize>) -> SearchOptions {
        SearchOptions {
            threshold: self.threshold,
            distance: self.distance,
            location: self.location,
            ignore_location: self.ignore_location,
            weights: FieldWeights {
                title: self.weights.title,
                content: self.weights.content,
                tags: self.weights.tags,
                source_type: self.weights.source_type,
            },
            limit: limit.or(self.limit),
        }
    }
}

impl Config {
    /// Defaults rooted at the working directory, for running without a
    /// config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/dash.sqlite"),
            },
            attachments: AttachmentsConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let search = &config.search;

    if !(0.0..=1.0).contains(&search.threshold) {
        anyhow::bail!("search.threshold must be in [0.0, 1.0]");
    }

    if search.distance == 0 {
        anyhow::bail!("search.distance must be > 0");
    }

    if search.limit == Some(0) {
        anyhow::bail!("search.limit must be >= 1");
    }

    let weights = [
        ("title", search.weights.title),
        ("content", search.weights.content),
        ("tags", search.weights.tags),
        ("source_type", search.weights.source_type),
    ];
    for (field, weight) in weights {
        if weight.is_nan() || weight <= 0.0 {
            anyhow::bail!("search.weights.{} must be > 0", field);
        }
    }

    if let Some(dir) = &config.attachments.external_dir {
        if dir.as_os_str().is_empty() {
            anyhow::bail!("attachments.external_dir must not be empty when set");
        }
    }

    Ok(())
}
