//! # Dash Store CLI (`dash`)
//!
//! ## Usage
//!
//! ```bash
//! dash --config ./config/dash.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dash init` | Create the SQLite database and run schema migrations |
//! | `dash note add` | Add a note |
//! | `dash task add` | Add a task |
//! | `dash event add` | Add an event |
//! | `dash attach [PATHS...]` | Save files as attachments (paths from stdin when none given) |
//! | `dash attachments` | List attachments |
//! | `dash export <ID>` | Deliver an attachment's bytes |
//! | `dash search "<query>"` | Fuzzy search notes, tasks, and events |
//! | `dash reindex` | Rebuild the search index from scratch |
//! | `dash stats` | Summarize what is stored |
//!
//! Logging goes to stderr and is controlled by `DASH_LOG` (an `EnvFilter`
//! directive, default `warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dash_store::{attach, config, migrate, records, search, stats};

/// Dash Store CLI: a local-first store for notes, tasks, events, and
/// attachments with fuzzy search.
#[derive(Parser)]
#[command(
    name = "dash",
    about = "Dash Store — a local-first store for notes, tasks, events, and attachments",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/dash.toml`. When the file does not exist,
    /// built-in defaults rooted at the working directory are used.
    #[arg(long, global = true, default_value = "./config/dash.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Manage notes.
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Manage tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage events.
    Event {
        #[command(subcommand)]
        action: EventAction,
    },

    /// Save files as attachments.
    ///
    /// Files larger than 5 MiB are written under `attachments.external_dir`
    /// when it is configured; everything else is stored in the database.
    /// With no paths, newline-separated paths are read from stdin.
    Attach {
        paths: Vec<PathBuf>,
    },

    /// List stored attachments.
    Attachments,

    /// Export an attachment.
    ///
    /// External attachments are rewritten to their file; the rest are
    /// copied into `attachments.downloads_dir`.
    Export {
        /// Attachment id.
        id: i64,
    },

    /// Fuzzy search notes, tasks, and events.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the search index from every note, task, and event.
    Reindex,

    /// Show database statistics.
    Stats,
}

#[derive(Subcommand)]
enum NoteAction {
    Add {
        #[arg(long)]
        title: Option<String>,
        /// Note body as HTML.
        #[arg(long)]
        html: Option<String>,
        /// Tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    Add {
        #[arg(long)]
        title: Option<String>,
        /// Free-form status, e.g. `pending` or `done`.
        #[arg(long)]
        status: Option<String>,
        /// Tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

#[derive(Subcommand)]
enum EventAction {
    Add {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Start time: `YYYY-MM-DD` or RFC 3339.
        #[arg(long)]
        at: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("DASH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config file not found, using defaults");
        config::Config::minimal()
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Note {
            action: NoteAction::Add { title, html, tags },
        } => {
            records::run_add_note(&cfg, title, html, tags).await?;
        }
        Commands::Task {
            action: TaskAction::Add { title, status, tags },
        } => {
            records::run_add_task(&cfg, title, status, tags).await?;
        }
        Commands::Event {
            action:
                EventAction::Add {
                    title,
                    description,
                    at,
                },
        } => {
            records::run_add_event(&cfg, title, description, at).await?;
        }
        Commands::Attach { paths } => {
            attach::run_attach(&cfg, paths).await?;
        }
        Commands::Attachments => {
            attach::run_list_attachments(&cfg).await?;
        }
        Commands::Export { id } => {
            attach::run_export(&cfg, id).await?;
        }
        Commands::Search { query, limit, json } => {
            search::run_search(&cfg, &query, limit, json).await?;
        }
        Commands::Reindex => {
            search::run_reindex(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
