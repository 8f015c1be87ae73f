//! # Payslip Context CLI (`payctx`)
//!
//! Inspects the versioned policy catalog, assembles prompt context for
//! payslip questions, and starts the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! payctx --config ./config/payctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `payctx sources` | List catalog sources and whether they can be read |
//! | `payctx docs list` | List materialized documents |
//! | `payctx docs get <id>` | Print one document with its content |
//! | `payctx docs versions <key>` | All versions of a logical document |
//! | `payctx docs effective` | Documents in effect on a date or payslip period |
//! | `payctx docs stats` | Counts by type and version |
//! | `payctx context "<question>"` | Print assembled prompt context |
//! | `payctx serve` | Start the HTTP API |
//!
//! Log output goes to stderr and is controlled by `RUST_LOG`
//! (default `payslip_context=info`).

use anyhow::bail;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use payslip_context::config;
use payslip_context::docs::{self, EffectiveQuery};
use payslip_context::server;
use payslip_context::sources;

/// Payslip Context CLI: version-aware policy document context for payslip
/// questions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/payctx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "payctx",
    about = "Version-aware policy document context for payslip questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/payctx.toml`. A missing file falls back to the
    /// built-in catalog reading from `./public/documents`.
    #[arg(long, global = true, default_value = "./config/payctx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog sources and their status.
    ///
    /// Shows, for every catalog version, whether its primary source and its
    /// unversioned fallback exist, plus files no catalog entry refers to.
    Sources,

    /// Inspect materialized documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Print the prompt context for a question about a payslip period.
    Context {
        /// The employee's question.
        question: String,

        /// Payslip month, 1 = January.
        #[arg(long)]
        month: u32,

        /// Payslip year.
        #[arg(long)]
        year: i32,
    },

    /// Start the HTTP API.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum DocsAction {
    /// List documents, optionally filtered.
    List {
        /// Only documents of this type (Policy, Guide, Reference, FAQ).
        #[arg(long = "type")]
        doc_type: Option<String>,

        /// Case-insensitive text search over name, description, type, and content.
        #[arg(long)]
        search: Option<String>,
    },

    /// Print one document by id.
    Get { id: String },

    /// All versions of a logical document, newest first.
    Versions { key: String },

    /// Documents in effect on a date or for a payslip period.
    Effective {
        /// Target date (YYYY-MM-DD).
        #[arg(long, conflicts_with_all = ["month", "year"])]
        date: Option<NaiveDate>,

        /// Payslip month, 1 = January. Requires `--year`.
        #[arg(long, requires = "year")]
        month: Option<u32>,

        /// Payslip year. Requires `--month`.
        #[arg(long, requires = "month")]
        year: Option<i32>,

        /// Keep only the highest version per logical document.
        #[arg(long)]
        latest: bool,
    },

    /// Document counts by type and version.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("payslip_context=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::warn!(path = %cli.config.display(), "config file not found, using built-in catalog");
        config::Config::minimal()
    };

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Docs { action } => match action {
            DocsAction::List { doc_type, search } => {
                docs::run_list(&cfg, doc_type.as_deref(), search.as_deref()).await?;
            }
            DocsAction::Get { id } => {
                docs::run_get(&cfg, &id).await?;
            }
            DocsAction::Versions { key } => {
                docs::run_versions(&cfg, &key).await?;
            }
            DocsAction::Effective {
                date,
                month,
                year,
                latest,
            } => {
                let query = match (date, month, year) {
                    (Some(date), _, _) => EffectiveQuery::Date(date),
                    (None, Some(month), Some(year)) => EffectiveQuery::Period { month, year },
                    _ => bail!("provide either --date, or --month and --year"),
                };
                docs::run_effective(&cfg, query, latest).await?;
            }
            DocsAction::Stats => {
                docs::run_stats(&cfg).await?;
            }
        },
        Commands::Context {
            question,
            month,
            year,
        } => {
            docs::run_context(&cfg, &question, month, year).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
