// ==========================================
// Registry Ingest - command line entry point
// ==========================================
// One-shot batch job: exit 0 on success (skipped rows and orphans
// included), 1 on any fatal error.
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use registry_ingest::config::ConfigManager;
use registry_ingest::db::{self, configure_sqlite_connection, init_schema, open_sqlite_connection};
use registry_ingest::importer::{write_json, IngestPipeline, Ingestor};
use registry_ingest::registry::{self, Identity};
use registry_ingest::{logging, perf, IngestConfig};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "registry-ingest")]
#[command(author, version, about = "Bulk loader for business-registry CSV extracts")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = db::DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load one extract file into its entity table
    Load {
        /// Entity type tag (code, enterprise, establishment, activity, ...)
        #[arg(short, long)]
        entity: String,

        /// CSV extract
        #[arg(short, long)]
        file: PathBuf,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Records per staging transaction
        #[arg(long)]
        batch_size: Option<usize>,

        /// Batches in flight between stages
        #[arg(long)]
        channel_capacity: Option<usize>,
    },

    /// Load every extract in a directory, parents first
    Refresh {
        /// Directory holding code.csv, enterprise.csv, ...
        #[arg(short, long)]
        dir: PathBuf,

        /// Write all run reports as a JSON array
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Create missing tables
    InitDb,

    /// List registered entity types
    Entities,
}

fn print_entities() {
    println!(
        "{:<14} {:<14} {:<18} {:<22} {:<9} {:<10} {:<8}",
        "ENTITY", "TABLE", "FILE", "IDENTITY", "CONFLICT", "DEDUP", "PARENTS"
    );
    for schema in registry::all() {
        let identity = match schema.identity {
            Identity::Natural => schema.key_field().column.to_string(),
            Identity::Content => "content".to_string(),
        };
        let parents = schema
            .parent_entities()
            .iter()
            .map(|p| p.tag())
            .collect::<Vec<_>>()
            .join("|");
        println!(
            "{:<14} {:<14} {:<18} {:<22} {:<9} {:<10} {:<8}",
            schema.entity.tag(),
            schema.table,
            schema.file_name,
            identity,
            schema.conflict_policy.to_string(),
            schema.dedup_policy.to_string(),
            if parents.is_empty() { "-".to_string() } else { parents }
        );
    }
}

/// Opens the store, ensures tables, resolves config (CLI overrides applied by caller)
fn open_store(db_path: &str) -> Result<(Arc<Mutex<rusqlite::Connection>>, IngestConfig)> {
    let mut conn = open_sqlite_connection(db_path)
        .with_context(|| format!("cannot open database {}", db_path))?;
    perf::install_sqlite_tracing(&mut conn);
    init_schema(&conn).context("cannot create tables")?;

    let conn = Arc::new(Mutex::new(conn));
    let config = ConfigManager::new(conn.clone()).load_ingest_config()?;
    Ok((conn, config))
}

fn apply_busy_timeout(conn: &Arc<Mutex<rusqlite::Connection>>, config: &IngestConfig) -> Result<()> {
    let guard = conn
        .lock()
        .map_err(|e| anyhow::anyhow!("database mutex poisoned: {}", e))?;
    configure_sqlite_connection(&guard, config.busy_timeout_ms)?;
    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl-C received, cancelling run");
                token.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { "info" });

    if let Command::Entities = cli.command {
        print_entities();
        return Ok(());
    }

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(db::default_db_path);
    info!(version = registry_ingest::VERSION, db = %db_path, "registry-ingest starting");

    let (conn, mut config) = open_store(&db_path)?;

    match cli.command {
        Command::InitDb => {
            let tables = registry::all().len();
            info!(db = %db_path, tables, "database ready");
        }
        Command::Load {
            entity,
            file,
            report,
            batch_size,
            channel_capacity,
        } => {
            let schema = registry::lookup(&entity)?;
            if let Some(n) = batch_size {
                config.batch_size = n;
            }
            if let Some(n) = channel_capacity {
                config.channel_capacity = n;
            }
            config.validate()?;
            apply_busy_timeout(&conn, &config)?;

            let pipeline = IngestPipeline::new(conn, config).with_cancellation(cancel_on_ctrl_c());
            let run = pipeline.ingest_file(schema.entity, &file).await?;
            if let Some(path) = report {
                write_json(&run, &path)?;
                info!(path = %path.display(), "report written");
            }
        }
        Command::Refresh { dir, report } => {
            apply_busy_timeout(&conn, &config)?;

            let pipeline = IngestPipeline::new(conn, config).with_cancellation(cancel_on_ctrl_c());
            let runs = pipeline.full_refresh(&dir).await?;
            if let Some(path) = report {
                write_json(&runs, &path)?;
                info!(path = %path.display(), "report written");
            }
        }
        Command::Entities => {}
    }

    Ok(())
}
