use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use sheet_ingest::config::Config;
use sheet_ingest::jobs::Ingestor;
use sheet_ingest::jobs::RunSummary;
use sheet_ingest::storage::open_store;
use sheet_ingest::storage::BlobStore;
use sheet_ingest::storage::LocalBlobStore;
use sheet_ingest::IngestError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheet-ingest")]
#[command(about = "Extract tables from property management report workbooks", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Storage root directory or file:// URL, overrides the configuration
    #[arg(long, short = 's')]
    store: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract tenancies and charges from tenancy schedules
    Tenancy {
        /// Glob pattern of workbook paths in the store
        pattern: String,
    },

    /// Extract debtor rows from aged debtor reports
    Arrears {
        /// Glob pattern of workbook paths in the store
        pattern: String,
    },

    /// Dump every sheet of multi-sheet report exports
    Report {
        /// Glob pattern of workbook paths in the store
        pattern: String,
    },

    /// Convert lease expiry diary exports and remove the source files
    Diary {
        /// Glob pattern of diary export paths in the store
        pattern: String,
    },

    /// List workbook paths matching a pattern
    List {
        /// Glob pattern of blob paths in the store
        pattern: String,
    },
}

type Job = fn(&Ingestor<LocalBlobStore>, &str) -> Result<RunSummary, IngestError>;

fn report(summary: &RunSummary) {
    info!(
        workbook = %summary.workbook,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Workbook done"
    );
    for failure in &summary.failures {
        info!(workbook = %summary.workbook, "Failed sheet: {}", failure);
    }
    for (path, rows) in &summary.written {
        info!(rows, "Wrote {}", path);
    }
}

/// Runs a job over every matching workbook. Returns the number of workbooks
/// that could not be processed.
fn run(ingestor: &Ingestor<LocalBlobStore>, pattern: &str, job: Job) -> Result<usize> {
    let paths = ingestor
        .store()
        .list(pattern)
        .with_context(|| format!("Failed to list '{}'", pattern))?;
    if paths.is_empty() {
        info!(pattern, "No workbook matches");
    }
    let mut failed = 0;
    for path in &paths {
        match job(ingestor, path) {
            Ok(summary) => report(&summary),
            Err(e) => {
                error!(workbook = %path, error = %e, "Workbook failed");
                failed += 1;
            }
        }
    }
    info!(workbooks = paths.len(), failed, "Run complete");
    Ok(failed)
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_store_override(cli.store);
    let store = open_store(&config.storage.root)
        .with_context(|| format!("Failed to open store '{}'", config.storage.root))?;
    let ingestor = Ingestor::new(store, config).context("Invalid configuration")?;

    let failed = match &cli.command {
        Command::Tenancy { pattern } => run(&ingestor, pattern, Ingestor::tenancy_schedule)?,
        Command::Arrears { pattern } => run(&ingestor, pattern, Ingestor::arrears)?,
        Command::Report { pattern } => run(&ingestor, pattern, Ingestor::excel_report)?,
        Command::Diary { pattern } => run(&ingestor, pattern, Ingestor::lease_expiry_diary)?,
        Command::List { pattern } => {
            for path in ingestor.store().list(pattern)? {
                println!("{}", path);
            }
            0
        }
    };
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
