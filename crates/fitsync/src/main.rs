use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fitsync::cli::commands;
use fitsync::error::format_user_error;

#[derive(Parser)]
#[command(name = "fitsync")]
#[command(
    author,
    version,
    about = "Sync fitness, health and coding activity into local CSV partitions",
    long_about = None
)]
#[command(after_help = "Sources are configured through the environment:\n  \
    GARMIN_ACCESS_TOKEN, GARMIN_DISPLAY_NAME, GARMIN_API_BASE_URL\n  \
    BODY_COMPOSITION_EXPORT\n  \
    GITHUB_USERNAME, GITHUB_TOKEN, GITHUB_API_BASE_URL\n  \
    FITSYNC_HTTP_TIMEOUT_SECS, FITSYNC_MIN_REQUEST_DELAY_MS")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory holding the partitions and run log
    #[arg(long, global = true, env = "FITSYNC_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch from every configured source and merge into storage
    Sync {
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,

        /// Fetch and count without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Show stored partitions
    Status,
    /// Show recent run log entries
    Log {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show record types, or the columns of one
    Schema {
        /// Record type id, e.g. running_activities
        record_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    fitsync::logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync { today, dry_run } => commands::sync_run(cli.data_dir, today, dry_run).await,
        Commands::Status => commands::show_status(cli.data_dir).await,
        Commands::Log { limit } => commands::show_log(cli.data_dir, limit).await,
        Commands::Schema { record_type } => commands::show_schema(record_type).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", format_user_error(&e));
            ExitCode::FAILURE
        }
    }
}
