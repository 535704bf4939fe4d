//! archivist CLI entry point

use archivist::{
    commands::{
        cmd_index, cmd_query, cmd_status, cmd_sync, print_query_results, print_status,
        print_sync_report,
    },
    config::Config,
    error::Result,
    progress::LogWriterFactory,
    store::{QdrantStore, VectorIndex},
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io::Write;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "archivist")]
#[command(version, about = "Incremental document indexing and retrieval over Qdrant", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fully index a corpus directory (first-time population)
    Index {
        /// Path to the corpus root
        path: PathBuf,
    },

    /// Incrementally synchronize the index with a corpus directory
    Sync {
        /// Path to the corpus root
        path: PathBuf,

        /// Keep index records for documents removed from the corpus
        #[arg(long)]
        keep_removed: bool,
    },

    /// Query the index
    Query {
        /// The search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },

    /// Show index status
    Status,

    /// Manage the Qdrant collection
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Database management actions
#[derive(Subcommand)]
enum DbAction {
    /// Create the Qdrant collection if it does not exist
    Init,

    /// Show Qdrant collection status
    Status,

    /// Reset the collection (delete all vectors and recreate)
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Completions don't need config or a store
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "archivist", &mut std::io::stdout());
        return Ok(());
    }

    // Load configuration; violations abort before any corpus work
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    let store = QdrantStore::connect(&config).await?;

    match cli.command {
        Commands::Completions { .. } => unreachable!(),

        Commands::Index { path } => {
            let report = cmd_index(&config, &store, &path).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_sync_report(&report, false);
            }
        }

        Commands::Sync { path, keep_removed } => {
            if keep_removed {
                config.sync.prune_removed = false;
            }

            let report = cmd_sync(&config, &store, &path).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_sync_report(&report, true);
            }
        }

        Commands::Query { query, limit } => {
            let results = cmd_query(&config, &store, &query, limit).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_query_results(&query, &results);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Db { action } => match action {
            DbAction::Init => {
                store.ensure_collection().await?;
                println!("Collection '{}' is ready", config.collection_name);
            }
            DbAction::Status => {
                match store.get_collection_info().await? {
                    Some(info) => {
                        println!("Collection: {}", config.collection_name);
                        println!("Points: {}", info.points_count);
                        println!("Status: {}", info.status);
                    }
                    None => println!("Collection '{}' does not exist", config.collection_name),
                }
            }
            DbAction::Reset { yes } => {
                if !yes && !confirm(&format!(
                    "Delete all vectors in collection '{}'?",
                    config.collection_name
                ))? {
                    println!("Aborted");
                    return Ok(());
                }
                store.reset_collection().await?;
                println!("Collection '{}' reset", config.collection_name);
            }
        },
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
