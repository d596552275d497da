//! Bookshare CLI - inspect a saved library snapshot

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate a listing limit (must be at least 1)
fn parse_limit(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("limit must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "bookshare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display counts for a library snapshot
    Info {
        /// Snapshot file path (library.json)
        snapshot: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a library snapshot for broken invariants
    Validate {
        /// Snapshot file path (library.json)
        snapshot: String,

        /// Also reject snapshots written by an older format version
        #[arg(long)]
        strict: bool,
    },

    /// Rank listed books by rating and recency
    Trending {
        /// Snapshot file path (library.json)
        snapshot: String,

        /// Number of books to show
        #[arg(short, long, default_value = "10", value_parser = parse_limit)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recommend books for one reader
    Recommend {
        /// Snapshot file path (library.json)
        snapshot: String,

        /// Principal to recommend for
        #[arg(short, long)]
        user: String,

        /// Number of books to show
        #[arg(short, long, default_value = "10", value_parser = parse_limit)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "bookshare_cli=debug,bookshare_core=debug"
    } else {
        "bookshare_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Info { snapshot, json } => commands::info(&snapshot, json).await,

        Commands::Validate { snapshot, strict } => commands::validate(&snapshot, strict).await,

        Commands::Trending {
            snapshot,
            limit,
            json,
        } => commands::trending(&snapshot, limit, json).await,

        Commands::Recommend {
            snapshot,
            user,
            limit,
            json,
        } => commands::recommend(&snapshot, &user, limit, json).await,
    }
}
