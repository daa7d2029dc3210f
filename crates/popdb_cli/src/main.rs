//! popdb CLI
//!
//! Command-line access to a popdb ledger log.
//!
//! # Commands
//!
//! - `put` - Store a segment read from a file or stdin
//! - `get` - Print the segment stored under a link hash
//! - `find-segments` / `find-map-ids` - Run a filter query string
//! - `list-segments` / `list-maps` - List by process or map
//! - `invoke` - Call a contract function by name
//! - `inspect` - Display record counts for a ledger log

mod commands;

use clap::{Parser, Subcommand};
use popdb_core::BackendKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// popdb command-line ledger tools.
#[derive(Parser)]
#[command(name = "popdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the ledger log file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Storage layout (composite, document)
    #[arg(global = true, short, long, default_value = "composite")]
    backend: BackendKind,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a segment
    Put {
        /// Segment JSON file, or `-` for stdin
        file: PathBuf,
    },

    /// Print a segment by link hash
    Get {
        /// Hex link hash
        link_hash: String,
    },

    /// Find segments matching a filter query string
    FindSegments {
        /// Query string, e.g. `process=p&mapIds[]=m1&limit=10`
        #[arg(default_value = "")]
        query: String,
    },

    /// Find map ids matching a filter query string
    FindMapIds {
        /// Query string, e.g. `process=p&offset=20`
        #[arg(default_value = "")]
        query: String,
    },

    /// List map ids
    ListMaps {
        /// Only maps of this process
        #[arg(long)]
        process: Option<String>,
    },

    /// List segments
    ListSegments {
        /// Only segments of this process
        #[arg(long, conflicts_with = "map_id")]
        process: Option<String>,

        /// Only segments of this map
        #[arg(long)]
        map_id: Option<String>,
    },

    /// Call a contract function
    Invoke {
        /// Function name, e.g. `getSegment` or `GetMapIDs`
        function: String,

        /// Positional arguments
        args: Vec<String>,
    },

    /// Display record counts for a ledger log
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let backend = cli.backend;
    match cli.command {
        Commands::Put { file } => {
            let path = cli.path.ok_or("Ledger path required for put")?;
            commands::put::run(&path, backend, &file)?;
        }
        Commands::Get { link_hash } => {
            let path = cli.path.ok_or("Ledger path required for get")?;
            commands::get::run(&path, backend, &link_hash)?;
        }
        Commands::FindSegments { query } => {
            let path = cli.path.ok_or("Ledger path required for find-segments")?;
            commands::query::find_segments(&path, backend, &query)?;
        }
        Commands::FindMapIds { query } => {
            let path = cli.path.ok_or("Ledger path required for find-map-ids")?;
            commands::query::find_map_ids(&path, backend, &query)?;
        }
        Commands::ListMaps { process } => {
            let path = cli.path.ok_or("Ledger path required for list-maps")?;
            commands::query::list_maps(&path, backend, process.as_deref())?;
        }
        Commands::ListSegments { process, map_id } => {
            let path = cli.path.ok_or("Ledger path required for list-segments")?;
            commands::query::list_segments(&path, backend, process.as_deref(), map_id.as_deref())?;
        }
        Commands::Invoke { function, args } => {
            let path = cli.path.ok_or("Ledger path required for invoke")?;
            commands::invoke::run(&path, backend, &function, &args)?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Ledger path required for inspect")?;
            commands::inspect::run(&path, backend, &format)?;
        }
        Commands::Version => {
            println!("popdb CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("popdb Core v{}", popdb_core::VERSION);
        }
    }

    Ok(())
}
