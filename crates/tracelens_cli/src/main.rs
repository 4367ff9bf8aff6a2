//! TRACELENS CLI
//!
//! Loads a capture document and answers one query against it.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod document;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracelens_core::CaptureId;
use tracelens_path::Path;
use tracelens_resolve::{Context, Database, Environment, Request, Value, get};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tracelens")]
#[command(about = "TRACELENS - query values derived from recorded command streams", long_about = None)]
struct Cli {
    /// Capture document (JSON)
    #[arg(short, long)]
    capture: PathBuf,
    /// Configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print database statistics after the query
    #[arg(long)]
    stats: bool,
    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Summarize the capture
    Info,
    /// Show one command
    Command {
        /// Command index
        index: u64,
    },
    /// Show a named parameter of a command
    Parameter {
        /// Command index
        index: u64,
        /// Parameter name
        name: String,
    },
    /// Show the return value of a command
    Result {
        /// Command index
        index: u64,
    },
    /// Read memory as it is after a command
    Memory {
        /// Command index
        index: u64,
        /// Memory pool
        #[arg(long, default_value_t = 0)]
        pool: u32,
        /// First address (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_address)]
        address: u64,
        /// Number of bytes
        #[arg(long)]
        size: u64,
    },
    /// Show a resource as it is after a command
    Resource {
        /// Command index
        index: u64,
        /// Resource identifier
        id: u64,
    },
    /// List the Invoke boundaries of the capture
    Boundaries,
}

fn parse_address(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid address {:?}: {}", text, e))
}

/// Path addressed by `command`, or `None` for queries that are not paths
fn path_for(capture: CaptureId, command: &Commands) -> Option<Path> {
    let root = Path::capture(capture);
    let path = match command {
        Commands::Info => root,
        Commands::Command { index } => root.commands().index(*index),
        Commands::Parameter { index, name } => root.commands().index(*index).parameter(name.clone()),
        Commands::Result { index } => root.commands().index(*index).result(),
        Commands::Memory {
            index,
            pool,
            address,
            size,
        } => root.commands().index(*index).memory(*pool, *address, *size),
        Commands::Resource { index, id } => root.commands().index(*index).resource(*id),
        Commands::Boundaries => return None,
    };
    Some(path)
}

async fn query(ctx: &Context, capture: CaptureId, command: &Commands) -> tracelens_core::Result<Value> {
    match path_for(capture, command) {
        Some(path) => get(ctx, &path).await,
        None => ctx.build(Request::InvokeBoundaries { capture }).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tracelens=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = match &cli.config {
        Some(path) => document::load_config(path)?,
        None => document::CliConfig::default(),
    };
    let capture = document::load_capture(&cli.capture)?;

    let database = Database::with_config(
        config.database,
        Environment::default().with_config(config.resolve),
    );
    let id = database.add_capture(capture);

    let value = query(&database.context(), id, &cli.command).await?;
    println!("{}", value);

    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&database.stats())?);
    }

    database.shutdown();
    Ok(())
}
