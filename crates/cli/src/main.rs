//! Doppel CLI: the main entry point.
//!
//! Commands:
//! - `init`    : Write a default config and sample persona data
//! - `serve`   : Start the HTTP chat server
//! - `chat`    : Interactive chat or single-message mode
//! - `history` : Print a stored conversation
//! - `doctor`  : Diagnose configuration and backends

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "doppel",
    about = "Doppel — a persona chat service that answers as you",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and a sample persona directory
    Init {
        /// Where to create the persona files (defaults to persona.data_dir)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Start the HTTP chat server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the persona
    Chat {
        /// Continue an existing conversation
        #[arg(short, long)]
        session: Option<String>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Print the stored turns of a conversation
    History {
        /// Conversation id
        id: String,

        /// Print raw JSON instead of a transcript
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and backends
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { data_dir } => commands::init::run(data_dir).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { session, message } => commands::chat::run(session, message).await?,
        Commands::History { id, json } => commands::history::run(id, json).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
