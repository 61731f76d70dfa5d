//! Notegraph CLI entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "notegraph")]
#[command(about = "Live-reloading markdown note server with a wiki-link graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the note server
    Serve {
        /// Notes directory (defaults to ~/notes)
        #[arg(long, env = "NOTES_DIR")]
        notes_dir: Option<PathBuf>,

        /// Note shown at `/`
        #[arg(long, env = "DEFAULT_NOTE", default_value = notegraph_core::DEFAULT_NOTE)]
        default_note: String,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "5000")]
        port: u16,

        /// Host to bind to
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,

        /// Resolve links and notes outside the notes directory
        #[arg(long, env = "ALLOW_ALL_PATHS", value_parser = clap::builder::BoolishValueParser::new())]
        allow_all_paths: bool,

        /// Comma-separated notes (names or globs) to leave out of the graph
        #[arg(long, env = "GRAPH_EXCLUDE", default_value = "")]
        graph_exclude: String,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("notegraph={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve {
            notes_dir,
            default_note,
            port,
            host,
            allow_all_paths,
            graph_exclude,
        } => {
            tracing::info!("Notegraph v{}", env!("CARGO_PKG_VERSION"));
            let notes_dir = match notes_dir {
                Some(dir) => dir,
                None => commands::default_notes_dir()?,
            };
            let config = notegraph_core::NotesConfig::new(notes_dir)
                .with_default_note(default_note)
                .with_allow_all_paths(allow_all_paths)
                .with_graph_exclude(notegraph_core::parse_exclude_list(&graph_exclude));
            commands::serve(config, notegraph_server::ServerConfig { host, port }).await
        }
        Commands::Version => {
            println!("Notegraph v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
