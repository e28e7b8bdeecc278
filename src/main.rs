use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use tws_engine::cli;
use tws_engine::config;

#[derive(Parser)]
#[command(name = "tws", about = "TWS API wire-protocol engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a capture of length-prefixed frames and print the decoded events
    Decode {
        /// Capture file
        file: PathBuf,
        /// Server version to decode against
        #[arg(long, default_value = "176")]
        server_version: i32,
        /// Output events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Build a capture file from a text listing (one message per line, tokens separated by '|')
    Frame {
        /// Text listing
        input: PathBuf,
        /// Capture file to write
        output: PathBuf,
    },
    /// Show current configuration
    Config,
}

fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let var_dir = std::path::Path::new("var");
    if !var_dir.exists() {
        let _ = std::fs::create_dir_all(var_dir);
    }
    let file_appender = tracing_appender::rolling::daily("var", "tws.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    guard
}

fn main() -> Result<()> {
    let _guard = init_logging();
    config::load_env();

    let cli_args = Cli::parse();

    match cli_args.command {
        Commands::Decode {
            file,
            server_version,
            json,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_decode(&file, server_version, json))?;
        }

        Commands::Frame { input, output } => {
            cli::cmd_frame(&input, &output)?;
        }

        Commands::Config => {
            cli::cmd_config()?;
        }
    }

    Ok(())
}
