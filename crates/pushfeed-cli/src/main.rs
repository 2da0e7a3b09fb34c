//! pushfeed - Command-line tool for the pushfeed notification stream
//!
//! Watches a live feed or decodes a captured one.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{parse_header, Config, ConnectArgs};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "pushfeed")]
#[command(author, version, about = "Push notification feed client")]
#[command(propagate_version = true)]
struct Cli {
    /// Streaming endpoint URL
    #[arg(short, long, env = "PUSHFEED_URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "PUSHFEED_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (default: text)
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and print notifications until Ctrl+C
    Watch {
        /// Idle read timeout in milliseconds
        #[arg(long)]
        read_timeout_ms: Option<u64>,

        /// Connect timeout in milliseconds
        #[arg(long)]
        connect_timeout_ms: Option<u64>,

        /// Bearer token
        #[arg(long, env = "PUSHFEED_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Extra request header, as NAME:VALUE (repeatable)
        #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Decode a captured stream from a file or stdin
    Decode {
        /// Capture file (stdin when omitted)
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    let format = cli
        .output
        .or_else(|| config.output.as_deref().and_then(OutputFormat::from_name))
        .unwrap_or_default();
    let ctx = OutputContext::new(format, config.no_color(cli.no_color), cli.quiet);

    match cli.command {
        Commands::Watch {
            read_timeout_ms,
            connect_timeout_ms,
            token,
            headers,
        } => {
            let feed_config = config.feed_config(ConnectArgs {
                url: cli.url,
                read_timeout_ms,
                connect_timeout_ms,
                token,
                headers,
            })?;
            commands::watch(feed_config, &ctx).await?;
        }

        Commands::Decode { file } => {
            commands::decode(file.as_deref(), &ctx)?;
        }
    }

    Ok(())
}
