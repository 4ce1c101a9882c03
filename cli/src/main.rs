// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Agent Dispatch CLI
//!
//! The `dispatch` binary serves the dispatch pipeline over HTTP or runs it
//! once from the command line.
//!
//! ## Commands
//!
//! - `dispatch serve` - HTTP server (`POST /query`, `GET /agents`, `GET /health`)
//! - `dispatch query <MESSAGE>` - Run one request and print the JSON response
//! - `dispatch agents` - List the agent registry
//! - `dispatch config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use agent_dispatch::commands::{self, ConfigCommand};
use agent_dispatch::server;
use dispatch_core::domain::dispatch_config::DispatchConfigManifest;

/// Agent Dispatch - route requests to the agents that can answer them
#[derive(Parser)]
#[command(name = "dispatch")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "DISPATCH_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "DISPATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format; defaults to the configured format
    #[arg(long, global = true, value_enum, env = "DISPATCH_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    #[command(name = "serve")]
    Serve {
        /// Bind address (default: network.bind_address)
        #[arg(long, env = "DISPATCH_HOST")]
        host: Option<String>,

        /// HTTP port (default: network.port)
        #[arg(long, env = "DISPATCH_PORT")]
        port: Option<u16>,
    },

    /// Run a single request and print the response
    #[command(name = "query")]
    Query {
        /// Request text
        #[arg(value_name = "MESSAGE")]
        message: String,

        /// Session whose conversation memory the request joins
        #[arg(long)]
        session: Option<String>,
    },

    /// List registered agents
    #[command(name = "agents")]
    Agents,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        eprintln!("{}", "No command specified. Use --help for usage.".yellow());
        std::process::exit(1);
    };

    // config subcommands load (or write) configuration themselves
    if let Commands::Config { command } = command {
        init_logging(cli.log_level.as_deref().unwrap_or("warn"), cli.log_format.unwrap_or(LogFormat::Text))?;
        return commands::config::handle_command(command, cli.config).await;
    }

    let config = DispatchConfigManifest::load_or_default(cli.config.clone())
        .context("Failed to load configuration")?;

    let logging = config
        .spec
        .observability
        .as_ref()
        .and_then(|o| o.logging.as_ref());
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.map(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let format = cli.log_format.unwrap_or(match logging.map(|l| l.format.as_str()) {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, format)?;

    config
        .validate()
        .context("Configuration validation failed")?;

    match command {
        Commands::Serve { host, port } => server::start_server(config, host, port).await,
        Commands::Query { message, session } => {
            commands::query::run(&config, &message, session.as_deref()).await
        }
        Commands::Agents => commands::agents::list(&config),
        Commands::Config { .. } => Ok(()),
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}
