mod config;
mod serve;
mod telemetry;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use actlog_core::Status;

use crate::config::{AppConfig, DEFAULT_PORT};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Per-user activity records with a status lifecycle.
#[derive(Parser)]
#[command(name = "actlog", version, about = "Per-user activity record service")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the activity record HTTP API server
    Serve {
        /// Port to listen on (overrides the config file; default 8080)
        #[arg(long)]
        port: Option<u16>,
        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },

    /// Print the status transition table
    Transitions,
}

fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json, cli.quiet);

    match cli.command {
        Commands::Serve {
            port,
            config,
            tls_cert,
            tls_key,
        } => {
            // Validate TLS flags: both must be provided or neither
            if tls_cert.is_some() != tls_key.is_some() {
                eprintln!("error: --tls-cert and --tls-key must both be provided");
                process::exit(1);
            }
            if tls_cert.is_some() && !cfg!(feature = "tls") {
                eprintln!(
                    "error: TLS requested but actlog was built without the `tls` feature; \
                     rebuild with --features tls"
                );
                process::exit(1);
            }
            let config = match AppConfig::load(config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            };
            let port = port.or(config.server.port).unwrap_or(DEFAULT_PORT);
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("error: failed to create tokio runtime: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(config, port, tls_cert, tls_key)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Transitions => {
            cmd_transitions(cli.output);
        }
    }
}

fn cmd_transitions(output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let table: Vec<serde_json::Value> = Status::ALL
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "status": s,
                        "label": s.label(),
                        "allowed_next": s.allowed_next(),
                    })
                })
                .collect();
            match serde_json::to_string_pretty(&table) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            }
        }
        OutputFormat::Text => {
            for s in Status::ALL {
                let next: Vec<&str> = s.allowed_next().iter().map(|n| n.as_str()).collect();
                let next = if next.is_empty() {
                    "(terminal)".to_string()
                } else {
                    next.join(", ")
                };
                println!("{:<12} {:<12} -> {}", s.as_str(), s.label(), next);
            }
        }
    }
}
