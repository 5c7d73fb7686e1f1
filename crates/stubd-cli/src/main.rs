//! # stubd CLI Entry Point
//!
//! Main binary for the stubd service-virtualization server. Provides a
//! command-line interface for running a server node and querying a running
//! server's status.
//!
//! ## Usage
//!
//! ```bash
//! # Start a server
//! stubd serve -b 0.0.0.0:8001
//!
//! # Start a server with a larger worker pool and an explicit host namespace
//! stubd serve -b 0.0.0.0:8001 -w 16 --host example.com
//!
//! # Query a running server's status (outputs raw JSON)
//! stubd status http://127.0.0.1:8001
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use argh::FromArgs;

use stubd_server::{AppState, HttpServer};

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// stubd - service-virtualization stub server
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Status(StatusArgs),
}

/// Arguments for running a stubd server.
///
/// The server front-end is a single-threaded async reactor; handlers run on
/// a bounded worker pool sized by `--workers`.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// run a stubd server
struct ServeArgs {
    /// address to bind the HTTP server to
    ///
    /// Defaults to "127.0.0.1:8001".
    #[argh(option, short = 'b', default = "\"127.0.0.1:8001\".into()")]
    bind: String,

    /// number of worker-pool slots for handler execution
    ///
    /// Bounds how many handlers run concurrently. Defaults to 8.
    #[argh(option, short = 'w', default = "8")]
    workers: usize,

    /// default host namespace for requests without a Host header
    #[argh(option, long = "host", default = "\"localhost\".into()")]
    host: String,
}

/// Arguments for querying a running server's status.
///
/// Prints the raw status envelope to stdout for unix tool usage (piping to
/// jq, etc.); no logging is initialized for this command.
#[derive(FromArgs)]
#[argh(subcommand, name = "status")]
/// query a running server's status
struct StatusArgs {
    /// base URL of the server, e.g. http://127.0.0.1:8001
    #[argh(positional)]
    server_url: String,
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    match cli.command {
        Commands::Serve(args) => {
            let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt().with_env_filter(env_filter).init();

            // Single-threaded reactor; handler work goes through the bounded
            // blocking pool.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .max_blocking_threads(args.workers)
                .build()?;
            runtime.block_on(run_serve(args))
        }
        Commands::Status(args) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_status(args))
        }
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let addr: SocketAddr = args
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", args.bind, e))?;

    tracing::info!("Starting stubd server");
    tracing::info!("Binding to: {}", addr);
    tracing::info!("Worker pool: {} slots", args.workers);
    tracing::info!("Default host namespace: {}", args.host);

    let state = Arc::new(AppState::in_memory(&args.host));
    let server = HttpServer::new(state, args.workers);
    server.run(addr).await?;
    Ok(())
}

async fn run_status(args: StatusArgs) -> Result<()> {
    if !args.server_url.starts_with("http://") && !args.server_url.starts_with("https://") {
        return Err(anyhow::anyhow!(
            "Invalid server URL: '{}' must start with http:// or https://",
            args.server_url
        ));
    }

    let url = format!("{}/api/get/status", args.server_url.trim_end_matches('/'));
    let response = reqwest::get(&url).await?;
    let payload: serde_json::Value = response.json().await?;

    println!("{}", serde_json::to_string(&payload)?);
    Ok(())
}
