//! Tinyland relay — entry point.
//!
//! This binary receives positional updates from a producer over UDP and
//! pushes them to every connected browser over WebSocket.  It also serves
//! the presentation page that renders those updates.
//!
//! # Usage
//!
//! ```text
//! tinyland-relay [OPTIONS]
//!
//! Options:
//!   --ingest-port    <PORT>  UDP port for producer datagrams [default: 20001]
//!   --ingest-bind    <IP>    Address for the UDP socket [default: 0.0.0.0]
//!   --http-port      <PORT>  Port for the page and WebSocket [default: 3000]
//!   --http-bind      <IP>    Address for the HTTP listener [default: 0.0.0.0]
//!   --queue-capacity <N>     Events buffered per browser [default: 64]
//!   --index          <FILE>  Serve this file instead of the built-in page
//!   --malformed-report-secs <SECS>  Interval between reject summaries [default: 10]
//!   --config         <FILE>  Optional TOML configuration file
//! ```
//!
//! # Environment variable overrides
//!
//! Every flag can also be set with an environment variable.  CLI args take
//! precedence when both are present.
//!
//! | Variable                   | Flag               |
//! |----------------------------|--------------------|
//! | `TINYLAND_INGEST_PORT`     | `--ingest-port`    |
//! | `TINYLAND_INGEST_BIND`     | `--ingest-bind`    |
//! | `TINYLAND_HTTP_PORT`       | `--http-port`      |
//! | `TINYLAND_HTTP_BIND`       | `--http-bind`      |
//! | `TINYLAND_QUEUE_CAPACITY`  | `--queue-capacity` |
//! | `TINYLAND_INDEX`           | `--index`          |
//! | `TINYLAND_CONFIG`          | `--config`         |
//!
//! # Precedence
//!
//! flag / environment variable  >  config file  >  built-in default

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tinyland_relay::domain::RelayConfig;
use tinyland_relay::infrastructure::{load_config, run_server, FileConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Tinyland relay.
///
/// Forwards `kind/name/x/y` datagrams from a producer to every connected
/// browser as `update-thing` events.
///
/// Options are `Option`s so that "not given" can be told apart from "given
/// with the default value"; only then can the config file fill the gaps.
#[derive(Debug, Default, Parser)]
#[command(
    name = "tinyland-relay",
    about = "Relays positional updates from UDP to browsers over WebSocket",
    version
)]
struct Cli {
    /// UDP port producers send datagrams to.
    #[arg(long, env = "TINYLAND_INGEST_PORT")]
    ingest_port: Option<u16>,

    /// IP address to bind the UDP ingest socket to.
    ///
    /// Producers are not authenticated.  Use `127.0.0.1` to accept updates
    /// only from this machine.
    #[arg(long, env = "TINYLAND_INGEST_BIND")]
    ingest_bind: Option<String>,

    /// TCP port serving the page and the WebSocket.
    #[arg(long, env = "TINYLAND_HTTP_PORT")]
    http_port: Option<u16>,

    /// IP address to bind the HTTP/WebSocket listener to.
    #[arg(long, env = "TINYLAND_HTTP_BIND")]
    http_bind: Option<String>,

    /// Events buffered per browser before that browser starts missing updates.
    #[arg(long, env = "TINYLAND_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// HTML file to serve at `/` instead of the built-in page.
    #[arg(long, env = "TINYLAND_INDEX")]
    index: Option<PathBuf>,

    /// Seconds between warn-level summaries of rejected datagrams.
    #[arg(long)]
    malformed_report_secs: Option<u64>,

    /// Optional TOML configuration file.
    #[arg(long, env = "TINYLAND_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merges the CLI arguments over `file` into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if a bind address is not a valid IP address.
    fn into_relay_config(self, file: FileConfig) -> anyhow::Result<RelayConfig> {
        let defaults = RelayConfig::default();
        let relay = file.relay;

        let ingest_bind_addr = bind_addr(
            "ingest",
            self.ingest_bind.or(relay.ingest_bind),
            self.ingest_port.or(relay.ingest_port),
            defaults.ingest_bind_addr,
        )?;
        let http_bind_addr = bind_addr(
            "HTTP",
            self.http_bind.or(relay.http_bind),
            self.http_port.or(relay.http_port),
            defaults.http_bind_addr,
        )?;

        Ok(RelayConfig {
            ingest_bind_addr,
            http_bind_addr,
            session_queue_capacity: self
                .queue_capacity
                .or(relay.queue_capacity)
                .unwrap_or(defaults.session_queue_capacity),
            index_path: self.index.or(relay.index),
            malformed_report_interval: self
                .malformed_report_secs
                .or(relay.malformed_report_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.malformed_report_interval),
        })
    }
}

/// Combines an optional IP and port with the default socket address.
fn bind_addr(
    label: &str,
    ip: Option<String>,
    port: Option<u16>,
    default: SocketAddr,
) -> anyhow::Result<SocketAddr> {
    let ip = match ip {
        Some(text) => text
            .parse::<IpAddr>()
            .with_context(|| format!("invalid {label} bind address: '{text}'"))?,
        None => default.ip(),
    };
    Ok(SocketAddr::new(ip, port.unwrap_or(default.port())))
}

/// Builds the log filter: `RUST_LOG`, then the config file, then `info`.
fn log_filter(file_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(file_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and the config file (if any) is loaded.
/// 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins over the file's
///    `log_level`.
/// 3. [`run`] starts the relay.  Any error that ends it, such as a port
///    already in use, is logged once and turned into a non-zero exit code.
#[tokio::main]
async fn main() -> ExitCode {
    let mut cli = Cli::parse();

    let file = cli
        .config
        .take()
        .map(|path| {
            load_config(&path)
                .with_context(|| format!("failed to load config file {}", path.display()))
        })
        .transpose();

    let file_level = match &file {
        Ok(Some(file)) => file.log_level.as_deref(),
        _ => None,
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(file_level))
        .init();

    let result = match file {
        Ok(file) => run(cli, file.unwrap_or_default()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("tinyland relay failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Builds the configuration, installs the Ctrl+C handler and runs the
/// server until shutdown.
///
/// # Errors
///
/// Returns an error for an invalid bind address or if either listener
/// cannot be bound.
async fn run(cli: Cli, file: FileConfig) -> anyhow::Result<()> {
    let config = cli.into_relay_config(file)?;

    info!(
        "tinyland relay starting — ingest=udp://{}, http={}",
        config.ingest_bind_addr, config.http_bind_addr
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    //
    // The ingest loop and the HTTP server both check this flag every 200 ms.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("tinyland relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
