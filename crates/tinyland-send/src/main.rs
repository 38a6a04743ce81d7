//! Tinyland test producer.
//!
//! Sends positional-update datagrams to a relay's ingest port, standing in
//! for the real producer during development.
//!
//! # Usage
//!
//! ```text
//! # One update
//! tinyland-send box1 120 340
//!
//! # Animate: 50 updates, 40 ms apart, moving 5 px right each time
//! tinyland-send box1 0 200 --repeat 50 --interval-ms 40 --step-x 5
//!
//! # An unknown kind (the relay drops it)
//! tinyland-send --kind circle dot 1 1
//!
//! # Anything at all, sent verbatim
//! tinyland-send --raw "rectangle/paddle1/100/200/20/40/"
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::{lookup_host, UdpSocket};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tinyland_core::{encode_datagram, PositionUpdate, ShapeKind, DEFAULT_INGEST_PORT, FIELD_DELIMITER};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Sends `kind/name/x/y` datagrams to a Tinyland relay.
#[derive(Debug, Parser)]
#[command(
    name = "tinyland-send",
    about = "Sends positional-update datagrams to a Tinyland relay",
    version
)]
struct Cli {
    /// Relay ingest address (`host:port`).
    #[arg(long, default_value_t = format!("127.0.0.1:{DEFAULT_INGEST_PORT}"), env = "TINYLAND_TARGET")]
    target: String,

    /// Shape kind.  Anything other than `rectangle` is sent as-is and will be
    /// dropped by the relay.
    #[arg(long, default_value = "rectangle")]
    kind: String,

    /// Name of the thing being moved.
    #[arg(required_unless_present = "raw")]
    name: Option<String>,

    /// Horizontal position.
    #[arg(required_unless_present = "raw", allow_hyphen_values = true)]
    x: Option<String>,

    /// Vertical position.
    #[arg(required_unless_present = "raw", allow_hyphen_values = true)]
    y: Option<String>,

    /// Number of datagrams to send.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    repeat: u32,

    /// Pause between datagrams, in milliseconds.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Added to `x` on each repetition (`x` must then be numeric).
    #[arg(long, allow_hyphen_values = true)]
    step_x: Option<f64>,

    /// Added to `y` on each repetition (`y` must then be numeric).
    #[arg(long, allow_hyphen_values = true)]
    step_y: Option<f64>,

    /// Send this payload verbatim instead of building one.
    #[arg(long, conflicts_with_all = ["name", "x", "y"])]
    raw: Option<String>,
}

impl Cli {
    /// Builds the payload for repetition `index` (0-based).
    ///
    /// # Errors
    ///
    /// Returns an error if a step is given for a non-numeric coordinate, or
    /// if a field contains the `/` delimiter.
    fn payload(&self, index: u32) -> anyhow::Result<String> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }

        // clap guarantees these are present when --raw is absent.
        let (Some(name), Some(x), Some(y)) = (&self.name, &self.x, &self.y) else {
            anyhow::bail!("name, x and y are required without --raw");
        };
        let x = coordinate("x", x, self.step_x, index)?;
        let y = coordinate("y", y, self.step_y, index)?;

        match self.kind.parse::<ShapeKind>() {
            Ok(kind) => {
                let update = PositionUpdate {
                    kind,
                    name: name.clone(),
                    x,
                    y,
                };
                encode_datagram(&update).context("cannot encode update")
            }
            Err(_) => Ok([self.kind.as_str(), name.as_str(), x.as_str(), y.as_str()]
                .join(FIELD_DELIMITER.to_string().as_str())),
        }
    }
}

/// Returns `base` advanced by `step * index`, or `base` unchanged without a
/// step.
fn coordinate(label: &str, base: &str, step: Option<f64>, index: u32) -> anyhow::Result<String> {
    let Some(step) = step else {
        return Ok(base.to_string());
    };
    let start: f64 = base
        .parse()
        .with_context(|| format!("--step-{label} needs a numeric {label}, got '{base}'"))?;
    Ok((start + step * f64::from(index)).to_string())
}

/// Sends every repetition to `target`, pausing between datagrams.
///
/// Returns the number of datagrams sent.
async fn send_all(socket: &UdpSocket, target: SocketAddr, cli: &Cli) -> anyhow::Result<u32> {
    let interval = Duration::from_millis(cli.interval_ms);

    for index in 0..cli.repeat {
        let payload = cli.payload(index)?;
        socket
            .send_to(payload.as_bytes(), target)
            .await
            .with_context(|| format!("failed to send to {target}"))?;
        info!("sent '{payload}' to {target}");

        if index + 1 < cli.repeat {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(cli.repeat)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.raw.is_none() && cli.kind.parse::<ShapeKind>().is_err() {
        warn!("kind '{}' is not recognised; the relay will drop these datagrams", cli.kind);
    }

    let target = lookup_host(&cli.target)
        .await
        .with_context(|| format!("cannot resolve target '{}'", cli.target))?
        .next()
        .with_context(|| format!("target '{}' resolved to no address", cli.target))?;

    let local: SocketAddr = if target.is_ipv4() {
        "0.0.0.0:0".parse()?
    } else {
        "[::]:0".parse()?
    };
    let socket = UdpSocket::bind(local)
        .await
        .context("failed to bind local UDP socket")?;

    let sent = send_all(&socket, target, &cli).await?;
    info!("done: {sent} datagram(s) sent");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tinyland_core::parse_datagram;

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["tinyland-send", "box1", "1", "2"]);

        // Assert
        assert_eq!(cli.target, "127.0.0.1:20001");
        assert_eq!(cli.kind, "rectangle");
        assert_eq!(cli.repeat, 1);
        assert_eq!(cli.interval_ms, 100);
    }

    #[test]
    fn test_cli_requires_position_without_raw() {
        let result = Cli::try_parse_from(["tinyland-send", "box1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_raw_conflicts_with_position() {
        let result = Cli::try_parse_from(["tinyland-send", "--raw", "a/b/c/d", "box1", "1", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_zero_repeat() {
        let result = Cli::try_parse_from(["tinyland-send", "--repeat", "0", "box1", "1", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_accepts_negative_coordinates() {
        let cli = Cli::parse_from(["tinyland-send", "box1", "-5", "-10"]);
        assert_eq!(cli.x.as_deref(), Some("-5"));
        assert_eq!(cli.y.as_deref(), Some("-10"));
    }

    #[test]
    fn test_payload_is_accepted_by_parser() {
        // Arrange
        let cli = Cli::parse_from(["tinyland-send", "box1", "120", "340"]);

        // Act
        let payload = cli.payload(0).unwrap();

        // Assert
        assert_eq!(payload, "rectangle/box1/120/340");
        assert_eq!(
            parse_datagram(payload.as_bytes()).unwrap(),
            PositionUpdate::rectangle("box1", "120", "340")
        );
    }

    #[test]
    fn test_payload_steps_coordinates() {
        let cli = Cli::parse_from([
            "tinyland-send",
            "--step-x",
            "5",
            "--step-y",
            "-2.5",
            "box1",
            "0",
            "10",
        ]);

        assert_eq!(cli.payload(0).unwrap(), "rectangle/box1/0/10");
        assert_eq!(cli.payload(2).unwrap(), "rectangle/box1/10/5");
    }

    #[test]
    fn test_step_on_non_numeric_coordinate_fails() {
        let cli = Cli::parse_from(["tinyland-send", "--step-x", "1", "box1", "left", "0"]);
        assert!(cli.payload(0).is_err());
    }

    #[test]
    fn test_unknown_kind_is_sent_as_is() {
        let cli = Cli::parse_from(["tinyland-send", "--kind", "circle", "dot", "1", "1"]);
        assert_eq!(cli.payload(0).unwrap(), "circle/dot/1/1");
    }

    #[test]
    fn test_name_with_delimiter_fails() {
        let cli = Cli::parse_from(["tinyland-send", "a/b", "1", "1"]);
        assert!(cli.payload(0).is_err());
    }

    #[test]
    fn test_raw_payload_is_verbatim() {
        let cli = Cli::parse_from(["tinyland-send", "--raw", "rectangle/paddle1/100/200/20/40/"]);
        assert_eq!(cli.payload(3).unwrap(), "rectangle/paddle1/100/200/20/40/");
    }

    #[tokio::test]
    async fn test_send_all_delivers_each_repetition() {
        // Arrange: a local receiver stands in for the relay
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let cli = Cli::parse_from([
            "tinyland-send",
            "--repeat",
            "3",
            "--interval-ms",
            "1",
            "--step-x",
            "1",
            "box1",
            "0",
            "0",
        ]);

        // Act
        let sent = send_all(&sender, target, &cli).await.unwrap();

        // Assert
        assert_eq!(sent, 3);
        let mut buf = [0u8; 64];
        for expected in ["rectangle/box1/0/0", "rectangle/box1/1/0", "rectangle/box1/2/0"] {
            let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], expected.as_bytes());
        }
    }
}
