//! UDP ingest listener.
//!
//! The relay binds one UDP socket on the ingest port (default 20001) and
//! accepts datagrams from any sender.  Each datagram is parsed with
//! [`tinyland_core::parse_datagram`]; accepted updates are published to the
//! [`EventSink`] (the broadcast hub), rejected ones are dropped.
//!
//! Producers never hear back: there is no acknowledgement for a good
//! datagram and no error for a bad one.
//!
//! # Ordering
//!
//! A single task receives and publishes datagrams one at a time, so the hub
//! sees updates in the order the socket delivered them.  Publishing never
//! waits on a browser (see [`crate::application::hub`]), so the next
//! datagram is read as soon as the previous one has been queued.
//!
//! # Read timeout
//!
//! Each `recv_from` is wrapped in a 200 ms timeout.  On each timeout the
//! loop checks the `running` flag and exits cleanly if the relay is shutting
//! down.  An idle producer is not an error.
//!
//! # Rejected datagrams
//!
//! A misbehaving producer can send thousands of bad datagrams per second, so
//! rejections are logged at `debug` individually and summarised at `warn` at
//! most once per report interval.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use tinyland_core::parse_datagram;

use crate::application::hub::{DeliveryReport, EventSink};
use crate::domain::config::DEFAULT_MALFORMED_REPORT_INTERVAL;

/// Largest payload a UDP datagram can carry.
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// How long a single receive waits before re-checking the shutdown flag.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Error type for ingest listener operations.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The UDP socket could not be bound.
    #[error("failed to bind ingest socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The bound socket could not report its local address.
    #[error("failed to read ingest socket address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A bound ingest socket, ready to [`run`](IngestListener::run).
pub struct IngestListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
    report_interval: Duration,
}

impl IngestListener {
    /// Binds the ingest socket on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::BindFailed`] if the port is in use or the
    /// process lacks permission.  There is no fallback port.
    pub async fn bind(addr: SocketAddr) -> Result<Self, IngestError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| IngestError::BindFailed { addr, source })?;
        let local_addr = socket.local_addr().map_err(IngestError::LocalAddr)?;

        Ok(Self {
            socket,
            local_addr,
            report_interval: DEFAULT_MALFORMED_REPORT_INTERVAL,
        })
    }

    /// Sets how often rejected datagrams are summarised at `warn` level.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// The address the socket is actually bound to (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Receives datagrams until `running` is cleared, publishing every
    /// accepted update to `sink`.
    ///
    /// Receive errors are logged and the loop continues; nothing that
    /// arrives on the socket can stop the listener.
    pub async fn run(self, sink: Arc<dyn EventSink>, running: Arc<AtomicBool>) {
        info!("ingest listening on UDP {}", self.local_addr);

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut rejects = RejectLog::new(self.report_interval, Instant::now());

        while running.load(Ordering::Relaxed) {
            let (len, src) = match timeout(RECV_POLL_INTERVAL, self.socket.recv_from(&mut buf)).await
            {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => {
                    // e.g. ICMP port-unreachable surfacing as ConnectionReset
                    // on some platforms.  The socket is still usable.
                    warn!("ingest recv error: {e}");
                    continue;
                }
                Err(_) => continue,
            };

            handle_datagram(&buf[..len], src, sink.as_ref(), &mut rejects, Instant::now());
        }

        info!("ingest listener stopped");
    }
}

/// Parses one datagram and publishes it if it is well-formed.
///
/// Returns the delivery report for accepted datagrams, `None` for rejected
/// ones.
fn handle_datagram(
    payload: &[u8],
    src: SocketAddr,
    sink: &dyn EventSink,
    rejects: &mut RejectLog,
    now: Instant,
) -> Option<DeliveryReport> {
    match parse_datagram(payload) {
        Ok(update) => {
            trace!(
                "update from {src}: {} '{}' ({}, {})",
                update.kind, update.name, update.x, update.y
            );
            let report = sink.publish(update);
            if report.lagged > 0 || report.closed > 0 {
                debug!(
                    "broadcast: {} delivered, {} lagged, {} closed",
                    report.delivered, report.lagged, report.closed
                );
            }
            Some(report)
        }
        Err(e) => {
            debug!("dropped datagram from {src} ({len} bytes): {e}", len = payload.len());
            if let Some(count) = rejects.record(now) {
                warn!(
                    "dropped {count} malformed datagram(s) in the last {:?}; latest from {src}: {e}",
                    rejects.interval
                );
            }
            None
        }
    }
}

/// Rate limiter for the rejected-datagram summary.
#[derive(Debug)]
struct RejectLog {
    interval: Duration,
    window_start: Instant,
    count: u64,
}

impl RejectLog {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            window_start: now,
            count: 0,
        }
    }

    /// Counts one rejection.  Returns the number of rejections to report
    /// when the current window has elapsed, and starts a new window.
    fn record(&mut self, now: Instant) -> Option<u64> {
        self.count += 1;
        if now.duration_since(self.window_start) < self.interval {
            return None;
        }
        let count = self.count;
        self.count = 0;
        self.window_start = now;
        Some(count)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
