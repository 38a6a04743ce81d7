//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! It is built from CLI arguments merged with an optional TOML file, or from
//! [`Default`] in tests and local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tinyland_core::{DEFAULT_HTTP_PORT, DEFAULT_INGEST_PORT};

/// Default number of events buffered per browser before that browser starts
/// missing updates.
pub const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 64;

/// Default interval between summaries of dropped malformed datagrams.
pub const DEFAULT_MALFORMED_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// All runtime configuration for the relay.
///
/// Build this once at startup and pass it by value to
/// `RelayServer::bind`, which hands each listener the fields it needs.
///
/// # Example
///
/// ```rust
/// use tinyland_relay::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.ingest_bind_addr.port(), 20001);
/// assert_eq!(cfg.http_bind_addr.port(), 3000);
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the UDP ingest socket binds to.
    ///
    /// Producers are not authenticated, so `0.0.0.0` accepts updates from any
    /// host that can reach the port.
    pub ingest_bind_addr: SocketAddr,

    /// Address the HTTP/WebSocket listener binds to.
    pub http_bind_addr: SocketAddr,

    /// Capacity of each browser's outbound event queue.
    ///
    /// When a browser cannot keep up and its queue is full, new events are
    /// dropped for that browser only.  Ingestion never waits on a browser.
    pub session_queue_capacity: usize,

    /// File served for `GET /`.  `None` serves the embedded default page.
    pub index_path: Option<PathBuf>,

    /// Minimum time between `warn`-level summaries of rejected datagrams.
    pub malformed_report_interval: Duration,
}

impl Default for RelayConfig {
    /// | Field                      | Default          |
    /// |----------------------------|------------------|
    /// | ingest_bind_addr           | `0.0.0.0:20001`  |
    /// | http_bind_addr             | `0.0.0.0:3000`   |
    /// | session_queue_capacity     | 64               |
    /// | index_path                 | embedded page    |
    /// | malformed_report_interval  | 10 seconds       |
    fn default() -> Self {
        Self {
            ingest_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_INGEST_PORT)),
            http_bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
            session_queue_capacity: DEFAULT_SESSION_QUEUE_CAPACITY,
            index_path: None,
            malformed_report_interval: DEFAULT_MALFORMED_REPORT_INTERVAL,
        }
    }
}

impl RelayConfig {
    /// Configuration for tests: both listeners on loopback with OS-assigned
    /// ports.
    pub fn ephemeral() -> Self {
        Self {
            ingest_bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            http_bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Self::default()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ingest_port_is_20001() {
        // Arrange / Act
        let cfg = RelayConfig::default();
        // Assert
        assert_eq!(cfg.ingest_bind_addr.port(), 20001);
    }

    #[test]
    fn test_default_http_port_is_3000() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.http_bind_addr.port(), 3000);
    }

    #[test]
    fn test_default_binds_all_interfaces() {
        let cfg = RelayConfig::default();
        assert!(cfg.ingest_bind_addr.ip().is_unspecified());
        assert!(cfg.http_bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_queue_capacity() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.session_queue_capacity, 64);
    }

    #[test]
    fn test_default_serves_embedded_page() {
        assert!(RelayConfig::default().index_path.is_none());
    }

    #[test]
    fn test_ephemeral_uses_loopback_port_zero() {
        let cfg = RelayConfig::ephemeral();
        assert!(cfg.ingest_bind_addr.ip().is_loopback());
        assert_eq!(cfg.ingest_bind_addr.port(), 0);
        assert_eq!(cfg.http_bind_addr.port(), 0);
        assert_eq!(cfg.session_queue_capacity, DEFAULT_SESSION_QUEUE_CAPACITY);
    }
}
