//! Optional TOML configuration file.
//!
//! Every key is optional.  A key missing from the file falls back to the CLI
//! flag or environment variable, and then to the built-in default.  Example:
//!
//! ```toml
//! log_level = "debug"
//!
//! [relay]
//! ingest_port = 20001
//! ingest_bind = "0.0.0.0"
//! http_port = 3000
//! http_bind = "127.0.0.1"
//! queue_capacity = 128
//! index = "/srv/tinyland/index.html"
//! malformed_report_secs = 30
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// `tracing` filter used when `RUST_LOG` is not set (e.g. `"info"`,
    /// `"tinyland_relay=debug"`).
    #[serde(default)]
    pub log_level: Option<String>,

    /// Listener and delivery settings.
    #[serde(default)]
    pub relay: RelaySection,
}

/// The `[relay]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    /// UDP port producers send datagrams to.
    pub ingest_port: Option<u16>,
    /// IP address the ingest socket binds to.
    pub ingest_bind: Option<String>,
    /// TCP port for the page and WebSocket.
    pub http_port: Option<u16>,
    /// IP address the HTTP/WebSocket listener binds to.
    pub http_bind: Option<String>,
    /// Per-browser event queue capacity.
    pub queue_capacity: Option<usize>,
    /// File served for `GET /`.
    pub index: Option<PathBuf>,
    /// Seconds between summaries of rejected datagrams.
    pub malformed_report_secs: Option<u64>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Reads and parses the config file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid TOML for [`FileConfig`].
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Parses config file contents.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for invalid TOML or unknown keys.
pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
