//! Infrastructure layer: sockets, files and the server loop.

pub mod config_file;
pub mod ingest;
pub mod static_page;
pub mod ws_server;

pub use config_file::{load_config, ConfigError, FileConfig};
pub use ingest::{IngestError, IngestListener};
pub use ws_server::{run_server, RelayServer};
