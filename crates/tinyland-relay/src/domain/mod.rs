//! Domain layer for tinyland-relay.
//!
//! Pure types with no dependencies on sockets, async runtimes, or the
//! filesystem:
//!
//! - Runtime configuration ([`RelayConfig`])
//! - Browser session identity and lifecycle ([`SessionId`], [`SessionState`])
//!
//! Reading configuration from the command line or a TOML file is the job of
//! `main.rs` and the infrastructure layer.

pub mod config;
pub mod session;

pub use config::RelayConfig;
pub use session::{SessionEvent, SessionId, SessionState};
