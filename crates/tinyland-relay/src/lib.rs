//! tinyland-relay library crate.
//!
//! This crate receives positional-update datagrams from a producer over UDP
//! and pushes each accepted update to every connected browser over
//! WebSocket.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Producer (slash-delimited text over UDP)
//!         ↓
//! [tinyland-relay]
//!   ├── domain/            Pure types: RelayConfig, SessionState
//!   ├── application/       BroadcastHub fan-out
//!   └── infrastructure/
//!         ├── ingest/      UDP receive loop (tinyland-core parser)
//!         ├── ws_server/   axum router: presentation page + WebSocket sessions
//!         └── config_file/ Optional TOML configuration
//!         ↓
//! Browsers (JSON over WebSocket)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `tinyland-core`; it may use
//!   channel types but never opens sockets.
//! - `infrastructure` depends on all other layers plus `tokio` and `axum`.
//!
//! Data only ever flows one way: producer → relay → browsers.  Frames sent by
//! browsers are read (so Close frames are noticed) and otherwise ignored.

/// Domain layer: configuration and session lifecycle types (no I/O).
pub mod domain;

/// Application layer: the broadcast hub.
pub mod application;

/// Infrastructure layer: UDP ingest, WebSocket server, config file.
pub mod infrastructure;
