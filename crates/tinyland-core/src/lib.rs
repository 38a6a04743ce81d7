//! # tinyland-core
//!
//! Shared library for the Tinyland position relay containing the domain
//! entity and the text wire format spoken by producers.
//!
//! This crate is used by both the relay and the test producer.  It has zero
//! dependencies on sockets, async runtimes, or OS APIs.
//!
//! # Architecture overview
//!
//! Tinyland lets an external process (a camera tracker, a game loop, an
//! embedded board) move shapes around a browser page.  The producer fires
//! tiny UDP datagrams such as `rectangle/box1/120/340` at the relay, and the
//! relay pushes each one to every connected browser as a JSON event.
//!
//! - **`domain`** – The [`PositionUpdate`] entity and the [`ShapeKind`] tag.
//!
//! - **`protocol`** – How updates travel: the slash-delimited datagram format
//!   read from producers, and the JSON event envelope written to browsers.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `tinyland_core::PositionUpdate` instead of the longer module path.
pub use domain::update::{PositionUpdate, ShapeKind};
pub use protocol::event::{RelayEvent, UPDATE_THING_EVENT};
pub use protocol::wire::{encode_datagram, parse_datagram, WireError, FIELD_COUNT, FIELD_DELIMITER};

/// Well-known UDP port producers send datagrams to.
pub const DEFAULT_INGEST_PORT: u16 = 20001;

/// Well-known TCP port browsers connect to (HTTP page + WebSocket).
pub const DEFAULT_HTTP_PORT: u16 = 3000;
