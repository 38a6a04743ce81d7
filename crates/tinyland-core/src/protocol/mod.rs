//! Protocol module: the producer datagram format and the browser event envelope.

pub mod event;
pub mod wire;

pub use event::{RelayEvent, UPDATE_THING_EVENT};
pub use wire::{encode_datagram, parse_datagram, WireError};
