//! Application layer for tinyland-relay.
//!
//! Knows *what* the relay does with an accepted update (fan it out to every
//! session), while leaving sockets and task spawning to the infrastructure
//! layer.

pub mod hub;

pub use hub::{BroadcastHub, DeliveryReport, EventSink, Frame, Subscription};
