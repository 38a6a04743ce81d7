//! JSON event envelope for the browser-facing WebSocket protocol.
//!
//! Browsers subscribe to named events.  Every WebSocket text frame the relay
//! sends is one JSON object carrying the event name and its payload:
//!
//! ```json
//! {"event":"update-thing","data":{"type":"rectangle","name":"box1","x":"120","y":"340"}}
//! ```
//!
//! Serde's adjacently tagged representation (`tag = "event"`,
//! `content = "data"`) produces this shape directly from the enum.

use serde::{Deserialize, Serialize};

use crate::domain::update::PositionUpdate;

/// Logical event name carried by position updates.
pub const UPDATE_THING_EVENT: &str = "update-thing";

/// Every event the relay pushes to browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RelayEvent {
    /// A shape moved.
    #[serde(rename = "update-thing")]
    UpdateThing(PositionUpdate),
}

impl RelayEvent {
    /// Returns the logical event name, as seen by the browser.
    pub fn name(&self) -> &'static str {
        match self {
            RelayEvent::UpdateThing(_) => UPDATE_THING_EVENT,
        }
    }

    /// Serialises the event into the text frame sent to browsers.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error.  With the current payload
    /// types (plain strings and a unit enum) this cannot fail in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<PositionUpdate> for RelayEvent {
    fn from(update: PositionUpdate) -> Self {
        RelayEvent::UpdateThing(update)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
