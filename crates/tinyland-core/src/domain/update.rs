//! The positional update entity.
//!
//! A [`PositionUpdate`] is built once per accepted datagram, handed to every
//! connected browser, and then dropped.  There is no partially-filled
//! variant: either all four fields were present and the kind was recognised,
//! or no update exists at all.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of shape an update positions.
///
/// Only rectangles are understood today.  New shapes are added as variants
/// here; the parser rejects anything not listed, so producers can start
/// sending a new kind before the relay knows it without breaking anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// An axis-aligned rectangle identified by name.
    Rectangle,
}

impl ShapeKind {
    /// Returns the token used for this kind on the wire and in JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a kind token is not a known [`ShapeKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shape kind '{0}'")]
pub struct UnknownShapeKind(pub String);

impl FromStr for ShapeKind {
    type Err = UnknownShapeKind;

    /// Matching is exact and case-sensitive: `Rectangle` is not `rectangle`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rectangle" => Ok(ShapeKind::Rectangle),
            other => Err(UnknownShapeKind(other.to_string())),
        }
    }
}

/// A request to move the named shape to `(x, y)`.
///
/// `x` and `y` are carried as the exact string tokens the producer sent.
/// Whether they are valid numbers is the browser's concern.
///
/// # Serde representation
///
/// ```json
/// {"type":"rectangle","name":"box1","x":"120","y":"340"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// Shape kind, serialised under the `type` key browsers expect.
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    /// Opaque name of the logical object being positioned.
    pub name: String,
    /// Horizontal coordinate token.
    pub x: String,
    /// Vertical coordinate token.
    pub y: String,
}

impl PositionUpdate {
    /// Convenience constructor for a rectangle update.
    pub fn rectangle(name: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            kind: ShapeKind::Rectangle,
            name: name.into(),
            x: x.into(),
            y: y.into(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
