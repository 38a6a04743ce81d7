//! Text codec for producer datagrams.
//!
//! Wire format:
//! ```text
//! <kind>/<name>/<x>/<y>
//! ```
//! ASCII text, exactly four fields joined by a single `/`.  There is no
//! escaping, so a name or coordinate containing `/` changes the field count
//! and the datagram is rejected.  One trailing line terminator (`\n` or
//! `\r\n`) is tolerated so line-oriented tools such as `nc -u` can be used as
//! producers.
//!
//! Datagrams are fire-and-forget: a rejected datagram is reported to the
//! caller as a [`WireError`] and nothing is ever sent back to the producer.

use thiserror::Error;

use crate::domain::update::{PositionUpdate, ShapeKind, UnknownShapeKind};

/// Separator between fields.
pub const FIELD_DELIMITER: char = '/';

/// Number of fields in a well-formed datagram: kind, name, x, y.
pub const FIELD_COUNT: usize = 4;

/// Reasons a datagram does not produce an update.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The payload did not split into exactly [`FIELD_COUNT`] fields.
    #[error("expected 4 fields, found {found}")]
    FieldCount { found: usize },

    /// The first field is not a recognised [`ShapeKind`].
    #[error("unrecognised kind '{0}'")]
    UnknownKind(String),

    /// A field to be encoded contains the delimiter and would corrupt the
    /// receiving side's parse.
    #[error("field '{field}' contains the '/' delimiter")]
    DelimiterInField { field: &'static str },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses one datagram payload into a [`PositionUpdate`].
///
/// Invalid UTF-8 sequences are replaced with U+FFFD rather than rejected;
/// names and coordinates are opaque to the relay.
///
/// # Errors
///
/// - [`WireError::FieldCount`] when the payload does not have four fields.
/// - [`WireError::UnknownKind`] when the kind token is not recognised.
///
/// # Examples
///
/// ```rust
/// use tinyland_core::{parse_datagram, PositionUpdate};
///
/// let update = parse_datagram(b"rectangle/box1/120/340").unwrap();
/// assert_eq!(update, PositionUpdate::rectangle("box1", "120", "340"));
///
/// assert!(parse_datagram(b"circle/dot/1/1").is_err());
/// ```
pub fn parse_datagram(payload: &[u8]) -> Result<PositionUpdate, WireError> {
    let text = String::from_utf8_lossy(payload);
    let text = strip_line_terminator(&text);

    let fields: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    let &[kind, name, x, y] = fields.as_slice() else {
        return Err(WireError::FieldCount {
            found: fields.len(),
        });
    };

    let kind: ShapeKind = kind
        .parse()
        .map_err(|UnknownShapeKind(token)| WireError::UnknownKind(token))?;

    Ok(PositionUpdate {
        kind,
        name: name.to_string(),
        x: x.to_string(),
        y: y.to_string(),
    })
}

/// Encodes an update as the datagram payload a producer sends.
///
/// # Errors
///
/// Returns [`WireError::DelimiterInField`] if `name`, `x` or `y` contains
/// [`FIELD_DELIMITER`], since the relay would then reject the datagram.
pub fn encode_datagram(update: &PositionUpdate) -> Result<String, WireError> {
    for (field, value) in [("name", &update.name), ("x", &update.x), ("y", &update.y)] {
        if value.contains(FIELD_DELIMITER) {
            return Err(WireError::DelimiterInField { field });
        }
    }

    Ok(format!(
        "{kind}{d}{name}{d}{x}{d}{y}",
        kind = update.kind.as_str(),
        name = update.name,
        x = update.x,
        y = update.y,
        d = FIELD_DELIMITER,
    ))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Removes at most one trailing `\r\n` or `\n`.
fn strip_line_terminator(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_rectangle() {
        // Arrange
        let payload = b"rectangle/box1/120/340";

        // Act
        let update = parse_datagram(payload).unwrap();

        // Assert
        assert_eq!(update.kind, ShapeKind::Rectangle);
        assert_eq!(update.name, "box1");
        assert_eq!(update.x, "120");
        assert_eq!(update.y, "340");
    }

    #[test]
    fn test_parse_unknown_kind_is_rejected() {
        let result = parse_datagram(b"circle/dot/1/1");
        assert_eq!(result, Err(WireError::UnknownKind("circle".to_string())));
    }

    #[test]
    fn test_parse_too_few_fields_is_rejected() {
        let result = parse_datagram(b"rectangle/box1/120");
        assert_eq!(result, Err(WireError::FieldCount { found: 3 }));
    }

    #[test]
    fn test_parse_too_many_fields_is_rejected() {
        // The legacy shape/name/x/y/w/h/ producer format has seven fields
        // (trailing slash included) and must not be half-accepted.
        let result = parse_datagram(b"rectangle/paddle1/100/200/20/40/");
        assert_eq!(result, Err(WireError::FieldCount { found: 7 }));
    }

    #[test]
    fn test_parse_delimiter_inside_name_corrupts_field_count() {
        let result = parse_datagram(b"rectangle/a/b/1/2");
        assert_eq!(result, Err(WireError::FieldCount { found: 5 }));
    }

    #[test]
    fn test_parse_empty_payload_is_rejected() {
        let result = parse_datagram(b"");
        assert_eq!(result, Err(WireError::FieldCount { found: 1 }));
    }

    #[test]
    fn test_parse_field_count_checked_before_kind() {
        // A wrong field count is reported even when the kind is also wrong.
        let result = parse_datagram(b"circle/x");
        assert_eq!(result, Err(WireError::FieldCount { found: 2 }));
    }

    #[test]
    fn test_parse_tolerates_one_trailing_newline() {
        let update = parse_datagram(b"rectangle/box1/120/340\n").unwrap();
        assert_eq!(update.y, "340");
    }

    #[test]
    fn test_parse_tolerates_trailing_crlf() {
        let update = parse_datagram(b"rectangle/box1/120/340\r\n").unwrap();
        assert_eq!(update.y, "340");
    }

    #[test]
    fn test_parse_only_strips_a_single_terminator() {
        let update = parse_datagram(b"rectangle/box1/120/340\n\n").unwrap();
        assert_eq!(update.y, "340\n");
    }

    #[test]
    fn test_parse_passes_non_numeric_coordinates_through() {
        let update = parse_datagram(b"rectangle/box1/left/ 7 ").unwrap();
        assert_eq!(update.x, "left");
        assert_eq!(update.y, " 7 ");
    }

    #[test]
    fn test_parse_accepts_empty_fields() {
        // Four fields are present; emptiness is the consumer's problem.
        let update = parse_datagram(b"rectangle///").unwrap();
        assert_eq!(update.name, "");
        assert_eq!(update.x, "");
        assert_eq!(update.y, "");
    }

    #[test]
    fn test_parse_replaces_invalid_utf8() {
        let update = parse_datagram(b"rectangle/bo\xFFx/1/2").unwrap();
        assert_eq!(update.name, "bo\u{FFFD}x");
    }

    #[test]
    fn test_encode_produces_slash_joined_payload() {
        let update = PositionUpdate::rectangle("cube", "10", "20");
        assert_eq!(encode_datagram(&update).unwrap(), "rectangle/cube/10/20");
    }

    #[test]
    fn test_encode_rejects_delimiter_in_name() {
        let update = PositionUpdate::rectangle("a/b", "1", "2");
        assert_eq!(
            encode_datagram(&update),
            Err(WireError::DelimiterInField { field: "name" })
        );
    }

    #[test]
    fn test_encode_rejects_delimiter_in_y() {
        let update = PositionUpdate::rectangle("a", "1", "2/3");
        assert_eq!(
            encode_datagram(&update),
            Err(WireError::DelimiterInField { field: "y" })
        );
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        assert_eq!(
            WireError::FieldCount { found: 2 }.to_string(),
            "expected 4 fields, found 2"
        );
        assert_eq!(
            WireError::UnknownKind("circle".into()).to_string(),
            "unrecognised kind 'circle'"
        );
    }
}
