//! Domain entities for Tinyland.
//!
//! This module contains pure business types with no infrastructure
//! dependencies.  The relay never interprets coordinates or names; it only
//! decides whether an update is well-formed and which kind of shape it
//! describes.

/// The positional update entity and its shape tag.
pub mod update;
