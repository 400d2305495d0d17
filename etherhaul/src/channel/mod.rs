//! Byte-level handling of what the radio prints: escape stripping, the
//! tail-searched receive buffer and regex helpers shared by transports
//! and the session.

mod ansi;
mod buffer;
mod patterns;

pub use ansi::strip_ansi;
pub use buffer::{DEFAULT_SEARCH_DEPTH, PatternBuffer};
pub use patterns::{combine_patterns, first_matching_line};
