//! Ruled-table detection and glyph assignment.

pub mod assign;
pub mod detect;
