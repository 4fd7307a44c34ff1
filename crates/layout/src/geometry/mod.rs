//! Vector geometry: instruction replay and ruling-grid inference.

pub mod grid;
pub mod transform;
