//! PDF decoding: the backend abstraction and the content-stream walker.

pub mod backend;
pub mod content;
