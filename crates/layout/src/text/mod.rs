pub mod cleanup;
pub mod lines;
pub mod quarter;
