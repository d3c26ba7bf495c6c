//! Application services layer.

pub mod error;
pub mod fractals;
pub mod render;
