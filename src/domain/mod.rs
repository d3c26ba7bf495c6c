//! Domain layer types and invariants.

pub mod error;
pub mod params;
pub mod precision;
pub mod viewport;
