//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod images;
pub mod telemetry;
