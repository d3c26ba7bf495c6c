//! Fractal zoom front end: maps selections to viewports, picks a precision
//! tier, runs the external renderer in isolation and publishes the result.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
