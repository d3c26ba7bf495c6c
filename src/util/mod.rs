//! Small helpers without a better home.

pub mod fs;
