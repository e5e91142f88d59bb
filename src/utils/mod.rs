//! Shared path and filesystem helpers

pub mod fs;
pub mod path;
