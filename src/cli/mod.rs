//! Command-line interface module
//!
//! Handles argument parsing and command dispatch

pub mod args;
pub mod commands;

pub use args::*;
pub use commands::*;
