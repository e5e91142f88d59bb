//! `mustr` - Mustache-style scaffolding with rollback and injection
//!
//! This library registers templates from a project's config directory,
//! renders them into the project, records every write in a rollback ledger,
//! and injects lines into existing files.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod mustr;
pub mod operations;
pub mod rollback;
pub mod store;
pub mod system;
pub mod template;
pub mod utils;

pub use config::Options;
pub use error::MustrError;
pub use mustr::Mustr;
pub use operations::{RenderOptions, RenderReport, RenderStatus, Tally};

use anyhow::Result;
use cli::Args;
use system::RealSystem;

/// Main entry point for the mustr library
///
/// # Errors
///
/// Returns an error if the command fails
pub fn run(args: &Args) -> Result<()> {
    let system = RealSystem::new();
    cli::execute(args, &system)
}
