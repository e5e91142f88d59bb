//! # `mustr`
//!
//! `mustr` renders Mustache-style templates into a project. Every write is
//! recorded so it can be rolled back, and templates can inject lines into
//! existing files.
//!
//! ## Usage
//!
//! ```sh
//! mustr init
//! mustr generate example models/user --meta author=Ann
//! mustr show rollbacks
//! mustr rollback 1
//! ```
//!
//! See `mustr --help` for more options and details.

use anyhow::Result;
use clap::Parser as _;
use mustr::cli::Args;
use mustr::error::MustrError;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_target(false).with_env_filter(filter).init();

    match mustr::run(&args) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(
                err.downcast_ref::<MustrError>()
                    .map_or(1, MustrError::exit_code),
            );
        }
    }
}
