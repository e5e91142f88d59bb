//! Project initialization

use crate::config::{Options, ProjectPaths, REGISTER_FILE};
use crate::mustr::Mustr;
use crate::system::System;
use crate::utils::fs::{create_parent_directories, ensure_dir_exists};
use crate::utils::path::display_relative;
use anyhow::{Context as _, Result};
use std::path::Path;
use tracing::{info, warn};

/// Seed files written into the config directory, relative to it
const BLUEPRINTS: &[(&str, &str)] = &[
    (REGISTER_FILE, include_str!("../../blueprints/register.yaml")),
    (
        "examples/example.class.tpl",
        include_str!("../../blueprints/examples/example.class.tpl"),
    ),
    (
        "examples/example.author.tpl",
        include_str!("../../blueprints/examples/example.author.tpl"),
    ),
];

impl Mustr<'_> {
    /// Write the options file and seed the config directory
    ///
    /// Returns `false` without touching anything when the project is already
    /// initialized and `force` is not set.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written
    pub fn init(&self, project_file: &Path, force: bool) -> Result<bool> {
        init_project(self.system, &self.options, project_file, force)
    }
}

/// Write `options` to `project_file` and seed the config directory
///
/// # Errors
///
/// Returns an error if a file cannot be written
pub fn init_project(
    system: &dyn System,
    options: &Options,
    project_file: &Path,
    force: bool,
) -> Result<bool> {
    let cwd = system.current_dir()?;
    let paths = ProjectPaths::new(&cwd, options);
    let initialized = system.exists(project_file) || system.is_dir(&paths.config_dir);

    if initialized && !force {
        warn!(
            "mustr is already initialized at {}, use -f to overwrite.",
            display_relative(&cwd, &paths.config_dir)
        );
        return Ok(false);
    }

    let contents = serde_yaml::to_string(options).context("Failed to serialize options")?;
    create_parent_directories(system, project_file)?;
    system
        .write(project_file, contents.as_bytes())
        .with_context(|| format!("Failed to write options file: {}", project_file.display()))?;

    ensure_dir_exists(system, &paths.config_dir)?;
    for (relative, blueprint) in BLUEPRINTS {
        let path = paths.config_dir.join(relative);
        create_parent_directories(system, &path)?;
        system
            .write(&path, blueprint.as_bytes())
            .with_context(|| format!("Failed to write blueprint: {}", path.display()))?;
    }

    info!(
        "initialized mustr in {}.",
        display_relative(&cwd, &paths.config_dir)
    );
    Ok(true)
}
