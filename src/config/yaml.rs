//! YAML configuration loading and parsing

use crate::config::{Options, RegisterFile};
use crate::error::MustrError;
use crate::system::System;
use anyhow::{Context as _, Result};
use serde_json::Value;
use std::path::Path;

/// Load and parse project options from file
///
/// JSON is accepted as well since it is valid YAML.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable or malformed
pub fn load_options(system: &dyn System, path: &Path) -> Result<Options> {
    if !system.exists(path) {
        return Err(MustrError::configuration(format!(
            "Options file not found: {}\n\
            Run `mustr init` or specify a different path with --config",
            path.display()
        ))
        .into());
    }

    let content = system
        .read_to_string(path)
        .with_context(|| format!("Failed to read options file: {}", path.display()))?;

    let options: Options = serde_yaml::from_str(&content).map_err(|e| {
        MustrError::configuration(format!(
            "Failed to parse options file {}: {e}",
            path.display()
        ))
    })?;

    if options.template_ext.trim_start_matches('.').is_empty() {
        return Err(MustrError::configuration("templateExt cannot be empty").into());
    }

    Ok(options)
}

/// Load, validate and parse a register file
///
/// # Errors
///
/// Returns an error if the file is unreadable, malformed or fails schema
/// validation
pub fn load_register(system: &dyn System, path: &Path) -> Result<RegisterFile> {
    let content = system
        .read_to_string(path)
        .with_context(|| format!("Failed to read register file: {}", path.display()))?;

    let value: Value = serde_yaml::from_str(&content).map_err(|e| {
        MustrError::configuration(format!(
            "Failed to parse register file {}: {e}",
            path.display()
        ))
    })?;

    // An empty document is an empty register
    if value.is_null() {
        return Ok(RegisterFile::default());
    }

    crate::config::schema::validate_against_schema(&value)
        .with_context(|| format!("Register file validation failed: {}", path.display()))?;

    serde_json::from_value(value).map_err(|e| {
        MustrError::configuration(format!(
            "Invalid register file {}: {e}",
            path.display()
        ))
        .into()
    })
}
