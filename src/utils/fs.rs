//! File system utilities

use crate::error::MustrError;
use crate::system::System;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Create parent directories for a file path if they don't exist
///
/// # Errors
///
/// Returns an error if the parent directories cannot be created
pub fn create_parent_directories(system: &dyn System, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent()
        && !system.exists(parent)
    {
        system.create_dir_all(parent).with_context(|| {
            format!(
                "Failed to create parent directories for: {}",
                file_path.display()
            )
        })?;
    }
    Ok(())
}

/// Copy a file, creating the destination's parent directories first
///
/// # Errors
///
/// Returns an error if the directories cannot be created or the copy fails
pub fn copy_file(system: &dyn System, from: &Path, to: &Path) -> Result<()> {
    create_parent_directories(system, to)?;
    system
        .copy(from, to)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

/// Remove a file or directory, treating an already missing path as removed
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed
pub fn remove_path(system: &dyn System, path: &Path) -> Result<()> {
    if system.is_dir(path) {
        system
            .remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    } else if system.exists(path) {
        system
            .remove_file(path)
            .with_context(|| format!("Failed to remove file: {}", path.display()))?;
    }
    Ok(())
}

/// List the names of the direct subdirectories of `dir`
///
/// A missing directory yields an empty list.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read
pub fn sub_directories(system: &dyn System, dir: &Path) -> Result<Vec<String>> {
    if !system.is_dir(dir) {
        return Ok(Vec::new());
    }

    let entries = system
        .read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    Ok(entries
        .iter()
        .filter(|entry| system.is_dir(entry))
        .filter_map(|entry| entry.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Find all files below `dir` whose name ends with `ext`
///
/// # Errors
///
/// Returns an error if the directory cannot be walked
pub fn find_files_with_ext(system: &dyn System, dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !system.is_dir(dir) {
        return Ok(Vec::new());
    }

    let entries = system
        .walk_dir(dir)
        .with_context(|| format!("Failed to walk directory: {}", dir.display()))?;

    Ok(entries
        .into_iter()
        .filter(|entry| entry.is_file)
        .filter(|entry| entry.path.to_string_lossy().ends_with(ext))
        .map(|entry| entry.path)
        .collect())
}

/// Ensure a directory exists, creating it if necessary
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the path is a file
pub fn ensure_dir_exists(system: &dyn System, dir_path: &Path) -> Result<()> {
    if !system.exists(dir_path) {
        system
            .create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    } else if !system.is_dir(dir_path) {
        return Err(MustrError::filesystem(format!(
            "Path exists but is not a directory: {}",
            dir_path.display()
        ))
        .into());
    }
    Ok(())
}
