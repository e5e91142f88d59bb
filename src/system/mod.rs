//! System abstraction for filesystem operations
//!
//! Every read, write, copy and removal performed while rendering, injecting or
//! rolling back goes through the [`System`] trait, so the whole pipeline can
//! run against the in-memory [`MockSystem`] in tests.

use std::io;
use std::path::{Path, PathBuf};

pub mod mock;
pub mod real;

pub use mock::MockSystem;
pub use real::RealSystem;

/// Entry from directory walking
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_file: bool,
    pub is_dir: bool,
}

/// Unified trait for system operations
///
/// # Implementations
/// - `RealSystem`: Production implementation using `std::fs` and `walkdir`
/// - `MockSystem`: Test implementation using in-memory storage
pub trait System: Send + Sync {
    /// Get the current working directory
    fn current_dir(&self) -> io::Result<PathBuf>;

    /// Read entire file contents as a string
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write bytes to a file, creating it if it doesn't exist
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Recursively create a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory and all its contents
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Copy a file from source to destination
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path points to a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if a path points to a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Read directory entries, returning paths of all entries
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Recursively walk a directory, returning all entries
    ///
    /// # Returns
    /// Vector of all entries found (files and directories), excluding the root
    /// itself, sorted by path.
    fn walk_dir(&self, path: &Path) -> io::Result<Vec<WalkEntry>>;
}
