//! Write-ahead file cache
//!
//! A [`Store`] buffers reads, writes and deletes in memory and applies them
//! with [`Store::flush`]. Each cached file carries an explicit [`FileState`].

use crate::system::System;
use crate::utils::fs::{create_parent_directories, remove_path};
use anyhow::{Context as _, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pending state of a cached file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Matches the disk
    Clean,
    /// Not on disk yet
    New,
    /// On disk with pending changes
    Modified,
    /// On disk, pending removal
    Deleted,
}

#[derive(Debug)]
struct CachedFile {
    state: FileState,
    contents: String,
}

/// In-memory view of files with deferred writes
pub struct Store<'src> {
    system: &'src dyn System,
    files: BTreeMap<PathBuf, CachedFile>,
}

impl<'src> Store<'src> {
    #[must_use]
    pub const fn new(system: &'src dyn System) -> Self {
        Self {
            system,
            files: BTreeMap::new(),
        }
    }

    /// Read a file through the cache
    ///
    /// Returns `Ok(None)` for files that are missing or pending deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read
    pub fn read(&mut self, path: &Path) -> Result<Option<&str>> {
        if !self.files.contains_key(path) {
            if !self.system.is_file(path) {
                return Ok(None);
            }
            let contents = self
                .system
                .read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            self.files.insert(
                path.to_path_buf(),
                CachedFile {
                    state: FileState::Clean,
                    contents,
                },
            );
        }

        Ok(self
            .files
            .get(path)
            .filter(|file| file.state != FileState::Deleted)
            .map(|file| file.contents.as_str()))
    }

    /// Stage new contents for `path`
    pub fn write(&mut self, path: &Path, contents: String) {
        let on_disk = self.system.is_file(path);
        let file = self
            .files
            .entry(path.to_path_buf())
            .or_insert_with(|| CachedFile {
                state: if on_disk {
                    FileState::Clean
                } else {
                    FileState::New
                },
                contents: String::new(),
            });

        file.state = match file.state {
            FileState::New => FileState::New,
            FileState::Clean | FileState::Modified | FileState::Deleted => FileState::Modified,
        };
        file.contents = contents;
    }

    /// Stage removal of `path`
    pub fn delete(&mut self, path: &Path) {
        match self.files.get(path).map(|file| file.state) {
            Some(FileState::New) => {
                self.files.remove(path);
            }
            Some(_) => {
                if let Some(file) = self.files.get_mut(path) {
                    file.state = FileState::Deleted;
                }
            }
            None if self.system.is_file(path) => {
                self.files.insert(
                    path.to_path_buf(),
                    CachedFile {
                        state: FileState::Deleted,
                        contents: String::new(),
                    },
                );
            }
            None => {}
        }
    }

    /// Pending state of `path`, `None` when it is not cached
    #[must_use]
    pub fn state(&self, path: &Path) -> Option<FileState> {
        self.files.get(path).map(|file| file.state)
    }

    /// Apply pending changes, returning how many files were touched
    ///
    /// # Errors
    ///
    /// Returns an error on the first write or removal that fails; changes
    /// applied before it stay applied
    pub fn flush(&mut self) -> Result<usize> {
        let mut applied = 0;
        let mut removed = Vec::new();

        for (path, file) in &mut self.files {
            match file.state {
                FileState::Clean => continue,
                FileState::New | FileState::Modified => {
                    create_parent_directories(self.system, path)?;
                    self.system
                        .write(path, file.contents.as_bytes())
                        .with_context(|| format!("Failed to write file: {}", path.display()))?;
                    file.state = FileState::Clean;
                }
                FileState::Deleted => {
                    remove_path(self.system, path)?;
                    removed.push(path.clone());
                }
            }
            applied += 1;
        }

        for path in removed {
            self.files.remove(&path);
        }
        Ok(applied)
    }
}
