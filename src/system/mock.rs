//! Mock system implementation for testing

use super::{System, WalkEntry};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// In-memory implementation of System trait for testing
///
/// `MockSystem` provides an in-memory filesystem, perfect for fast, isolated
/// unit tests without side effects. Clones share the same state.
///
/// # Example
/// ```
/// use mustr::system::{mock::MockSystem, System};
/// use std::path::Path;
///
/// let system = MockSystem::new()
///     .with_current_dir("/project").unwrap()
///     .with_file("/project/mustr/hello.tpl", b"Hello {{name}}").unwrap();
///
/// assert!(system.exists(Path::new("/project/mustr/hello.tpl")));
/// assert!(system.is_dir(Path::new("/project/mustr")));
/// ```
#[derive(Clone)]
pub struct MockSystem {
    state: Arc<RwLock<MockSystemState>>,
}

struct MockSystemState {
    current_dir: PathBuf,
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

fn poisoned<E: ToString>(e: E) -> io::Error {
    io::Error::other(e.to_string())
}

fn not_found(what: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{what} not found: {}", path.display()),
    )
}

impl MockSystem {
    /// Create a new `MockSystem` with default state
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockSystemState {
                current_dir: PathBuf::from("/"),
                files: BTreeMap::new(),
                dirs: BTreeSet::from([PathBuf::from("/")]),
            })),
        }
    }

    /// Set the current working directory (builder pattern)
    ///
    /// The directory is created if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned
    #[inline]
    pub fn with_current_dir<P: AsRef<Path>>(self, dir: P) -> io::Result<Self> {
        let mut state = self.state.write().map_err(poisoned)?;
        let dir = dir.as_ref().to_path_buf();
        Self::ensure_parent_dirs(&mut state.dirs, &dir);
        state.current_dir = dir;
        drop(state);
        Ok(self)
    }

    /// Add a file with contents (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned
    #[inline]
    pub fn with_file<P: AsRef<Path>>(self, path: P, contents: &[u8]) -> io::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut state = self.state.write().map_err(poisoned)?;

        // Ensure parent directories exist
        if let Some(parent) = path_buf.parent() {
            Self::ensure_parent_dirs(&mut state.dirs, parent);
        }

        state.files.insert(path_buf, contents.to_vec());
        drop(state);
        Ok(self)
    }

    /// Add a directory (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned
    #[inline]
    pub fn with_dir<P: AsRef<Path>>(self, path: P) -> io::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut state = self.state.write().map_err(poisoned)?;
        Self::ensure_parent_dirs(&mut state.dirs, &path_buf);
        drop(state);
        Ok(self)
    }

    /// List every file currently stored, sorted by path
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned
    #[inline]
    pub fn files(&self) -> io::Result<Vec<PathBuf>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.files.keys().cloned().collect())
    }

    #[inline]
    fn ensure_parent_dirs(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor == Path::new("") {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }
}

impl Default for MockSystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl System for MockSystem {
    #[inline]
    fn current_dir(&self) -> io::Result<PathBuf> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.current_dir.clone())
    }

    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let state = self.state.read().map_err(poisoned)?;
        let bytes = state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("File", path))?;
        drop(state);
        String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {e}")))
    }

    #[inline]
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;

        if let Some(parent) = path.parent()
            && !state.dirs.contains(parent)
        {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Parent directory does not exist: {}", parent.display()),
            ));
        }

        state.files.insert(path.to_path_buf(), contents.to_vec());
        drop(state);
        Ok(())
    }

    #[inline]
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        Self::ensure_parent_dirs(&mut state.dirs, path);
        drop(state);
        Ok(())
    }

    #[inline]
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;

        if !state.dirs.contains(path) {
            return Err(not_found("Directory", path));
        }

        // Remove all files and subdirectories under this path
        state.files.retain(|p, _| !p.starts_with(path));
        state.dirs.retain(|p| !p.starts_with(path));
        drop(state);
        Ok(())
    }

    #[inline]
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.files.remove(path).is_none() {
            return Err(not_found("File", path));
        }
        drop(state);
        Ok(())
    }

    #[inline]
    #[expect(clippy::as_conversions, reason = "This is for usize to u64 conversion")]
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        let contents = {
            let state = self.state.read().map_err(poisoned)?;
            state
                .files
                .get(from)
                .cloned()
                .ok_or_else(|| not_found("Source file", from))?
        };

        let size = contents.len() as u64;
        self.write(to, &contents)?;
        Ok(size)
    }

    #[inline]
    fn exists(&self, path: &Path) -> bool {
        self.state
            .read()
            .map(|state| state.files.contains_key(path) || state.dirs.contains(path))
            .unwrap_or(false)
    }

    #[inline]
    fn is_file(&self, path: &Path) -> bool {
        self.state
            .read()
            .map(|state| state.files.contains_key(path))
            .unwrap_or(false)
    }

    #[inline]
    fn is_dir(&self, path: &Path) -> bool {
        self.state
            .read()
            .map(|state| state.dirs.contains(path))
            .unwrap_or(false)
    }

    #[inline]
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.state.read().map_err(poisoned)?;

        if !state.dirs.contains(path) {
            return Err(not_found("Directory", path));
        }

        let mut entries: Vec<PathBuf> = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter(|p| p.parent() == Some(path) && p.as_path() != path)
            .cloned()
            .collect();
        drop(state);

        entries.sort();
        Ok(entries)
    }

    #[inline]
    fn walk_dir(&self, path: &Path) -> io::Result<Vec<WalkEntry>> {
        let state = self.state.read().map_err(poisoned)?;

        if !state.dirs.contains(path) {
            return Err(not_found("Directory", path));
        }

        let dirs = state
            .dirs
            .iter()
            .filter(|d| d.starts_with(path) && d.as_path() != path)
            .map(|d| WalkEntry {
                path: d.clone(),
                is_file: false,
                is_dir: true,
            });
        let files = state
            .files
            .keys()
            .filter(|f| f.starts_with(path))
            .map(|f| WalkEntry {
                path: f.clone(),
                is_file: true,
                is_dir: false,
            });
        let mut entries: Vec<WalkEntry> = dirs.chain(files).collect();
        drop(state);

        // Sort entries by path for deterministic output
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(entries)
    }
}
