//! Path manipulation utilities
//!
//! All joins are POSIX-style; no attempt is made to model other platforms.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving `.` and `..` components
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {
                // Skip '.' components
            }
            Component::ParentDir => {
                match components.last() {
                    Some(Component::Normal(_)) => {
                        components.pop();
                    }
                    // '..' above the root stays at the root
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    // Keep leading '..' components
                    _ => components.push(component),
                }
            }
            _ => {
                components.push(component);
            }
        }
    }

    components.iter().collect()
}

/// Resolve `path` against `base` unless it is already absolute
#[must_use]
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// Compute the path leading from directory `from` to `to`
///
/// Both paths are normalized first. Returns an empty path when they are equal.
#[must_use]
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize_path(from);
    let to = normalize_path(to);
    let common = common_path_prefix(&from, &to);

    let ups = from.components().count() - common.components().count();
    let mut relative = PathBuf::new();
    for _ in 0..ups {
        relative.push("..");
    }
    for component in to.components().skip(common.components().count()) {
        relative.push(component);
    }
    relative
}

/// Get the common prefix of two paths
#[must_use]
pub fn common_path_prefix(path1: &Path, path2: &Path) -> PathBuf {
    let components1: Vec<_> = path1.components().collect();
    let components2: Vec<_> = path2.components().collect();

    let mut common = PathBuf::new();

    for (c1, c2) in components1.iter().zip(components2.iter()) {
        if c1 == c2 {
            common.push(c1);
        } else {
            break;
        }
    }

    common
}

/// Render `path` relative to `base` when it lives below it, else as-is
#[must_use]
pub fn display_relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// A path split into directory, file stem and extension
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
    /// Directory part, empty for a bare file name
    pub dir: PathBuf,
    /// File name without the last extension
    pub name: String,
    /// Last extension including its leading dot, or empty
    pub ext: String,
}

impl ParsedPath {
    /// File name including extension
    #[must_use]
    pub fn base(&self) -> String {
        format!("{}{}", self.name, self.ext)
    }
}

/// Split a path into directory, name and extension
///
/// A leading dot does not start an extension, so `.gitignore` has no
/// extension while `db.service.ts` has the extension `.ts`.
#[must_use]
pub fn parse_path(path: &Path) -> ParsedPath {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match base.rfind('.') {
        Some(idx) if idx > 0 => ParsedPath {
            dir,
            name: base[..idx].to_owned(),
            ext: base[idx..].to_owned(),
        },
        _ => ParsedPath {
            dir,
            name: base,
            ext: String::new(),
        },
    }
}

/// Ensure an extension begins with "."
#[must_use]
pub fn normalize_ext(ext: &str) -> String {
    let trimmed = ext.trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/p/src/a"), Path::new("/p/src/b/c.ts")),
            PathBuf::from("../b/c.ts")
        );
        assert_eq!(
            relative_path(Path::new("/p/src"), Path::new("/p/src/x.ts")),
            PathBuf::from("x.ts")
        );
        assert_eq!(
            relative_path(Path::new("/p/src"), Path::new("/p/src")),
            PathBuf::new()
        );
    }

    #[test]
    fn test_parse_path() {
        let parsed = parse_path(Path::new("examples/db.service.ts"));
        assert_eq!(parsed.dir, PathBuf::from("examples"));
        assert_eq!(parsed.name, "db.service");
        assert_eq!(parsed.ext, ".ts");
        assert_eq!(parsed.base(), "db.service.ts");

        let hidden = parse_path(Path::new(".gitignore"));
        assert_eq!(hidden.name, ".gitignore");
        assert_eq!(hidden.ext, "");
        assert_eq!(hidden.dir, PathBuf::new());
    }

    #[test]
    fn test_normalize_ext() {
        assert_eq!(normalize_ext("tpl"), ".tpl");
        assert_eq!(normalize_ext(".tpl"), ".tpl");
        assert_eq!(normalize_ext(""), "");
    }
}
