//! Line-oriented text injection into existing files

use crate::error::MustrError;
use crate::store::Store;
use crate::system::System;
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Where inserted lines go relative to matching lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Before every matching line
    Before,
    /// After every matching line
    #[default]
    After,
    /// In place of every matching line
    Replace,
    /// After the first matching line only
    First,
    /// After the last matching line only
    Last,
}

impl FromStr for Strategy {
    type Err = MustrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "replace" => Ok(Self::Replace),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(MustrError::inject(format!(
                "unknown inject strategy '{other}', expected before, after, replace, first or last"
            ))),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Replace => "replace",
            Self::First => "first",
            Self::Last => "last",
        };
        f.write_str(name)
    }
}

/// Compile an injection pattern
///
/// # Errors
///
/// Returns an error if `find` is not a valid regular expression
pub fn compile_pattern(find: &str) -> Result<Regex> {
    Regex::new(find)
        .map_err(|e| MustrError::inject(format!("invalid inject pattern '{find}': {e}")).into())
}

/// Leading whitespace of `line`
fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn indented<'a>(indent: &'a str, insert: &'a [String]) -> impl Iterator<Item = String> + 'a {
    insert.iter().map(move |line| format!("{indent}{line}"))
}

/// Apply `strategy` to `content`, returning the new content and match count
///
/// Inserted lines take the indentation of the line that triggered them. A
/// trailing newline in `content` is preserved.
#[must_use]
pub fn inject_content(
    content: &str,
    find: &Regex,
    strategy: Strategy,
    insert: &[String],
) -> (String, usize) {
    let mut lines: Vec<String> = Vec::new();
    let mut matches = 0_usize;
    let mut last_match = None;

    for line in content.lines() {
        if !find.is_match(line) {
            lines.push(line.to_owned());
            continue;
        }
        matches += 1;

        let indent = indentation(line);
        match strategy {
            Strategy::Before => {
                lines.extend(indented(indent, insert));
                lines.push(line.to_owned());
            }
            Strategy::After => {
                lines.push(line.to_owned());
                lines.extend(indented(indent, insert));
            }
            Strategy::Replace => lines.extend(indented(indent, insert)),
            Strategy::First => {
                lines.push(line.to_owned());
                if matches == 1 {
                    lines.extend(indented(indent, insert));
                }
            }
            Strategy::Last => {
                lines.push(line.to_owned());
                last_match = Some(lines.len());
            }
        }
    }

    if let Some(at) = last_match
        && let Some(matched) = lines.get(at - 1)
    {
        let indent = indentation(matched).to_owned();
        let inserted: Vec<String> = indented(&indent, insert).collect();
        lines.splice(at..at, inserted);
    }

    let mut injected = lines.join("\n");
    if content.ends_with('\n') {
        injected.push('\n');
    }
    (injected, matches)
}

/// Inject `insert` into the file at `path`
///
/// Returns the number of matching lines. A file without matches is left
/// unchanged.
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be rewritten
pub fn inject_file(
    system: &dyn System,
    path: &Path,
    find: &Regex,
    strategy: Strategy,
    insert: &[String],
) -> Result<usize> {
    let mut store = Store::new(system);
    let Some(content) = store.read(path)? else {
        return Err(MustrError::inject(format!(
            "failed to inject in {}, file not found.",
            path.display()
        ))
        .into());
    };

    let (injected, matches) = inject_content(content, find, strategy, insert);
    debug!(
        "{matches} match(es) for '{find}' in {} using strategy {strategy}",
        path.display()
    );
    if matches > 0 {
        store.write(path, injected);
        store.flush()?;
    }
    Ok(matches)
}
