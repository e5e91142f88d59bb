//! Rollback ledger
//!
//! Every render run is recorded under a rollback id of the form
//! `<epoch millis>-<name>[-<component>]`. Each entry names the file that was
//! written and, when an existing file was overwritten, the backup to restore
//! it from.

pub mod ledger;

pub use ledger::Ledger;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One file written by a render run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackEntry {
    /// Registered template name
    pub template: String,
    /// File that was written
    pub rollback_to: String,
    /// Backup of the file's previous contents, absent for newly created files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_from: Option<String>,
    /// Written by an injection rather than a render
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_inject: bool,
}

impl RollbackEntry {
    #[must_use]
    pub fn new(template: &str, rollback_to: String) -> Self {
        Self {
            template: template.to_owned(),
            rollback_to,
            rollback_from: None,
            is_inject: false,
        }
    }
}

/// All entries recorded for one rollback id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackContainer {
    /// ISO-8601 creation time
    pub timestamp: String,
    #[serde(default)]
    pub rollbacks: Vec<RollbackEntry>,
}

/// Summary of one rollback id, as listed by `show rollbacks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackStat {
    pub id: String,
    pub timestamp: String,
    pub count: usize,
    pub templates: Vec<String>,
}

/// Selector for [`Ledger::remove`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveBy {
    /// A single rollback id
    Id(String),
    /// Every rollback older than the date, newest one kept
    Before(DateTime<Utc>),
    /// The oldest N rollbacks, newest one kept
    Count(usize),
}

impl RemoveBy {
    /// Interpret a selector: a rollback id, a count or a date
    ///
    /// Returns `None` and logs a warning when the selector matches none of them.
    #[must_use]
    pub fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        if is_rollback_id(selector) {
            return Some(Self::Id(selector.to_owned()));
        }
        if let Ok(count) = selector.parse::<usize>() {
            return Some(Self::Count(count));
        }
        if let Some(date) = parse_date(selector) {
            return Some(Self::Before(date));
        }
        warn!("invalid rollback selector {selector}, expected an id, a count or a date.");
        None
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

/// Whether `value` has the shape `<digits>-<name>[-<component>]`
#[must_use]
pub fn is_rollback_id(value: &str) -> bool {
    let segments: Vec<&str> = value.split('-').collect();
    let Some((timestamp, names)) = segments.split_first() else {
        return false;
    };
    !timestamp.is_empty()
        && timestamp.chars().all(|c| c.is_ascii_digit())
        && (1..=2).contains(&names.len())
        && names.iter().all(|name| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

/// Epoch millis prefix of a rollback id
#[must_use]
pub fn id_timestamp(id: &str) -> Option<i64> {
    id.split('-').next().and_then(|prefix| prefix.parse().ok())
}

/// Reduce a name to the characters allowed in a rollback id segment
fn id_segment(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Build a rollback id for `name`, optionally scoped to a component output
#[must_use]
pub fn rollback_id(timestamp_millis: i64, name: &str, component: Option<&str>) -> String {
    let name = id_segment(name);
    match component.map(id_segment).filter(|c| !c.is_empty()) {
        Some(component) => format!("{timestamp_millis}-{name}-{component}"),
        None => format!("{timestamp_millis}-{name}"),
    }
}
