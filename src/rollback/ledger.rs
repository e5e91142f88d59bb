//! Persistent rollback ledger

use super::{RemoveBy, RollbackContainer, RollbackEntry, RollbackStat, id_timestamp};
use crate::config::ProjectPaths;
use crate::system::System;
use crate::utils::fs::{create_parent_directories, remove_path, sub_directories};
use crate::utils::path::{display_relative, resolve};
use anyhow::{Context as _, Result};
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Rollback ids mapped to their recorded entries, persisted as JSON
///
/// Backups for an id live in `<rollbacks dir>/<id>/`. A `max_rollbacks` of
/// zero disables the ledger: nothing is recorded, backed up or saved.
#[derive(Debug, Clone)]
pub struct Ledger {
    containers: BTreeMap<String, RollbackContainer>,
    max_rollbacks: usize,
    ledger_file: PathBuf,
    rollbacks_dir: PathBuf,
    cwd: PathBuf,
}

impl Ledger {
    #[must_use]
    pub fn new(paths: &ProjectPaths, max_rollbacks: usize) -> Self {
        Self {
            containers: BTreeMap::new(),
            max_rollbacks,
            ledger_file: paths.ledger_file.clone(),
            rollbacks_dir: paths.rollbacks_dir.clone(),
            cwd: paths.cwd.clone(),
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.max_rollbacks > 0
    }

    #[must_use]
    pub const fn containers(&self) -> &BTreeMap<String, RollbackContainer> {
        &self.containers
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RollbackContainer> {
        self.containers.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Rollback ids from oldest to newest
    ///
    /// Ids sort by their numeric timestamp prefix, then by the full id.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.containers.keys().cloned().collect();
        ids.sort_by(|a, b| (id_timestamp(a), a).cmp(&(id_timestamp(b), b)));
        ids
    }

    /// Most recent rollback id
    #[must_use]
    pub fn latest_id(&self) -> Option<String> {
        self.ids().pop()
    }

    /// Directory holding the backups of rollback `id`
    #[must_use]
    pub fn backup_dir(&self, id: &str) -> PathBuf {
        self.rollbacks_dir.join(id.replace('.', ""))
    }

    /// Resolve a recorded path against the working directory
    #[must_use]
    pub fn resolve(&self, recorded: &str) -> PathBuf {
        resolve(&self.cwd, Path::new(recorded))
    }

    /// Path as recorded in the ledger, relative to the working directory
    /// when it lives below it
    #[must_use]
    pub fn record_path(&self, path: &Path) -> String {
        display_relative(&self.cwd, path)
    }

    /// Record `entry` under `id`, creating the container on first use
    ///
    /// Returns `false` when the ledger is disabled.
    pub fn add(&mut self, id: &str, entry: RollbackEntry) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let key = id.replace('.', "");
        self.containers
            .entry(key)
            .or_insert_with(|| RollbackContainer {
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                rollbacks: Vec::new(),
            })
            .rollbacks
            .push(entry);
        true
    }

    /// Remove rollbacks and their backups, returning how many were removed
    ///
    /// Count and date selectors always keep the newest rollback.
    ///
    /// # Errors
    ///
    /// Returns an error if a backup directory cannot be removed or the ledger
    /// cannot be saved
    pub fn remove(&mut self, system: &dyn System, by: &RemoveBy, persist: bool) -> Result<usize> {
        let ids = self.ids();
        let removable = ids.len().saturating_sub(1);

        let targets: Vec<String> = match by {
            RemoveBy::Id(id) => vec![id.replace('.', "")],
            RemoveBy::Count(count) => ids.into_iter().take((*count).min(removable)).collect(),
            RemoveBy::Before(date) => {
                let cutoff = date.timestamp_millis();
                ids.into_iter()
                    .take(removable)
                    .filter(|id| id_timestamp(id).is_some_and(|ts| ts < cutoff))
                    .collect()
            }
        };

        let mut removed = 0;
        for id in &targets {
            remove_path(system, &self.backup_dir(id))?;
            if self.containers.remove(id).is_some() {
                removed += 1;
            }
        }

        if removed == 0 {
            warn!("0 rollbacks removed.");
        } else {
            debug!("removed {removed} rollback(s)");
        }

        if persist && removed > 0 {
            self.save(system, false)?;
        }
        Ok(removed)
    }

    /// Reconcile the ledger with the backups on disk
    ///
    /// With `prune`, backup directories without a ledger entry are deleted,
    /// entries whose backup file is missing are dropped, and ids left without
    /// entries are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if an orphaned backup directory cannot be removed
    pub fn reindex(&mut self, system: &dyn System, prune: bool) -> Result<()> {
        if !prune {
            return Ok(());
        }

        for dir in sub_directories(system, &self.rollbacks_dir)? {
            if !self.containers.contains_key(&dir) {
                debug!("removing orphaned rollback directory {dir}");
                remove_path(system, &self.rollbacks_dir.join(&dir))?;
            }
        }

        let cwd = self.cwd.clone();
        self.containers.retain(|id, container| {
            container.rollbacks.retain(|entry| {
                entry
                    .rollback_from
                    .as_ref()
                    .is_none_or(|from| system.exists(&resolve(&cwd, Path::new(from))))
            });
            if container.rollbacks.is_empty() {
                debug!("dropping empty rollback {id}");
            }
            !container.rollbacks.is_empty()
        });
        Ok(())
    }

    /// Persist the ledger
    ///
    /// With `prune`, rollbacks beyond `max_rollbacks` are removed oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger file cannot be written
    pub fn save(&mut self, system: &dyn System, prune: bool) -> Result<()> {
        let excess = if self.is_enabled() {
            self.containers.len().saturating_sub(self.max_rollbacks)
        } else {
            0
        };

        if prune && excess > 0 {
            self.remove(system, &RemoveBy::Count(excess), true)?;
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&self.containers)
            .context("Failed to serialize rollbacks")?;
        create_parent_directories(system, &self.ledger_file)?;
        system
            .write(&self.ledger_file, json.as_bytes())
            .with_context(|| {
                format!("Failed to write rollbacks: {}", self.ledger_file.display())
            })?;
        Ok(())
    }

    /// Load the ledger from disk
    ///
    /// A missing or unreadable ledger file yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if `reindex` is set and reindexing fails
    pub fn load(&mut self, system: &dyn System, reindex: bool) -> Result<()> {
        self.containers = if system.is_file(&self.ledger_file) {
            system
                .read_to_string(&self.ledger_file)
                .map_err(anyhow::Error::from)
                .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
                .unwrap_or_else(|e| {
                    warn!(
                        "ignoring unreadable rollbacks file {}: {e}",
                        self.ledger_file.display()
                    );
                    BTreeMap::new()
                })
        } else {
            BTreeMap::new()
        };

        if reindex {
            self.reindex(system, true)?;
        }
        Ok(())
    }

    /// Summaries of every rollback, newest first
    #[must_use]
    pub fn stats(&self) -> Vec<RollbackStat> {
        self.ids()
            .into_iter()
            .rev()
            .filter_map(|id| {
                self.containers.get(&id).map(|container| RollbackStat {
                    timestamp: container.timestamp.clone(),
                    count: container.rollbacks.len(),
                    templates: container
                        .rollbacks
                        .iter()
                        .map(|entry| entry.template.clone())
                        .collect(),
                    id,
                })
            })
            .collect()
    }
}
