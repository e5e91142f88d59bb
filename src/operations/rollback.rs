//! Undo render runs

use super::Tally;
use crate::error::MustrError;
use crate::mustr::Mustr;
use crate::rollback::{RemoveBy, is_rollback_id};
use crate::template::TemplateConfig;
use crate::utils::fs::{copy_file, remove_path};
use anyhow::Result;
use std::path::Path;
use tracing::{error, info, warn};

impl Mustr<'_> {
    /// Undo a render
    ///
    /// - no target: the most recent ledger entry
    /// - a rollback id: restore every backup and delete every created file of
    ///   that run, then drop it from the ledger
    /// - a template or component name: delete the files a render with the same
    ///   name and `output` would produce
    ///
    /// Individual file failures are counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger is empty, the id is unknown, or the
    /// template cannot be configured
    pub fn rollback(&mut self, target: Option<&str>, output: Option<&str>) -> Result<Tally> {
        let target = match target {
            Some(target) => target.to_owned(),
            None => self.ledger.latest_id().ok_or_else(|| {
                MustrError::rollback("cannot rollback using rollback instance of undefined.")
            })?,
        };

        if is_rollback_id(&target) {
            self.rollback_by_id(&target)
        } else {
            self.rollback_generated(&target, output)
        }
    }

    /// Map a 1-based position in the newest-first listing to its rollback id
    #[must_use]
    pub fn rollback_id_at(&self, index: usize) -> Option<String> {
        let mut ids = self.ledger.ids();
        ids.reverse();
        index.checked_sub(1).and_then(|i| ids.get(i).cloned())
    }

    fn rollback_by_id(&mut self, id: &str) -> Result<Tally> {
        let container = self
            .ledger
            .get(id)
            .cloned()
            .ok_or_else(|| MustrError::rollback(format!("the rollback {id} could not be found.")))?;

        let mut tally = Tally::default();
        for entry in container.rollbacks.iter().rev() {
            let to = self.ledger.resolve(&entry.rollback_to);
            let outcome = match &entry.rollback_from {
                Some(from) => copy_file(self.system, &self.ledger.resolve(from), &to),
                None => remove_path(self.system, &to),
            };
            match outcome {
                Ok(()) => tally.success += 1,
                Err(e) => {
                    warn!("failed to rollback {}: {e:#}", entry.rollback_to);
                    tally.failed += 1;
                }
            }
        }

        if let Err(e) = self
            .ledger
            .remove(self.system, &RemoveBy::Id(id.to_owned()), true)
        {
            error!("failed to remove rollback {id}: {e:#}");
        }

        log_tally(id, tally);
        Ok(tally)
    }

    fn rollback_generated(&mut self, name: &str, output: Option<&str>) -> Result<Tally> {
        let key = self.registry.normalize_name(name);
        let Some(component) = self.registry.components().get(&key).cloned() else {
            let plan = self.configure(&key, output, TemplateConfig::default())?;
            let mut tally = Tally::default();
            if let Some(path) = plan.output_path {
                self.remove_generated(&path, &mut tally);
            }
            log_tally(&key, tally);
            return Ok(tally);
        };

        let mut tally = Tally::default();
        for member in &component.templates {
            let member_output = output.map(|output| format!("{output}/{member}"));
            match self.configure(member, member_output.as_deref(), TemplateConfig::default()) {
                Ok(plan) => {
                    if let Some(path) = plan.output_path {
                        self.remove_generated(&path, &mut tally);
                    }
                }
                Err(e) => {
                    warn!("failed to resolve {member} in component {key}: {e:#}");
                    tally.failed += 1;
                }
            }
        }

        log_tally(&key, tally);
        Ok(tally)
    }

    fn remove_generated(&self, path: &Path, tally: &mut Tally) {
        match remove_path(self.system, path) {
            Ok(()) => tally.success += 1,
            Err(e) => {
                warn!("failed to remove {}: {e:#}", path.display());
                tally.failed += 1;
            }
        }
    }
}

fn log_tally(target: &str, tally: Tally) {
    let total = tally.total();
    if total > 0 && tally.failed == total {
        error!("rollback of {target} failed, 0 of {total} file(s) restored.");
    } else if tally.failed > 0 {
        warn!(
            "rollback of {target} partially succeeded, {} of {total} file(s) restored.",
            tally.success
        );
    } else {
        info!("rollback of {target} succeeded, {total} of {total} file(s) restored.");
    }
}
