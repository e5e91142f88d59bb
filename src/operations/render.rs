//! Render pipeline
//!
//! Configures a template (or every member of a component), renders it, backs
//! up any file it overwrites, writes it, runs its injections and records the
//! run in the rollback ledger.

use super::Tally;
use crate::error::MustrError;
use crate::mustr::Mustr;
use crate::rollback::{RollbackEntry, rollback_id};
use crate::template::{Metadata, Template, TemplateConfig, front_matter};
use crate::utils::fs::{copy_file, create_parent_directories};
use crate::utils::path::{parse_path, relative_path, resolve};
use anyhow::{Context as _, Result};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Options for a single render call
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Output name or path, relative to the output directory
    pub output: Option<String>,
    /// Metadata exposed to the template, overrides front matter
    pub metadata: Metadata,
    /// Configuration overriding registration options and front matter
    pub config: TemplateConfig,
    /// Overwrite existing files, backing them up first
    pub force: bool,
}

impl RenderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(mut self, output: &str) -> Self {
        self.output = Some(output.to_owned());
        self
    }

    #[must_use]
    pub fn metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: TemplateConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn into_config(self) -> TemplateConfig {
        let mut config = self.config;
        config.metadata.extend(self.metadata);
        config
    }
}

/// Outcome of rendering one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStatus {
    /// A new file was created
    Written,
    /// An existing file was replaced; the backup is absent when the ledger is
    /// disabled
    Overwritten { backup: Option<PathBuf> },
    /// The file exists and force was not set
    Skipped,
    /// Rendered without writing
    NoOutput,
}

/// A rendered template and what happened to its output
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub name: String,
    pub template: Template,
    pub status: RenderStatus,
    pub injections: Tally,
}

/// Everything produced by one render call
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    /// Ledger id the run was recorded under
    pub rollback_id: String,
    pub results: Vec<RenderResult>,
    /// Component members that failed, with the reason
    pub failures: Vec<(String, String)>,
}

impl RenderReport {
    /// Number of files written or overwritten
    #[must_use]
    pub fn written(&self) -> usize {
        self.results
            .iter()
            .filter(|result| {
                matches!(
                    result.status,
                    RenderStatus::Written | RenderStatus::Overwritten { .. }
                )
            })
            .count()
    }

    /// Rendered output of the first result
    #[must_use]
    pub fn rendered(&self) -> Option<&str> {
        self.results
            .first()
            .and_then(|result| result.template.rendered.as_deref())
    }
}

/// Whether a component output ends in something that looks like an extension
fn has_extension(output: &str) -> bool {
    output.rsplit_once('.').is_some_and(|(_, ext)| {
        (2..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl Mustr<'_> {
    /// Render a template or component
    ///
    /// Components render each member to `<output>/<member>` in registration
    /// order. A member that fails is logged and reported in
    /// [`RenderReport::failures`] while the others continue.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown, a component output has an
    /// extension, or a standalone template fails to render or write
    pub fn render(&mut self, name: &str, options: RenderOptions) -> Result<RenderReport> {
        let key = self.registry.normalize_name(name);
        if self.registry.components().contains_key(&key) {
            return self.render_component(&key, options);
        }

        if self.registry.templates().is_empty() {
            warn!("no templates are registered, did you run \"mustr init\"?");
        }

        let force = options.force;
        let output = options.output.clone();
        let template = self.configure(&key, output.as_deref(), options.into_config())?;
        self.render_single(&key, template, force)
    }

    /// Render an already configured template
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails
    pub fn render_template(&mut self, template: Template, force: bool) -> Result<RenderReport> {
        let key = self.registry.normalize_name(&template.name);
        self.render_single(&key, template, force)
    }

    fn render_single(&mut self, key: &str, template: Template, force: bool) -> Result<RenderReport> {
        let id = rollback_id(now_millis(), key, None);
        let result = self.render_plan(key, template, force, &id)?;
        self.persist_ledger();
        Ok(RenderReport {
            rollback_id: id,
            results: vec![result],
            failures: Vec::new(),
        })
    }

    fn render_component(&mut self, name: &str, options: RenderOptions) -> Result<RenderReport> {
        if options.output.as_deref().is_some_and(has_extension) {
            return Err(
                MustrError::configuration("component output paths cannot contain extensions.")
                    .into(),
            );
        }

        let members = self
            .registry
            .components()
            .get(name)
            .map(|component| component.templates.clone())
            .unwrap_or_default();

        let force = options.force;
        let output = options.output.clone().filter(|output| !output.is_empty());
        let token = output
            .as_deref()
            .and_then(|output| output.trim_end_matches('/').rsplit('/').next())
            .map(str::to_owned);
        let id = rollback_id(now_millis(), name, token.as_deref());
        let config = options.into_config();

        let mut report = RenderReport {
            rollback_id: id.clone(),
            ..RenderReport::default()
        };

        for member in &members {
            let member_output = output.as_ref().map(|output| format!("{output}/{member}"));
            let outcome = self
                .configure(member, member_output.as_deref(), config.clone())
                .and_then(|mut template| {
                    template.group = Some(name.to_owned());
                    template.component.group = Some(name.to_owned());
                    self.render_plan(member, template, force, &id)
                });

            match outcome {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    error!("failed to generate {member} in component {name}: {e}");
                    report.failures.push((member.clone(), e.to_string()));
                }
            }
        }

        info!("successfully generated component {name}.");
        self.persist_ledger();
        Ok(report)
    }

    fn render_plan(
        &mut self,
        name: &str,
        mut template: Template,
        force: bool,
        id: &str,
    ) -> Result<RenderResult> {
        let output_path = template.output_path.clone().ok_or_else(|| {
            MustrError::template(format!("the template {name} has no output path."))
        })?;
        let relative = self.ledger.record_path(&output_path);

        let partials: BTreeMap<String, String> = template
            .partials
            .iter()
            .filter_map(|(key, partial)| {
                partial
                    .raw
                    .as_deref()
                    .map(|raw| (key.clone(), front_matter::strip(raw)))
            })
            .collect();

        let mapped = self.mapped_paths(&template, &output_path);
        template.component.paths.extend(mapped);

        if let Some(hook) = template.hooks.before_render.clone() {
            hook(&mut template);
        }

        let context = template.context();
        let rendered = self.renderer.render(&template.body, &context, &partials)?;
        template.rendered = Some(rendered);

        if template.config.no_output == Some(true) {
            if let Some(hook) = template.hooks.after_render.clone() {
                hook(&template);
            }
            info!("rendered {name} without output.");
            return Ok(RenderResult {
                name: name.to_owned(),
                template,
                status: RenderStatus::NoOutput,
                injections: Tally::default(),
            });
        }

        let mut entry = RollbackEntry::new(name, relative.clone());
        let backup_dir = self.ledger.backup_dir(id);

        let status = if self.system.exists(&output_path) {
            if !force {
                warn!(
                    "cannot generate the file {relative} exists, use -f from cli or pass force in render options to overwrite."
                );
                return Ok(RenderResult {
                    name: name.to_owned(),
                    template,
                    status: RenderStatus::Skipped,
                    injections: Tally::default(),
                });
            }

            let backup = if self.ledger.is_enabled() {
                let backup = self.backup_path(&backup_dir, &output_path);
                copy_file(self.system, &output_path, &backup)?;
                entry.rollback_from = Some(self.ledger.record_path(&backup));
                Some(backup)
            } else {
                None
            };
            RenderStatus::Overwritten { backup }
        } else {
            RenderStatus::Written
        };

        create_parent_directories(self.system, &output_path)?;
        self.system
            .write(
                &output_path,
                template.rendered.as_deref().unwrap_or_default().as_bytes(),
            )
            .with_context(|| format!("Failed to write file: {}", output_path.display()))?;
        self.ledger.add(id, entry);

        let injections = self.run_injects(name, &template, &output_path, &backup_dir, id);

        if let Some(hook) = template.hooks.after_render.clone() {
            hook(&template);
        }

        if template.is_static && template.group.is_none() {
            info!("successfully generated static template {relative}.");
        } else {
            info!("successfully generated {name} at {relative}.");
        }

        Ok(RenderResult {
            name: name.to_owned(),
            template,
            status,
            injections,
        })
    }

    /// Free backup file name for `target` inside a run directory
    ///
    /// A file can be backed up more than once per run (an overwrite followed
    /// by injections into it), and each copy must keep the bytes it saw.
    fn backup_path(&self, backup_dir: &Path, target: &Path) -> PathBuf {
        let name = format!("{}-{}", now_millis(), parse_path(target).base());
        let mut backup = backup_dir.join(&name);
        let mut copy = 1;
        while self.system.exists(&backup) {
            backup = backup_dir.join(format!("{name}.{copy}"));
            copy += 1;
        }
        backup
    }

    /// Relative import paths for the `from|to` directives of a template
    fn mapped_paths(&self, template: &Template, output_path: &Path) -> Vec<String> {
        let Some(directives) = &template.config.paths else {
            return Vec::new();
        };

        let pick = |value: &str| -> PathBuf {
            if value.is_empty() || value == "self" {
                output_path.to_path_buf()
            } else {
                resolve(&self.paths.output_dir, Path::new(value))
            }
        };

        directives
            .iter()
            .filter_map(|directive| {
                let cleaned: String = directive.chars().filter(|c| !c.is_whitespace()).collect();
                if cleaned.is_empty() {
                    return None;
                }
                let (from, to) = cleaned.split_once('|').unwrap_or((cleaned.as_str(), ""));
                let from = pick(from);
                let to = pick(to);

                let from_dir = from.parent().map(Path::to_path_buf).unwrap_or_default();
                let parsed = parse_path(&relative_path(&from_dir, &to));
                let stripped = if parsed.name == "index" {
                    parsed.dir
                } else {
                    parsed.dir.join(&parsed.name)
                };
                let stripped = stripped.to_string_lossy().into_owned();

                Some(if stripped.starts_with("..") {
                    stripped
                } else {
                    format!("./{stripped}")
                })
            })
            .collect()
    }

    /// Run the injections of a written template, returning the tally
    fn run_injects(
        &mut self,
        name: &str,
        template: &Template,
        output_path: &Path,
        backup_dir: &Path,
        id: &str,
    ) -> Tally {
        let directives = template.config.injects.clone().unwrap_or_default();
        if directives.is_empty() {
            return Tally::default();
        }

        let context = template.context();
        let output_dir = output_path.parent().unwrap_or(output_path);
        let mut tally = Tally::default();

        for directive in &directives {
            let target = if directive.filename == "self" {
                output_path.to_path_buf()
            } else if directive.relative {
                resolve(output_dir, Path::new(&directive.filename))
            } else {
                resolve(&self.paths.output_dir, Path::new(&directive.filename))
            };

            let mut entry = RollbackEntry::new(name, self.ledger.record_path(&target));
            entry.is_inject = true;

            if self.ledger.is_enabled() && self.system.is_file(&target) {
                let backup = self.backup_path(backup_dir, &target);
                if let Err(e) = copy_file(self.system, &target, &backup) {
                    warn!("failed to back up {} before injecting: {e}", target.display());
                    tally.failed += 1;
                    continue;
                }
                entry.rollback_from = Some(self.ledger.record_path(&backup));
            }

            let insert: Result<Vec<String>> = directive
                .insert
                .to_vec()
                .iter()
                .map(|line| self.renderer.render(line, &context, &BTreeMap::new()))
                .collect();

            let outcome = insert.and_then(|insert| self.inject_at(&target, directive, &insert));
            match outcome {
                Ok(_) => {
                    tally.success += 1;
                    self.ledger.add(id, entry);
                }
                Err(e) => {
                    warn!("{e}");
                    tally.failed += 1;
                }
            }
        }

        let total = tally.total();
        if tally.failed == total {
            error!("injection failed for {name}, 0 of {total} succeeded.");
        } else if tally.failed > 0 {
            warn!(
                "injection partially succeeded for {name}, {} of {total} succeeded.",
                tally.success
            );
        } else {
            info!("injection succeeded for {name}, {total} of {total} succeeded.");
        }
        tally
    }

    /// Save the ledger after a run, logging rather than failing
    fn persist_ledger(&mut self) {
        if !self.ledger.is_enabled() {
            return;
        }
        if let Err(e) = self.ledger.save(self.system, true) {
            error!("failed to save rollbacks: {e:#}");
        }
    }
}
