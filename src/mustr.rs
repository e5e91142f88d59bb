//! The `Mustr` facade
//!
//! Owns the registries, the rollback ledger and the renderer, and exposes the
//! library API. Rendering, rollback and init live in [`crate::operations`].

use crate::config::{Options, ProjectPaths, RegisterFile};
use crate::engine::{HandlebarsRenderer, Renderer};
use crate::operations::inject::{compile_pattern, inject_file};
use crate::rollback::{Ledger, RemoveBy, RollbackStat};
use crate::system::System;
use crate::template::{
    Component, InjectConfig, Registration, Registry, Template, TemplateConfig, transform_case,
};
use crate::utils::fs::find_files_with_ext;
use crate::utils::path::{display_relative, resolve};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// A scaffolding session bound to a project directory
///
/// Operations are synchronous: a render completes its writes, injections and
/// ledger save before returning.
pub struct Mustr<'src> {
    pub(crate) system: &'src dyn System,
    pub(crate) options: Options,
    pub(crate) paths: ProjectPaths,
    pub(crate) registry: Registry,
    pub(crate) ledger: Ledger,
    pub(crate) renderer: Box<dyn Renderer>,
    loaded: bool,
}

impl<'src> Mustr<'src> {
    /// Create a session rooted at the system's current directory
    ///
    /// Loads templates and the ledger right away when `auto_load` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined or
    /// loading fails
    pub fn new(system: &'src dyn System, options: Options) -> Result<Self> {
        let cwd = system.current_dir()?;
        let paths = ProjectPaths::new(&cwd, &options);
        let mut mustr = Self {
            system,
            registry: Registry::new(cwd, &paths.template_ext),
            ledger: Ledger::new(&paths, options.max_rollbacks),
            renderer: Box::new(HandlebarsRenderer::new()),
            options,
            paths,
            loaded: false,
        };

        if mustr.options.auto_load {
            mustr.load()?;
        }
        Ok(mustr)
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub const fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub const fn templates(&self) -> &BTreeMap<String, Template> {
        self.registry.templates()
    }

    #[must_use]
    pub const fn components(&self) -> &BTreeMap<String, Component> {
        self.registry.components()
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replace the template engine
    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = renderer;
    }

    /// Discover templates, load the ledger and apply the register file
    ///
    /// Runs once; later calls are no-ops. A missing config directory only
    /// logs a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be walked or the
    /// register file is invalid
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        let config_dir = self.paths.config_dir.clone();
        if !self.system.is_dir(&config_dir) {
            warn!(
                "failed to resolve configuration directory at {}, need to run \"mustr init\"?",
                display_relative(&self.paths.cwd, &config_dir)
            );
            return Ok(());
        }

        let template_paths: Vec<_> =
            find_files_with_ext(self.system, &config_dir, &self.paths.template_ext)?
                .into_iter()
                .filter(|path| !path.starts_with(&self.paths.rollbacks_dir))
                .collect();
        debug!("discovered {} template file(s)", template_paths.len());
        self.registry.set_template_paths(template_paths.clone());

        if self.ledger.is_enabled() {
            self.ledger.load(self.system, false)?;
        }

        if self.options.auto_register {
            for path in &template_paths {
                let source = path.to_string_lossy();
                self.registry
                    .register(self.system, None, Some(&source), TemplateConfig::default())?;
            }
        }

        if self.system.is_file(&self.paths.register_file) {
            let register = RegisterFile::load_from_file(self.system, &self.paths.register_file)?;
            self.apply_register(register)?;
        }

        self.loaded = true;
        Ok(())
    }

    fn apply_register(&mut self, register: RegisterFile) -> Result<()> {
        for config in register.templates {
            let name = config.name.clone();
            self.registry
                .register(self.system, name.as_deref(), None, config)?;
        }
        for component in register.components {
            self.registry
                .register_component(&component.name, &component.templates);
        }
        Ok(())
    }

    /// Register a template, see [`Registry::register`]
    ///
    /// # Errors
    ///
    /// Returns an error if a template or partial file path does not exist
    pub fn register(
        &mut self,
        name: &str,
        source: Option<&str>,
        config: TemplateConfig,
    ) -> Result<Option<Registration<'_>>> {
        self.registry
            .register(self.system, Some(name), source, config)
    }

    /// Register a component, see [`Registry::register_component`]
    pub fn register_component<I, S>(&mut self, name: &str, templates: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.register_component(name, templates)
    }

    /// Alias of [`Mustr::register_component`]
    pub fn register_group<I, S>(&mut self, name: &str, templates: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.register_component(name, templates)
    }

    /// Build the render plan for a template, see [`Registry::configure`]
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or its source unreadable
    pub fn configure(
        &self,
        name: &str,
        output: Option<&str>,
        config: TemplateConfig,
    ) -> Result<Template> {
        self.registry
            .configure(self.system, &self.paths, name, output, config)
    }

    /// Run an injection directive against a file below the output directory
    ///
    /// Insert lines are used verbatim. Returns the number of matching lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the target file does not exist or the pattern is
    /// invalid
    pub fn inject(&self, directive: &InjectConfig) -> Result<usize> {
        let target = resolve(&self.paths.output_dir, Path::new(&directive.filename));
        self.inject_at(&target, directive, &directive.insert.to_vec())
    }

    pub(crate) fn inject_at(
        &self,
        target: &Path,
        directive: &InjectConfig,
        insert: &[String],
    ) -> Result<usize> {
        let find = compile_pattern(&directive.find)?;
        let matches = inject_file(self.system, target, &find, directive.strategy, insert)?;
        info!(
            "injected: {} line(s) in: {}",
            insert.len(),
            target
                .file_name()
                .map_or_else(|| target.display().to_string(), |name| name.to_string_lossy().into_owned())
        );
        Ok(matches)
    }

    /// Transform `value` to the casing named by `mode`
    #[must_use]
    pub fn transform_case(&self, value: &str, mode: &str) -> String {
        transform_case(value, mode)
    }

    /// Remove rollbacks by id, count or date
    ///
    /// # Errors
    ///
    /// Returns an error if backups cannot be removed or the ledger saved
    pub fn remove_rollbacks(&mut self, by: &RemoveBy, persist: bool) -> Result<usize> {
        self.ledger.remove(self.system, by, persist)
    }

    /// Reconcile the ledger with the backups on disk
    ///
    /// # Errors
    ///
    /// Returns an error if orphaned backups cannot be removed
    pub fn reindex_rollbacks(&mut self, prune: bool) -> Result<()> {
        self.ledger.reindex(self.system, prune)
    }

    /// Persist the ledger, pruning beyond `max_rollbacks` when asked
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger file cannot be written
    pub fn save_rollbacks(&mut self, prune: bool) -> Result<()> {
        self.ledger.save(self.system, prune)
    }

    /// Reload the ledger from disk
    ///
    /// # Errors
    ///
    /// Returns an error if reindexing fails
    pub fn load_rollbacks(&mut self, reindex: bool) -> Result<()> {
        self.ledger.load(self.system, reindex)
    }

    /// Rollback summaries, newest first
    #[must_use]
    pub fn rollback_stats(&self) -> Vec<RollbackStat> {
        self.ledger.stats()
    }
}
