//! Template and component registries

use super::{AfterRender, BeforeRender, Component, PartialRefs, Template, TemplateConfig};
use crate::error::MustrError;
use crate::system::System;
use crate::utils::path::{parse_path, resolve};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registered templates and components
///
/// Template and component names share one namespace; a name taken in one
/// registry cannot be registered in the other.
#[derive(Debug, Clone)]
pub struct Registry {
    cwd: PathBuf,
    template_ext: String,
    template_paths: Vec<PathBuf>,
    templates: BTreeMap<String, Template>,
    components: BTreeMap<String, Component>,
}

impl Registry {
    /// Create an empty registry resolving relative paths against `cwd`
    #[must_use]
    pub fn new(cwd: PathBuf, template_ext: &str) -> Self {
        Self {
            cwd,
            template_ext: template_ext.to_owned(),
            template_paths: Vec::new(),
            templates: BTreeMap::new(),
            components: BTreeMap::new(),
        }
    }

    /// Replace the list of discovered template files
    pub fn set_template_paths(&mut self, paths: Vec<PathBuf>) {
        self.template_paths = paths;
    }

    #[must_use]
    pub fn template_paths(&self) -> &[PathBuf] {
        &self.template_paths
    }

    #[must_use]
    pub const fn templates(&self) -> &BTreeMap<String, Template> {
        &self.templates
    }

    #[must_use]
    pub const fn components(&self) -> &BTreeMap<String, Component> {
        &self.components
    }

    #[must_use]
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(&self.normalize_name(name))
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(&self.normalize_name(name))
    }

    #[must_use]
    pub const fn template_ext(&self) -> &str {
        self.template_ext.as_str()
    }

    #[must_use]
    pub const fn cwd(&self) -> &PathBuf {
        &self.cwd
    }

    /// Canonical registry key: lowercased, template extension and leading
    /// `./` or `/` removed
    #[must_use]
    pub fn normalize_name(&self, name: &str) -> String {
        let lowered = name.trim().to_lowercase();
        let ext = self.template_ext.to_lowercase();
        let stripped = lowered.strip_suffix(ext.as_str()).unwrap_or(&lowered);
        stripped
            .strip_prefix("./")
            .or_else(|| stripped.strip_prefix('/'))
            .unwrap_or(stripped)
            .to_owned()
    }

    /// File name of a discovered template without the template extension
    fn stem(&self, path: &Path) -> String {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        file_name
            .strip_suffix(self.template_ext.as_str())
            .unwrap_or(&file_name)
            .to_owned()
    }

    /// Turn a template source into a [`Template`]
    ///
    /// - a source ending in the template extension is a file path resolved
    ///   against the working directory, and must exist
    /// - a source without front matter or tags names a discovered template,
    ///   matched case-insensitively by file stem
    /// - anything else is an inline template
    ///
    /// Returns `Ok(None)` when a name matches no discovered template.
    ///
    /// # Errors
    ///
    /// Returns an error if a template file path does not exist
    pub fn normalize(&self, system: &dyn System, source: &str) -> Result<Option<Template>> {
        let has_front_matter = source.contains("---");
        let has_tags = source.contains("{{");

        let path = if source.ends_with(self.template_ext.as_str()) {
            let path = resolve(&self.cwd, Path::new(source));
            if !system.is_file(&path) {
                return Err(MustrError::template(format!(
                    "failed to resolve static template at path {source}. Exclude '{}' from template name to reference loaded template.",
                    self.template_ext
                ))
                .into());
            }
            path
        } else if !has_front_matter && !has_tags {
            let wanted = source.to_lowercase();
            let Some(found) = self
                .template_paths
                .iter()
                .find(|path| self.stem(path).to_lowercase() == wanted)
            else {
                warn!("failed to resolve template for name {source}.");
                return Ok(None);
            };
            found.clone()
        } else {
            return Ok(Some(Template {
                raw: Some(source.to_owned()),
                is_static: true,
                ..Template::default()
            }));
        };

        let stem = self.stem(&path);
        let normalized = path.with_file_name(&stem);
        let ext = parse_path(&normalized).ext.to_lowercase();

        Ok(Some(Template {
            name: stem.to_lowercase(),
            path: Some(path),
            path_normalized: Some(normalized),
            ext: (!ext.is_empty()).then_some(ext),
            ..Template::default()
        }))
    }

    /// Register a template under `name`
    ///
    /// The name falls back to `config.name`, the source to `config.template`
    /// and then to the name itself. Registering an existing template name
    /// replaces it.
    ///
    /// Returns `Ok(None)` and logs a warning when the source cannot be
    /// resolved or the name is taken by a component.
    ///
    /// # Errors
    ///
    /// Returns an error if a template or partial file path does not exist
    pub fn register<'a>(
        &'a mut self,
        system: &'a dyn System,
        name: Option<&str>,
        source: Option<&str>,
        mut config: TemplateConfig,
    ) -> Result<Option<Registration<'a>>> {
        let name = name
            .or(config.name.as_deref())
            .map(|name| self.normalize_name(name));
        let source = source
            .map(str::to_owned)
            .or_else(|| config.template.clone())
            .or_else(|| name.clone());

        let Some(source) = source else {
            warn!("cannot register template without a name or template source.");
            return Ok(None);
        };

        let Some(mut template) = self.normalize(system, &source)? else {
            warn!(
                "template {} could NOT be normalized registration halted.",
                name.as_deref().unwrap_or(&source)
            );
            return Ok(None);
        };

        let Some(name) = name.or_else(|| (!template.name.is_empty()).then(|| template.name.clone()))
        else {
            warn!("cannot register inline template without a name.");
            return Ok(None);
        };

        if self.components.contains_key(&name) {
            warn!("cannot register template {name}, the name is used by a component.");
            return Ok(None);
        }

        let partials = config.partials.take();
        config.name = None;
        config.template = None;
        template.metadata = std::mem::take(&mut config.metadata);
        template.config = config;
        if template.name.is_empty() {
            template.name.clone_from(&name);
        }

        debug!("registered template {name}");
        self.templates.insert(name.clone(), template);

        let mut registration = Registration {
            registry: self,
            system,
            name,
        };
        if let Some(partials) = partials {
            registration = registration.partials(partials)?;
        }
        Ok(Some(registration))
    }

    /// Register a component grouping existing templates
    ///
    /// Unknown template names are dropped with a warning. Returns `false` when
    /// no templates remain or the name is taken by a template.
    pub fn register_component<I, S>(&mut self, name: &str, templates: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = self.normalize_name(name);
        let requested: Vec<String> = templates
            .into_iter()
            .map(|template| self.normalize_name(template.as_ref()))
            .collect();

        if requested.is_empty() {
            warn!("cannot have a component group without any templates.");
            return false;
        }

        if self.templates.contains_key(&name) {
            warn!("cannot register component {name}, the name is used by a template.");
            return false;
        }

        let mut kept = Vec::with_capacity(requested.len());
        for template in requested {
            if self.templates.contains_key(&template) {
                kept.push(template);
            } else {
                warn!("excluding template {template} from component {name}, template not found.");
            }
        }

        if kept.is_empty() {
            warn!("cannot register component {name}, none of its templates are registered.");
            return false;
        }

        debug!("registered component {name} with templates {}", kept.join(", "));
        self.components.insert(
            name.clone(),
            Component {
                name,
                templates: kept,
            },
        );
        true
    }

    /// Resolve a single partial reference
    ///
    /// A registered template is reused as is, anything else goes through
    /// [`Registry::normalize`].
    ///
    /// # Errors
    ///
    /// Returns an error if a partial file path does not exist
    pub fn resolve_partial(&self, system: &dyn System, reference: &str) -> Result<Option<Template>> {
        let key = self.normalize_name(reference);
        if let Some(existing) = self.templates.get(&key) {
            return Ok(Some(existing.clone()));
        }

        let Some(mut partial) = self.normalize(system, reference)? else {
            warn!("the partial {key} could not be normalized.");
            return Ok(None);
        };
        partial.is_partial = true;
        if partial.name.is_empty() {
            partial.name = key;
        }
        Ok(Some(partial))
    }

    /// Resolve partial references into `(partial name, template)` pairs
    ///
    /// Aliased references are keyed by their lowercased alias.
    ///
    /// # Errors
    ///
    /// Returns an error if a partial file path does not exist
    pub fn resolve_partials(
        &self,
        system: &dyn System,
        refs: &PartialRefs,
    ) -> Result<Vec<(String, Template)>> {
        let mut resolved = Vec::new();
        match refs {
            PartialRefs::Named(named) => {
                for (alias, reference) in named {
                    if let Some(partial) = self.resolve_partial(system, reference)? {
                        resolved.push((alias.to_lowercase(), partial));
                    }
                }
            }
            PartialRefs::One(reference) => {
                if let Some(partial) = self.resolve_partial(system, reference)? {
                    resolved.push((partial.name.clone(), partial));
                }
            }
            PartialRefs::Many(references) => {
                for reference in references {
                    if let Some(partial) = self.resolve_partial(system, reference)? {
                        resolved.push((partial.name.clone(), partial));
                    }
                }
            }
        }
        Ok(resolved)
    }
}

/// Handle returned by [`Registry::register`] to attach partials and hooks
pub struct Registration<'a> {
    registry: &'a mut Registry,
    system: &'a dyn System,
    name: String,
}

impl Registration<'_> {
    /// Registered template name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registered template
    #[must_use]
    pub fn template(&self) -> Option<&Template> {
        self.registry.templates.get(&self.name)
    }

    /// Attach partials to the registered template
    ///
    /// # Errors
    ///
    /// Returns an error if a partial file path does not exist
    pub fn partials(self, refs: impl Into<PartialRefs>) -> Result<Self> {
        let resolved = self.registry.resolve_partials(self.system, &refs.into())?;
        if let Some(template) = self.registry.templates.get_mut(&self.name) {
            template.partials.extend(resolved);
        }
        Ok(self)
    }

    /// Run `hook` with the configured template right before it is rendered
    #[must_use]
    pub fn before_render(self, hook: impl Fn(&mut Template) + Send + Sync + 'static) -> Self {
        let hook: BeforeRender = Arc::new(hook);
        if let Some(template) = self.registry.templates.get_mut(&self.name) {
            template.hooks.before_render = Some(hook);
        }
        self
    }

    /// Run `hook` after the template has been written
    #[must_use]
    pub fn after_render(self, hook: impl Fn(&Template) + Send + Sync + 'static) -> Self {
        let hook: AfterRender = Arc::new(hook);
        if let Some(template) = self.registry.templates.get_mut(&self.name) {
            template.hooks.after_render = Some(hook);
        }
        self
    }
}
