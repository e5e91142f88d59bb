//! Output path resolution
//!
//! [`Registry::configure`] materializes a registered template into a render
//! plan: source loaded, front matter merged, output path and component
//! metadata computed. The registry is left untouched, so configuring the same
//! template twice with the same inputs yields the same plan.

use super::front_matter;
use super::{COMPONENT_KEY, ComponentMeta, Registry, Template, TemplateConfig, transform_case};
use crate::config::ProjectPaths;
use crate::error::MustrError;
use crate::system::System;
use crate::utils::path::{normalize_ext, parse_path, relative_path, resolve};
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Casing applied to output file names unless configured otherwise
pub const DEFAULT_FILENAME_CASING: &str = "lower";

/// Casing applied to component names when a type is set
pub const DEFAULT_TYPED_CASING: &str = "title";

impl Registry {
    /// Build the render plan for template `name` written to `output`
    ///
    /// `output` defaults to the template name. Configuration precedence, from
    /// highest: `options`, registration options, front matter. An extension on
    /// `output` wins over every configured extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, the template is not registered,
    /// or its source cannot be read
    pub fn configure(
        &self,
        system: &dyn System,
        paths: &ProjectPaths,
        name: &str,
        output: Option<&str>,
        mut options: TemplateConfig,
    ) -> Result<Template> {
        let name = self.normalize_name(name);
        if name.is_empty() {
            return Err(MustrError::template(
                "cannot generate template using template name or output name of undefined.",
            )
            .into());
        }

        let stored = self.templates().get(&name).ok_or_else(|| {
            MustrError::template(format!("the template {name} could not be found."))
        })?;
        let mut template = stored.clone();

        let render_metadata = std::mem::take(&mut options.metadata);

        if let Some(path) = &template.path {
            template.raw = Some(
                system
                    .read_to_string(path)
                    .with_context(|| format!("Failed to read template: {}", path.display()))?,
            );
        }
        let raw = template.raw.clone().ok_or_else(|| {
            MustrError::template("cannot generate template with raw template string of undefined.")
        })?;
        let matter = front_matter::parse(&raw);

        let mut metadata = matter.attributes;
        metadata.extend(std::mem::take(&mut template.metadata));
        metadata.extend(render_metadata);
        metadata.remove(COMPONENT_KEY);

        template.body = matter.body;
        template.metadata = metadata;
        template.config = options.or(template.config).or(matter.config);

        if let Some(refs) = template.config.partials.take() {
            template
                .partials
                .extend(self.resolve_partials(system, &refs)?);
        }
        load_partial_sources(system, &mut template)?;

        let output = output.map_or_else(|| name.clone(), str::to_owned);
        let config = &template.config;

        let output_dir = match (&config.output_dir, &config.output_path) {
            (Some(dir), _) => resolve(&paths.cwd, Path::new(dir)),
            (None, Some(_)) => paths.cwd.clone(),
            (None, None) => paths.output_dir.clone(),
        };

        let (output_path, component) = if let Some(static_path) = &config.output_path {
            let output_path = resolve(&output_dir, Path::new(static_path));
            let parsed = parse_path(&output_path);
            let component = ComponentMeta {
                name: parsed.name.clone(),
                fullname: parsed.name,
                ext: parsed.ext,
                path: relative_path(&paths.cwd, &output_path)
                    .to_string_lossy()
                    .into_owned(),
                ..ComponentMeta::default()
            };
            (output_path, component)
        } else {
            resolve_output(&template, &output_dir, &output)
        };

        template.is_absolute = template.config.output_path.is_some();
        template.output_relative = Some(component.path.clone());
        template.component = component;
        template.output_dir = Some(output_dir);
        template.output_path = Some(output_path);
        Ok(template)
    }
}

/// Read the sources of file-backed partials
fn load_partial_sources(system: &dyn System, template: &mut Template) -> Result<()> {
    for partial in template.partials.values_mut() {
        if let Some(path) = &partial.path {
            partial.raw = Some(
                system
                    .read_to_string(path)
                    .with_context(|| format!("Failed to read partial: {}", path.display()))?,
            );
        }
    }
    Ok(())
}

/// Compute the output path and component metadata for a named output
fn resolve_output(template: &Template, output_dir: &Path, output: &str) -> (PathBuf, ComponentMeta) {
    let config = &template.config;
    let parsed = parse_path(Path::new(output));

    let ext = if !parsed.ext.is_empty() {
        parsed.ext.clone()
    } else if let Some(ext) = &config.ext {
        normalize_ext(ext)
    } else {
        template.ext.clone().unwrap_or_default()
    };

    let mut output_name = config.rename.clone().unwrap_or_else(|| parsed.name.clone());
    let dir_name = parsed
        .dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    let mut name = match (&config.kind, dir_name) {
        (Some(_), Some(dir_name)) => dir_name,
        _ => output_name.clone(),
    };
    let mut fullname = name.clone();

    if let Some(kind) = &config.kind {
        fullname = format!("{name} {kind}");
        if config.append_type == Some(true) {
            output_name = format!("{output_name}.{kind}");
        }
    }

    if config.casing.is_some() || config.kind.is_some() {
        let casing = config.casing.as_deref().unwrap_or(DEFAULT_TYPED_CASING);
        name = transform_case(&name, casing);
        fullname = transform_case(&fullname, casing);
    }

    let filename_casing = config
        .filename_casing
        .as_deref()
        .unwrap_or(DEFAULT_FILENAME_CASING);
    let file_name = format!("{}{ext}", transform_case(&output_name, filename_casing));
    let relative = PathBuf::from(parsed.dir.to_string_lossy().to_lowercase()).join(file_name);
    let output_path = resolve(output_dir, &relative);

    let component = ComponentMeta {
        name,
        fullname,
        ext,
        path: relative_path(output_dir, &output_path)
            .to_string_lossy()
            .into_owned(),
        ..ComponentMeta::default()
    };
    (output_path, component)
}
