//! Template and component data model
//!
//! A [`Template`] is created by registration, then materialized into a render
//! plan by [`Registry::configure`]. Registration options, render options and
//! front matter all share the [`TemplateConfig`] shape.

pub mod casing;
pub mod configure;
pub mod front_matter;
pub mod registry;

pub use casing::{Casing, transform_case};
pub use registry::{Registration, Registry};

use crate::operations::inject::Strategy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Arbitrary template metadata passed to the renderer
pub type Metadata = serde_json::Map<String, Value>;

/// Hook invoked with the configured template right before rendering
pub type BeforeRender = Arc<dyn Fn(&mut Template) + Send + Sync>;

/// Hook invoked after the template has been written
pub type AfterRender = Arc<dyn Fn(&Template) + Send + Sync>;

/// Key under which computed component metadata is exposed to templates
pub const COMPONENT_KEY: &str = "$component";

/// Either a single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Flatten into a list
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value.clone()],
            Self::Many(values) => values.clone(),
        }
    }
}

/// Partial references: a name, a list of names, or an alias to reference map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartialRefs {
    One(String),
    Many(Vec<String>),
    Named(BTreeMap<String, String>),
}

impl From<&str> for PartialRefs {
    fn from(value: &str) -> Self {
        Self::One(value.to_owned())
    }
}

impl From<Vec<String>> for PartialRefs {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

impl From<&[&str]> for PartialRefs {
    fn from(value: &[&str]) -> Self {
        Self::Many(value.iter().map(|v| (*v).to_owned()).collect())
    }
}

impl From<BTreeMap<String, String>> for PartialRefs {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Named(value)
    }
}

/// An injection directive attached to a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectConfig {
    /// Target file, `self` for the template's own output
    pub filename: String,

    /// Regular expression matched against each line
    pub find: String,

    /// Where to insert relative to matching lines
    #[serde(default)]
    pub strategy: Strategy,

    /// Lines to insert, rendered with the template metadata first
    pub insert: OneOrMany,

    /// Resolve `filename` against the template's output directory
    #[serde(default)]
    pub relative: bool,
}

impl InjectConfig {
    /// Create an injection directive
    #[must_use]
    pub fn new(filename: &str, find: &str, strategy: Strategy, insert: Vec<String>) -> Self {
        Self {
            filename: filename.to_owned(),
            find: find.to_owned(),
            strategy,
            insert: OneOrMany::Many(insert),
            relative: false,
        }
    }
}

/// Template configuration shared by registration, render options and front matter
///
/// Every field is optional so layers can be merged with [`TemplateConfig::or`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    /// Registration name (register file only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Template source: a path ending in the template extension, a discovered
    /// template name or an inline template string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Extension used for the rendered file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,

    /// Type suffix such as `component` or `service`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Append the type to the output file name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_type: Option<bool>,

    /// Casing applied to the component name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub casing: Option<String>,

    /// Casing applied to the output file name (default `lower`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_casing: Option<String>,

    /// Replacement output file name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,

    /// Base directory for the output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Static output path, bypasses output name resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partials: Option<PartialRefs>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub injects: Option<Vec<InjectConfig>>,

    /// Mapped path directives in `from|to` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: Metadata,

    /// Render without writing a file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_output: Option<bool>,
}

impl TemplateConfig {
    /// Layer `self` over `lower`: fields set on `self` win, metadata is merged
    #[must_use]
    pub fn or(self, lower: Self) -> Self {
        let mut metadata = lower.metadata;
        metadata.extend(self.metadata);
        Self {
            name: self.name.or(lower.name),
            template: self.template.or(lower.template),
            ext: self.ext.or(lower.ext),
            kind: self.kind.or(lower.kind),
            append_type: self.append_type.or(lower.append_type),
            casing: self.casing.or(lower.casing),
            filename_casing: self.filename_casing.or(lower.filename_casing),
            rename: self.rename.or(lower.rename),
            output_dir: self.output_dir.or(lower.output_dir),
            output_path: self.output_path.or(lower.output_path),
            partials: self.partials.or(lower.partials),
            injects: self.injects.or(lower.injects),
            paths: self.paths.or(lower.paths),
            metadata,
            no_output: self.no_output.or(lower.no_output),
        }
    }
}

/// Computed metadata about the generated output, exposed as `$component`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMeta {
    pub name: String,
    pub fullname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub ext: String,
    pub path: String,
    pub paths: Vec<String>,
}

/// Render hooks registered through [`Registration`]
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_render: Option<BeforeRender>,
    pub after_render: Option<AfterRender>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_render", &self.before_render.is_some())
            .field("after_render", &self.after_render.is_some())
            .finish()
    }
}

/// A named generation unit
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Template {
    /// Template name, the file stem for file-backed templates
    pub name: String,
    /// Source file, absent for inline templates
    pub path: Option<PathBuf>,
    /// Source file without the template extension
    pub path_normalized: Option<PathBuf>,
    /// Unparsed source including front matter
    pub raw: Option<String>,
    /// Extension embedded in the source file name (`db.ts.tpl` -> `.ts`)
    pub ext: Option<String>,
    /// Source with front matter removed
    pub body: String,
    pub metadata: Metadata,
    pub component: ComponentMeta,
    pub partials: BTreeMap<String, Template>,
    pub config: TemplateConfig,
    pub output_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub output_relative: Option<String>,
    pub rendered: Option<String>,
    pub is_absolute: bool,
    pub is_partial: bool,
    pub is_static: bool,
    pub group: Option<String>,
    pub hooks: Hooks,
}

impl Template {
    /// Rendering context: the metadata plus the `$component` record
    #[must_use]
    pub fn context(&self) -> Value {
        let mut context = self.metadata.clone();
        context.insert(
            COMPONENT_KEY.to_owned(),
            serde_json::to_value(&self.component).unwrap_or(Value::Null),
        );
        Value::Object(context)
    }
}

/// A named, ordered group of templates rendered together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub templates: Vec<String>,
}
