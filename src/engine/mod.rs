//! Pluggable template rendering
//!
//! The pipeline only depends on [`Renderer`]; the default implementation is
//! [`HandlebarsRenderer`], which covers Mustache variables, sections and
//! partials.

pub mod handlebars;

pub use self::handlebars::HandlebarsRenderer;

use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;

/// A template engine
pub trait Renderer: Send + Sync {
    /// Render `body` with `context`, resolving `{{> name}}` against `partials`
    ///
    /// # Errors
    ///
    /// Returns an error if the template or one of the partials is invalid
    fn render(
        &self,
        body: &str,
        context: &Value,
        partials: &BTreeMap<String, String>,
    ) -> Result<String>;
}
