//! Register file model
//!
//! `<configDir>/register.yaml` declares templates with their options and the
//! components grouping them.

use crate::system::System;
use crate::template::{Component, TemplateConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parsed register file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterFile {
    /// Templates to register, each named by `name`
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,

    /// Components to register after the templates
    #[serde(default)]
    pub components: Vec<Component>,
}

impl RegisterFile {
    /// Load and validate a register file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid
    pub fn load_from_file(system: &dyn System, path: &Path) -> Result<Self> {
        super::yaml::load_register(system, path)
    }
}
