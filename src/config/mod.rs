//! Configuration management module
//!
//! Handles the project options file, the register file and JSON schema
//! validation of the latter.

pub mod register;
pub mod schema;
pub mod yaml;

pub use register::RegisterFile;

use crate::system::System;
use crate::utils::path::{normalize_ext, resolve};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default project options file name
pub const PROJECT_FILE: &str = "mustr.yaml";

/// Register file name inside the config directory
pub const REGISTER_FILE: &str = "register.yaml";

/// Ledger file name inside the config directory
pub const LEDGER_FILE: &str = "rollbacks.json";

/// Backup directory name inside the config directory
pub const ROLLBACKS_DIR: &str = "rollbacks";

/// Project options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Directory holding templates, the register file and rollbacks
    pub config_dir: String,

    /// Base directory for generated files
    pub output_dir: String,

    /// Extension marking template files
    pub template_ext: String,

    /// Discover templates and load the ledger on construction
    pub auto_load: bool,

    /// Register every discovered template under its file stem
    pub auto_register: bool,

    /// Rollbacks kept in the ledger, 0 disables it
    pub max_rollbacks: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config_dir: "./mustr".to_owned(),
            output_dir: "./src".to_owned(),
            template_ext: ".tpl".to_owned(),
            auto_load: true,
            auto_register: true,
            max_rollbacks: 15,
        }
    }
}

impl Options {
    /// Load options from a YAML (or JSON) file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or invalid
    pub fn load_from_file(system: &dyn System, path: &Path) -> anyhow::Result<Self> {
        yaml::load_options(system, path)
    }

    /// Load options from `path`, falling back to defaults when it is missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid
    pub fn load_or_default(system: &dyn System, path: &Path) -> anyhow::Result<Self> {
        if system.is_file(path) {
            Self::load_from_file(system, path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Absolute project paths derived from [`Options`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub cwd: PathBuf,
    pub config_dir: PathBuf,
    pub output_dir: PathBuf,
    pub register_file: PathBuf,
    pub ledger_file: PathBuf,
    pub rollbacks_dir: PathBuf,
    pub template_ext: String,
}

impl ProjectPaths {
    #[must_use]
    pub fn new(cwd: &Path, options: &Options) -> Self {
        let config_dir = resolve(cwd, Path::new(&options.config_dir));
        Self {
            cwd: cwd.to_path_buf(),
            output_dir: resolve(cwd, Path::new(&options.output_dir)),
            register_file: config_dir.join(REGISTER_FILE),
            ledger_file: config_dir.join(LEDGER_FILE),
            rollbacks_dir: config_dir.join(ROLLBACKS_DIR),
            template_ext: normalize_ext(&options.template_ext),
            config_dir,
        }
    }
}
