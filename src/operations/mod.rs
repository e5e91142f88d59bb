//! Operations module
//!
//! Rendering, injection, rollback and project initialization

pub mod init;
pub mod inject;
pub mod render;
pub mod rollback;

pub use render::{RenderOptions, RenderReport, RenderResult, RenderStatus};

/// Success and failure counts of a batch of file operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub success: usize,
    pub failed: usize,
}

impl Tally {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.success + self.failed
    }
}
