//! Custom error types with exit codes

use thiserror::Error;

/// Main error type for mustr operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MustrError {
    /// Configuration Error - missing or invalid project configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Template Error - template could not be resolved or configured
    #[error("Template error: {message}")]
    Template { message: String },

    /// Render Error - the rendering engine rejected a template
    #[error("Render error: {message}")]
    Render { message: String },

    /// Rollback Error - rollback target could not be resolved
    #[error("Rollback error: {message}")]
    Rollback { message: String },

    /// Filesystem Error - file operation failed
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },

    /// Inject Error - injection target missing or pattern invalid
    #[error("Inject error: {message}")]
    Inject { message: String },
}

impl MustrError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::Template { .. } => 2,
            Self::Render { .. } => 3,
            Self::Rollback { .. } => 4,
            Self::Filesystem { .. } => 5,
            Self::Inject { .. } => 6,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a template error
    #[inline]
    pub fn template<S: Into<String>>(message: S) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create a render error
    #[inline]
    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Create a rollback error
    #[inline]
    pub fn rollback<S: Into<String>>(message: S) -> Self {
        Self::Rollback {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }

    /// Create an inject error
    #[inline]
    pub fn inject<S: Into<String>>(message: S) -> Self {
        Self::Inject {
            message: message.into(),
        }
    }
}
