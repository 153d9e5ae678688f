use std::path::Path;
use thiserror::Error;

/// Internal invariant violation.
///
/// This is the fatal channel for defects and unexpected environment
/// failures (permission errors, corrupt UTF-8, a package the map lost
/// track of). It is deliberately separate from the per-operation error
/// taxonomies, which only describe expected resolution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("internal invariant violated: {message}")]
pub struct Bug {
    message: String,
}

impl Bug {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap a filesystem error with the path it happened on.
    #[must_use]
    pub fn io(path: &Path, source: &std::io::Error) -> Self {
        Self::new(format!("{}: {source}", path.display()))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
