//! Result and error types for Formprobe.

use crate::selector::SelectorAlternatives;
use thiserror::Error;

/// Result type for Formprobe operations
pub type FormprobeResult<T> = Result<T, FormprobeError>;

/// Errors that can occur in Formprobe
#[derive(Debug, Error)]
pub enum FormprobeError {
    /// Caller passed unusable input (empty selector chain or set)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// No alternative resolved to an element
    #[error("Could not find element for selectors: {selectors}{}", format_failures(.failures))]
    NotFound {
        /// Every alternative that was tried
        selectors: SelectorAlternatives,
        /// One entry per failed alternative, in the order they were tried
        failures: Vec<String>,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waited_for: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Input simulation error
    #[error("Input simulation failed: {message}")]
    InputError {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// Scenario file is malformed or inconsistent
    #[error("Invalid scenario: {message}")]
    ScenarioError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl FormprobeError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Create a scenario error
    #[must_use]
    pub fn scenario(message: impl Into<String>) -> Self {
        Self::ScenarioError {
            message: message.into(),
        }
    }

    /// Whether this error is a deadline expiry
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this error means nothing matched
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn format_failures(failures: &[String]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    format!(" ({})", failures.join("; "))
}
