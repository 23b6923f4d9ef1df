//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The scenario ran to completion but its assertion did not hold
    #[error("Scenario failed: {title}")]
    ScenarioFailed {
        /// Scenario title
        title: String,
    },

    /// Formprobe library error
    #[error("{0}")]
    Formprobe(#[from] formprobe::FormprobeError),

    /// Report serialization error
    #[error("Report generation failed: {0}")]
    Report(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a scenario failure
    #[must_use]
    pub fn scenario_failed(title: impl Into<String>) -> Self {
        Self::ScenarioFailed {
            title: title.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_scenario_failed() {
        let err = CliError::scenario_failed("form-test-short-name");
        assert_eq!(err.to_string(), "Scenario failed: form-test-short-name");
    }

    #[test]
    fn test_library_error_passes_through() {
        let err: CliError = formprobe::FormprobeError::scenario("scenario has no steps").into();
        assert_eq!(err.to_string(), "Invalid scenario: scenario has no steps");
    }
}
