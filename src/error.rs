//! Error types for the aeo-runner workflow service.
//!
//! Only run-level failures live here. Individual provider failures are
//! absorbed by the fan-out as [`aeo_search::ProviderPayload::Error`] and never
//! become a [`RunnerError`].
//!
//! The display text of a variant is what a failed run reports as its
//! `error`, so run-fatal variants keep their messages short and specific.

/// Top-level error type for the workflow runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A required input or credential is missing.
    #[error("{0}")]
    Precondition(String),

    /// The product catalogue returned an error or no data.
    #[error("{0}")]
    Upstream(String),

    /// The translation model failed.
    #[error("Translation error: {0}")]
    Translation(String),

    /// The requested workflow is not in the closed set this runner executes.
    #[error("Unsupported workflow: {0}")]
    UnsupportedWorkflow(String),

    /// A result artifact could not be written.
    #[error("export error: {0}")]
    Export(String),

    /// A run state transition was attempted out of order.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// No run, workflow or artifact with the given identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Answer engine or search client error outside the fan-out.
    #[error(transparent)]
    Search(#[from] aeo_search::SearchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_message_is_bare() {
        let err = RunnerError::Precondition("product_id is required".into());
        assert_eq!(err.to_string(), "product_id is required");
    }

    #[test]
    fn translation_message_is_prefixed() {
        let err = RunnerError::Translation("OpenAI API error: 500".into());
        assert_eq!(err.to_string(), "Translation error: OpenAI API error: 500");
    }

    #[test]
    fn unsupported_workflow_names_the_id() {
        let err = RunnerError::UnsupportedWorkflow("nope".into());
        assert_eq!(err.to_string(), "Unsupported workflow: nope");
    }

    #[test]
    fn search_errors_pass_through() {
        let err: RunnerError = aeo_search::SearchError::Provider("serpapi HTTP 401: bad".into()).into();
        assert_eq!(err.to_string(), "provider error: serpapi HTTP 401: bad");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RunnerError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
