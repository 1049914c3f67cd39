pub mod types;
pub mod vocabulary;
pub mod builder;
pub mod prompt;
pub mod generator;
pub mod parser;
pub mod confidence;
pub mod fallback;
pub mod rules;
pub mod backend;
pub mod engine;
pub mod orchestrator;

pub use types::*;
pub use vocabulary::*;
pub use builder::*;
pub use prompt::*;
pub use generator::*;
pub use parser::*;
pub use confidence::*;
pub use fallback::*;
pub use rules::*;
pub use backend::*;
pub use engine::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriageError {
    /// Nothing to classify: no description and no recognised checked symptom.
    #[error("Invalid symptom input: {0}")]
    InvalidInput(String),

    /// The engine has no endpoint or credential, or rejected the credential.
    #[error("Triage engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Triage engine transport error: {0}")]
    EngineTransport(String),

    #[error("Triage engine returned unusable output: {0}")]
    EngineMalformedOutput(String),

    /// Both the primary engine and the fallback failed.
    #[error("Triage is currently unavailable: {0}")]
    TriageUnavailable(String),

    #[error("Triage request was cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TriageError {
    /// Engine-level failures hand the request over to the fallback path.
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            TriageError::EngineUnavailable(_)
                | TriageError::EngineTransport(_)
                | TriageError::EngineMalformedOutput(_)
        )
    }

    /// Short stable tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TriageError::InvalidInput(_) => "invalid_input",
            TriageError::EngineUnavailable(_) => "engine_unavailable",
            TriageError::EngineTransport(_) => "engine_transport",
            TriageError::EngineMalformedOutput(_) => "engine_malformed_output",
            TriageError::TriageUnavailable(_) => "triage_unavailable",
            TriageError::Cancelled => "cancelled",
            TriageError::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_failures_trigger_fallback() {
        assert!(TriageError::EngineUnavailable("no key".into()).is_engine_failure());
        assert!(TriageError::EngineTransport("timeout".into()).is_engine_failure());
        assert!(TriageError::EngineMalformedOutput("empty".into()).is_engine_failure());
    }

    #[test]
    fn caller_and_terminal_errors_do_not_trigger_fallback() {
        assert!(!TriageError::InvalidInput("empty".into()).is_engine_failure());
        assert!(!TriageError::TriageUnavailable("down".into()).is_engine_failure());
        assert!(!TriageError::Cancelled.is_engine_failure());
    }

    #[test]
    fn error_display_is_readable() {
        let err = TriageError::EngineTransport("Request timed out after 30s".into());
        assert_eq!(
            err.to_string(),
            "Triage engine transport error: Request timed out after 30s"
        );
        assert_eq!(err.kind(), "engine_transport");
    }
}
