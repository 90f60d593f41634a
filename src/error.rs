use thiserror::Error;

use crate::intent::types::IntentKind;

/// Raised by the command builder when an intent cannot become a command.
/// Every variant carries a question the user can answer to move forward.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("missing {entity} for {intent:?}")]
    MissingEntity {
        intent: IntentKind,
        entity: &'static str,
        question: String,
    },

    #[error("no command for {intent:?}")]
    Unsupported { intent: IntentKind, question: String },
}

impl BuildError {
    /// Follow-up question to show the user instead of the error itself.
    pub fn question(&self) -> &str {
        match self {
            BuildError::MissingEntity { question, .. } => question,
            BuildError::Unsupported { question, .. } => question,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt stored state: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the process-run capability before a process produced output.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("refused to run {program}: {reason}")]
    Blocked { program: String, reason: String },

    #[error("process wait failed: {0}")]
    Wait(#[from] std::io::Error),
}

/// The pipeline's error taxonomy. Recognition and build variants are turned
/// into questions by the orchestrator; execution variants travel inside
/// `ExecutionResult` and are only materialized here for classification.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("recognition is ambiguous")]
    RecognitionAmbiguous,

    #[error(transparent)]
    BuildMissingEntity(BuildError),

    #[error("execution timed out after {0} ms")]
    ExecutionTimeout(u64),

    #[error("execution cancelled")]
    ExecutionCancelled,

    #[error("execution failed: {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("learning store unavailable: {0}")]
    PersistenceUnavailable(#[from] PersistenceError),

    #[error("internal fault: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
