//! Error taxonomy for a single pizza invocation

use crate::status::ExitStatus;
use thiserror::Error;

/// Malformed or conflicting command-line input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UsageError {
    pub message: String,
    /// The arguments that failed to parse, without the program name
    pub argv: Vec<String>,
}

impl UsageError {
    pub fn new(message: impl Into<String>, argv: &[String]) -> Self {
        Self {
            message: message.into(),
            argv: argv.to_vec(),
        }
    }
}

/// Every way an invocation can fail, matched once by the dispatcher
#[derive(Error, Debug)]
pub enum PizzaError {
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    /// The core operation reported a failure
    #[error("{0:#}")]
    Operation(anyhow::Error),

    #[error("one or more tests failed")]
    TestsFailed,

    #[error("{0:#}")]
    Internal(anyhow::Error),
}

impl PizzaError {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            PizzaError::Usage(_) => ExitStatus::Usage,
            PizzaError::Operation(_) | PizzaError::TestsFailed | PizzaError::Internal(_) => {
                ExitStatus::Failure
            }
        }
    }
}
