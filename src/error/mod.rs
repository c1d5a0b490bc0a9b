use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The unified error type for the harness.
///
/// Every variant is plain data so a run-level error can travel inside a
/// finalized [`TestRun`](crate::workflow::TestRun) and survive serialization.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum HarnessError {
    /// A reached step has no mock registered for it.
    #[error("no mock registered for step '{step}'")]
    UnregisteredStep { step: String },

    /// A mock spec is malformed: nested dynamic mock, simultaneous outputs
    /// and error, or a non-terminal status.
    #[error("invalid mock for step '{step}': {reason}")]
    InvalidMock { step: String, reason: String },

    /// API misuse, e.g. recording a step result after finalize.
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// A dynamic mock callback did not return within its budget.
    #[error("mock callback for step '{step}' did not return within {budget_ms}ms")]
    CallbackTimeout { step: String, budget_ms: u64 },

    /// The workflow definition itself is malformed.
    #[error("invalid workflow definition: {message}")]
    Definition { message: String },

    /// The supplied mocks do not line up with the workflow definition.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl HarnessError {
    pub fn unregistered_step(step: impl Into<String>) -> Self {
        Self::UnregisteredStep { step: step.into() }
    }

    pub fn invalid_mock(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMock {
            step: step.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
