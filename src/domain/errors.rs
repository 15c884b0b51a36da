use thiserror::Error;

/// Errors raised by the parameter data model, the genetic operators and fitness evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizationError {
    /// Malformed input to a data-model operation (e.g. a non-positive top-K request).
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Parameter not found: {key}")]
    KeyNotFound { key: String },

    /// Operator invoked on an empty or not fully evaluated population.
    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    /// External fitness evaluation failed or timed out.
    #[error("Evaluation failed: {reason}")]
    EvaluationFailure { reason: String },
}

impl OptimizationError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn evaluation_failure(reason: impl Into<String>) -> Self {
        Self::EvaluationFailure {
            reason: reason.into(),
        }
    }
}
