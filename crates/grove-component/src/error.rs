//! Component layer errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`ComponentError::Failed`] | `COMPONENT_FAILED` | No |
//! | [`ComponentError::NotSupported`] | `COMPONENT_NOT_SUPPORTED` | No |
//! | [`ComponentError::Panicked`] | `COMPONENT_PANICKED` | No |
//! | [`ComponentError::StateMismatch`] | `COMPONENT_STATE_MISMATCH` | No |
//!
//! The type is clonable on purpose: a failing handler's error is
//! carried inside a `HandlingError` event and may be observed by
//! several handlers.

use grove_types::ErrorCode;
use thiserror::Error;

/// Failure raised by a component handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// The handler ran and reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The component does not handle this operation.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// The handler panicked; the payload is the panic message when it
    /// was a string.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The mounted component state did not have the expected type.
    #[error("component state has unexpected type")]
    StateMismatch,
}

impl ComponentError {
    /// Wraps a displayable failure.
    #[must_use]
    pub fn failed(message: impl ToString) -> Self {
        Self::Failed(message.to_string())
    }
}

impl ErrorCode for ComponentError {
    fn code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "COMPONENT_FAILED",
            Self::NotSupported(_) => "COMPONENT_NOT_SUPPORTED",
            Self::Panicked(_) => "COMPONENT_PANICKED",
            Self::StateMismatch => "COMPONENT_STATE_MISMATCH",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
