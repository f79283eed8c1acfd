//! Event layer errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`EventError::Timeout`] | `EVENT_TIMEOUT` | Yes |

use grove_types::ErrorCode;
use thiserror::Error;

/// Errors raised by the event layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// A bounded wait for an event's completion expired.
    ///
    /// Recoverable: the event may still complete, waiting again with a
    /// larger bound can succeed.
    #[error("timed out waiting for the event to be handled")]
    Timeout,
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout => "EVENT_TIMEOUT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&[EventError::Timeout], "EVENT_");
    }

    #[test]
    fn timeout_is_recoverable() {
        assert!(EventError::Timeout.is_recoverable());
        assert!(EventError::Timeout.to_string().contains("timed out"));
    }
}
