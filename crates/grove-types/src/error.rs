//! Unified error interface for the grove crates.
//!
//! Every error type in the workspace implements [`ErrorCode`], giving
//! callers a stable machine-readable code and a recoverability hint
//! without matching on concrete enums.
//!
//! # Code format
//!
//! - UPPER_SNAKE_CASE
//! - Prefixed with the owning layer, e.g. `EVENT_`, `COMPONENT_`,
//!   `TREE_`, `PIPELINE_`
//! - Stable once published
//!
//! # Example
//!
//! ```
//! use grove_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum QueueError {
//!     Full,
//! }
//!
//! impl ErrorCode for QueueError {
//!     fn code(&self) -> &'static str {
//!         "QUEUE_FULL"
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! assert_eq!(QueueError::Full.code(), "QUEUE_FULL");
//! assert!(QueueError::Full.is_recoverable());
//! ```

/// Machine-readable error code plus recoverability hint.
///
/// An error is recoverable when retrying the operation may succeed or
/// the caller can take corrective action; it is not recoverable when
/// the input or program state is simply wrong.
pub trait ErrorCode {
    /// Returns the stable UPPER_SNAKE_CASE code for this error.
    fn code(&self) -> &'static str;

    /// Returns whether a retry or corrective action can help.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows the workspace conventions.
///
/// # Panics
///
/// Panics when the code is empty, lacks the expected prefix, or is not
/// UPPER_SNAKE_CASE. Intended for use in tests.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();
    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Validates every code in `errors`, typically one per enum variant.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Soft,
        Hard,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Soft => "TEST_SOFT",
                Self::Hard => "TEST_HARD",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Soft)
        }
    }

    #[test]
    fn codes_and_recoverability() {
        assert_eq!(TestError::Soft.code(), "TEST_SOFT");
        assert!(TestError::Soft.is_recoverable());
        assert!(!TestError::Hard.is_recoverable());
    }

    #[test]
    fn assert_helpers_accept_valid_codes() {
        assert_error_codes(&[TestError::Soft, TestError::Hard], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn assert_helper_rejects_wrong_prefix() {
        assert_error_code(&TestError::Soft, "OTHER_");
    }

    #[test]
    fn snake_case_check() {
        assert!(is_upper_snake_case("A_B_2"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("a_b"));
        assert!(!is_upper_snake_case("_A"));
        assert!(!is_upper_snake_case("A__B"));
    }
}
