//! Runtime Error Handling
//!
//! Two pieces live here:
//!
//! - [`StackError`]: the value returned by validating readers (`check_*`) when a
//!   slot cannot satisfy the requested type. It aborts the call in flight and is
//!   propagated with `?` by everything above it.
//! - A thread-local "last error" slot. [`Stack::protected`](crate::Stack::protected)
//!   records the message of an aborted call here so the embedding layer can
//!   inspect it after the stack has been unwound.
//!
//! # Usage
//!
//! ```ignore
//! let n = stack.check_integer(1)?; // aborts with "bad argument #1 (number expected, got nil)"
//! ```
//!
//! ```ignore
//! if has_runtime_error() {
//!     let msg = take_runtime_error();
//!     // report msg...
//! }
//! ```

use std::cell::RefCell;
use thiserror::Error;

/// Failure raised by a validating stack operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// A slot did not hold (or convert to) the expected runtime type
    #[error("bad argument #{position} ({expected} expected, got {got})")]
    BadArgument {
        /// Absolute stack position of the offending slot
        position: i32,
        /// Runtime type name the caller asked for
        expected: &'static str,
        /// Runtime type name actually found ("no value" for empty positions)
        got: &'static str,
    },

    /// Free-form runtime failure raised by host code
    #[error("{0}")]
    Runtime(String),
}

impl StackError {
    /// Build a runtime error from any message
    pub fn runtime(msg: impl Into<String>) -> Self {
        StackError::Runtime(msg.into())
    }
}

/// Result alias used across the stack API
pub type StackResult<T> = Result<T, StackError>;

thread_local! {
    /// Thread-local storage for the last runtime error message
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Set the last runtime error message
pub fn set_runtime_error(msg: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(msg.into());
    });
}

/// Take (and clear) the last runtime error message
pub fn take_runtime_error() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Check if there's a pending runtime error
pub fn has_runtime_error() -> bool {
    LAST_ERROR.with(|e| e.borrow().is_some())
}

/// Clear any pending runtime error
pub fn clear_runtime_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}
