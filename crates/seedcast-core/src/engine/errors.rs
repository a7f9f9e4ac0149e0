//! Error types for Seedcast selection.

use thiserror::Error;

/// Errors that can occur during graph validation or seed selection.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// All public APIs return Result<T, SelectError> to avoid panics in library
/// code. Validation errors reject malformed input before any tree is built;
/// internal errors signal an invariant breach and are fatal rather than
/// recoverable.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SelectError {
    /// Precondition violation in the supplied graph or configuration.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Numerical stability error (NaN/Inf where a probability was expected).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Internal consistency error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}
