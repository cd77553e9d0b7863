//! Error types for the sparse solver.
//!
//! This module provides a unified error type [`SparseError`] that covers
//! all error conditions that can occur while building, ordering, factoring
//! and solving a sparse system.
//!
//! A zero pivot met by [`Solver::factor`](crate::Solver::factor) is *not* an
//! error: it is reported as `Ok(false)` so that the caller can respond by
//! forcing a reorder.

use thiserror::Error;

/// Result type alias using [`SparseError`].
pub type Result<T> = std::result::Result<T, SparseError>;

/// Unified error type for all solver operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SparseError {
    // ============ Numeric Errors ============
    /// No pivot could be found in the unreduced submatrix
    #[error("Singular matrix - no valid pivot found at elimination step {step}")]
    SingularMatrix { step: usize },

    /// A pivot became exactly zero during elimination
    #[error("Zero pivot encountered at elimination step {step}")]
    ZeroPivot { step: usize },

    // ============ Argument Errors ============
    /// Invalid argument passed to an operation
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Location beyond the fixed size of the matrix
    #[error("Location ({row}, {column}) is outside of the {size}x{size} matrix")]
    OutOfRange {
        row: usize,
        column: usize,
        size: usize,
    },

    /// Location on the ground row or column
    #[error("Location ({row}, {column}) refers to the ground node")]
    GroundLocation { row: usize, column: usize },

    // ============ State Errors ============
    /// The equations have not been fixed yet
    #[error("Solver equations are not fixed - call fix_equations() first")]
    NotFixed,

    /// The matrix has not been factored yet
    #[error("Solver is not yet factored")]
    NotFactored,
}

impl SparseError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a singular matrix error
    pub fn singular(step: usize) -> Self {
        Self::SingularMatrix { step }
    }

    /// Check whether this error comes from the numeric values of the matrix
    /// rather than from misuse of the API.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::SingularMatrix { .. } | Self::ZeroPivot { .. })
    }
}
