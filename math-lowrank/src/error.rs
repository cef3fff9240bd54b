//! Error types for the low-rank factorization and Woodbury solves.
//!
//! Errors fall into two groups: numerical instability (the inputs are
//! well-formed but the arithmetic broke down) and invalid arguments (the
//! inputs are malformed). Neither is retried internally.

use thiserror::Error;

/// Errors that can occur during factorization or solve.
#[derive(Debug, Error)]
pub enum LowRankError {
    /// The selected pivot has a non-positive residual diagonal value.
    #[error("non-positive pivot {value} at iteration {iteration} in batch {batch}")]
    NegativePivot {
        /// Flat batch index
        batch: usize,
        /// Iteration at which the pivot was selected
        iteration: usize,
        /// The residual diagonal value
        value: f64,
    },

    /// The residual diagonal contains NaN or an infinite value.
    #[error("residual diagonal of batch {batch} is not finite after iteration {iteration}")]
    NonFiniteResidual {
        /// Flat batch index
        batch: usize,
        /// Number of completed iterations (0 for the input diagonal)
        iteration: usize,
    },

    /// The small `k x k` capacitance matrix is not positive definite.
    #[error("matrix in batch {batch} is not positive definite (failed at column {column})")]
    NotPositiveDefinite {
        /// Flat batch index
        batch: usize,
        /// Column at which the Cholesky factorization broke down
        column: usize,
    },

    /// A shift entry is zero, too small to invert, or not finite.
    #[error("shift entry {index} in batch {batch} is zero or not finite")]
    ZeroShift {
        /// Flat batch index
        batch: usize,
        /// Index of the offending entry
        index: usize,
    },

    /// `max_iter` must be positive.
    #[error("max_iter must be positive")]
    InvalidMaxIter,

    /// The error tolerance is negative or not finite.
    #[error("invalid error tolerance: {value} (must be finite and >= 0)")]
    InvalidTolerance {
        /// The rejected tolerance
        value: f64,
    },

    /// Two inputs disagree on a dimension.
    #[error("{what} dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Which dimension was checked
        what: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },

    /// A matrix that must be square is not.
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare {
        /// Number of rows
        rows: usize,
        /// Number of columns
        cols: usize,
    },

    /// An index appears more than once where a permutation is required.
    #[error("index {index} appears more than once in permutation")]
    DuplicateIndex {
        /// The repeated index
        index: usize,
    },

    /// A row index is outside `[0, len)`.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The rejected index
        index: usize,
        /// Valid length
        len: usize,
    },
}

/// A specialized `Result` type for low-rank operations.
pub type Result<T> = std::result::Result<T, LowRankError>;

impl LowRankError {
    /// Returns `true` if the arithmetic broke down on well-formed inputs.
    ///
    /// This includes `NegativePivot`, `NonFiniteResidual`, `NotPositiveDefinite`
    /// and `ZeroShift`.
    pub fn is_numerical_instability(&self) -> bool {
        matches!(
            self,
            LowRankError::NegativePivot { .. }
                | LowRankError::NonFiniteResidual { .. }
                | LowRankError::NotPositiveDefinite { .. }
                | LowRankError::ZeroShift { .. }
        )
    }

    /// Returns `true` if the inputs themselves are malformed.
    pub fn is_invalid_argument(&self) -> bool {
        !self.is_numerical_instability()
    }

    pub(crate) fn mismatch(what: &'static str, expected: usize, got: usize) -> Self {
        LowRankError::DimensionMismatch {
            what,
            expected,
            got,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LowRankError::DimensionMismatch {
            what: "shift length",
            expected: 3,
            got: 5,
        };
        assert_eq!(
            err.to_string(),
            "shift length dimension mismatch: expected 3, got 5"
        );

        let err = LowRankError::NotPositiveDefinite {
            batch: 2,
            column: 1,
        };
        assert_eq!(
            err.to_string(),
            "matrix in batch 2 is not positive definite (failed at column 1)"
        );
    }

    #[test]
    fn test_error_categories() {
        let pivot = LowRankError::NegativePivot {
            batch: 0,
            iteration: 3,
            value: -1e-9,
        };
        assert!(pivot.is_numerical_instability());
        assert!(!pivot.is_invalid_argument());

        assert!(LowRankError::ZeroShift { batch: 0, index: 1 }.is_numerical_instability());
        let residual = LowRankError::NonFiniteResidual {
            batch: 1,
            iteration: 0,
        };
        assert!(residual.is_numerical_instability());
        assert!(LowRankError::InvalidMaxIter.is_invalid_argument());
        assert!(LowRankError::InvalidTolerance { value: -1.0 }.is_invalid_argument());
        assert!(LowRankError::mismatch("rows", 2, 3).is_invalid_argument());
    }
}
