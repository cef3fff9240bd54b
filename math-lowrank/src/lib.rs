//! Low-rank factorization and solves for kernel matrices
//!
//! This crate builds low-rank approximations of batches of symmetric positive
//! semi-definite matrices and uses them to solve diagonal-plus-low-rank systems.
//!
//! # Features
//!
//! - **Pivoted Cholesky**: greedy partial Cholesky with diagonal pivoting,
//!   reading only the diagonal and one row per iteration
//! - **Woodbury Solves**: `(diag(shift) + VᵗV) x = b` through a reusable `k x n` factor
//! - **Matrix Access**: dense batches or implicit (lazily evaluated) matrices
//! - **Preconditioned CG**: a Woodbury preconditioner for `K + diag(shift)`
//! - **Generic Scalar Types**: Works with f64, f32 and half::f16
//!
//! # Example
//!
//! ```ignore
//! use math_audio_lowrank::{
//!     DenseMatrix, PivotedCholeskyConfig, Shift, WoodburyConfig, pivoted_cholesky,
//!     woodbury_factor, woodbury_solve,
//! };
//!
//! let mut matrix = DenseMatrix::from_array2(kernel)?;
//! let result = pivoted_cholesky(&mut matrix, &PivotedCholeskyConfig::new(32))?;
//!
//! let shift = Shift::Scalar(1e-2);
//! let factor = woodbury_factor(result.factor.view(), &shift, &WoodburyConfig::default())?;
//! let x = woodbury_solve(rhs.view(), result.factor.view(), &factor, &shift)?;
//! ```

pub mod blas_helpers;
pub mod direct;
pub mod error;
pub mod iterative;
pub mod matrix;
pub mod parallel;
pub mod permutation;
pub mod pivoted_cholesky;
pub mod precision;
pub mod traits;
pub mod woodbury;

// Re-export main types
pub use error::{LowRankError, Result};
pub use matrix::{DenseMatrix, ImplicitMatrix, MatrixAccess};
pub use permutation::Permutation;
pub use precision::SolvePrecision;
pub use traits::{IdentityPreconditioner, LinearOperator, Preconditioner, RealField};

// Re-export the factorization
pub use pivoted_cholesky::{
    DEFAULT_ERROR_TOL, PivotedCholesky, PivotedCholeskyConfig, pivoted_cholesky,
    pivoted_cholesky_dense,
};

// Re-export Woodbury solves
pub use woodbury::{
    Shift, WoodburyConfig, WoodburyFactor, WoodburyPreconditioner, pivoted_cholesky_preconditioner,
    woodbury_factor, woodbury_factor_single, woodbury_solve, woodbury_solve_many,
    woodbury_solve_single,
};

// Re-export solvers
pub use direct::{CholeskyError, CholeskyFactorization, cholesky_factorize, cholesky_solve};
pub use iterative::{CgConfig, CgSolution, cg, pcg};
