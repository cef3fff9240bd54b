//! Direct solvers for small dense systems
//!
//! This module provides:
//! - [`cholesky_factorize`]: Cholesky factorization `A = L Lᵗ` of an SPD matrix
//! - [`cholesky_solve`]: factor-and-solve convenience for a single system

mod cholesky;

pub use cholesky::{CholeskyError, CholeskyFactorization, cholesky_factorize, cholesky_solve};
