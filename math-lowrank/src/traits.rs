//! Core traits for the low-rank routines
//!
//! This module defines the fundamental abstractions used throughout the crate:
//! - [`RealField`]: Trait for real scalar types (f64, f32 and half precision)
//! - [`LinearOperator`]: Trait for matrix-like objects that can perform matrix-vector products
//! - [`Preconditioner`]: Trait for preconditioning operations

use crate::precision::SolvePrecision;
use half::f16;
use ndarray::{Array1, Array2};
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types that can be used by the factorization and solvers.
///
/// # Implementations
///
/// Provided for:
/// - `f64` (default for most kernel matrices)
/// - `f32` (for memory-constrained applications)
/// - `half::f16` (storage precision; dense solves upcast to f32 by default,
///   see [`RealField::SOLVE_PRECISION`])
pub trait RealField:
    Float + NumAssign + FromPrimitive + ToPrimitive + Send + Sync + Debug + Display + 'static
{
    /// Precision that [`SolvePrecision::Working`] resolves to for dense solves
    const SOLVE_PRECISION: SolvePrecision = SolvePrecision::Working;

    /// Convert from `f64`, rounding to the nearest representable value
    fn from_f64_lossy(v: f64) -> Self;

    /// Widen to `f64`
    fn to_f64_lossy(self) -> f64;

    /// Squared magnitude
    #[inline]
    fn norm_sqr(&self) -> Self {
        *self * *self
    }

    /// Check if this is approximately zero
    #[inline]
    fn is_zero_approx(&self, tol: Self) -> bool {
        self.abs() < tol
    }
}

impl RealField for f64 {
    #[inline]
    fn from_f64_lossy(v: f64) -> Self {
        v
    }

    #[inline]
    fn to_f64_lossy(self) -> f64 {
        self
    }
}

impl RealField for f32 {
    #[inline]
    fn from_f64_lossy(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn to_f64_lossy(self) -> f64 {
        self as f64
    }
}

impl RealField for f16 {
    // Cholesky at half precision loses most of its digits
    const SOLVE_PRECISION: SolvePrecision = SolvePrecision::Single;

    #[inline]
    fn from_f64_lossy(v: f64) -> Self {
        f16::from_f64(v)
    }

    #[inline]
    fn to_f64_lossy(self) -> f64 {
        self.to_f64()
    }
}

/// Trait for linear operators (matrices) that can perform matrix-vector products.
///
/// Lets the iterative solvers work with dense matrices and matrix-free
/// kernel operators interchangeably.
pub trait LinearOperator<T: RealField>: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    fn apply(&self, x: &Array1<T>) -> Array1<T>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

impl<T: RealField> LinearOperator<T> for Array2<T> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_cols(&self) -> usize {
        self.ncols()
    }

    fn apply(&self, x: &Array1<T>) -> Array1<T> {
        self.dot(x)
    }
}

/// Trait for preconditioners used in iterative solvers.
///
/// A preconditioner M approximates A^(-1), so that M*A is better conditioned
/// than A alone. This accelerates convergence of iterative methods.
pub trait Preconditioner<T: RealField>: Send + Sync {
    /// Apply the preconditioner: y = M * r
    ///
    /// This should approximate solving A * y = r
    fn apply(&self, r: &Array1<T>) -> Array1<T>;
}

/// Identity preconditioner (no preconditioning)
#[derive(Clone, Debug, Default)]
pub struct IdentityPreconditioner;

impl<T: RealField> Preconditioner<T> for IdentityPreconditioner {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        r.clone()
    }
}
