//! Working-precision policy for the dense solve step
//!
//! Inputs stay at their working precision `T`. The small Cholesky
//! factorization inside the Woodbury factor can optionally run at a wider
//! precision; this is how half-precision inputs are handled.

use crate::traits::RealField;
use ndarray::{Array, ArrayBase, Data, Dimension};

/// Precision used for the Cholesky factorization and triangular solves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolvePrecision {
    /// Factor at the input precision, or at the scalar's
    /// [`SOLVE_PRECISION`](RealField::SOLVE_PRECISION) when that is wider
    #[default]
    Working,
    /// Upcast to f32 for the dense solve, cast the result back
    Single,
    /// Upcast to f64 for the dense solve, cast the result back
    Double,
}

impl SolvePrecision {
    /// The precision actually used for scalar type `T`
    pub fn resolve<T: RealField>(self) -> SolvePrecision {
        match self {
            SolvePrecision::Working => T::SOLVE_PRECISION,
            explicit => explicit,
        }
    }

    /// Human readable name, used in log output
    pub fn name(&self) -> &'static str {
        match self {
            SolvePrecision::Working => "working",
            SolvePrecision::Single => "f32",
            SolvePrecision::Double => "f64",
        }
    }
}

/// Convert every element of an array to another precision
pub fn cast_array<A, B, S, D>(array: &ArrayBase<S, D>) -> Array<B, D>
where
    A: RealField,
    B: RealField,
    S: Data<Elem = A>,
    D: Dimension,
{
    array.mapv(|v| B::from_f64_lossy(v.to_f64_lossy()))
}
