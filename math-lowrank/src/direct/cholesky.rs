//! Cholesky decomposition solver
//!
//! Factorizes a symmetric positive definite matrix as `A = L Lᵗ` and solves
//! with forward and back substitution. Used for the small `k x k` systems of
//! the Woodbury factor and as a reference dense solve.

use crate::error::LowRankError;
use crate::traits::RealField;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
use thiserror::Error;

/// Errors that can occur during Cholesky factorization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CholeskyError {
    #[error("Matrix is not positive definite (pivot {column} is not positive)")]
    NotPositiveDefinite { column: usize },
    #[error("Matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl CholeskyError {
    /// Attach the batch element the failure happened in
    pub fn in_batch(self, batch: usize) -> LowRankError {
        match self {
            CholeskyError::NotPositiveDefinite { column } => {
                LowRankError::NotPositiveDefinite { batch, column }
            }
            CholeskyError::DimensionMismatch { expected, got } => {
                LowRankError::mismatch("cholesky system", expected, got)
            }
        }
    }
}

/// Cholesky factorization result
///
/// Stores the lower triangular factor; the strict upper triangle is zero.
#[derive(Debug, Clone)]
pub struct CholeskyFactorization<T: RealField> {
    /// Lower triangular factor L with A = L Lᵗ
    pub l: Array2<T>,
    /// Matrix dimension
    pub n: usize,
}

impl<T: RealField> CholeskyFactorization<T> {
    /// Solve Ax = b using the pre-computed factorization
    pub fn solve<S>(&self, b: &ArrayBase<S, Ix1>) -> Result<Array1<T>, CholeskyError>
    where
        S: Data<Elem = T>,
    {
        if b.len() != self.n {
            return Err(CholeskyError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }

        let mut x = b.to_owned();

        // Forward substitution: Ly = b
        for i in 0..self.n {
            for j in 0..i {
                let l_ij = self.l[[i, j]];
                let x_j = x[j];
                x[i] -= l_ij * x_j;
            }
            x[i] /= self.l[[i, i]];
        }

        // Backward substitution: Lᵗx = y
        for i in (0..self.n).rev() {
            for j in (i + 1)..self.n {
                let l_ji = self.l[[j, i]];
                let x_j = x[j];
                x[i] -= l_ji * x_j;
            }
            x[i] /= self.l[[i, i]];
        }

        Ok(x)
    }

    /// Solve AX = B for every column of B at once
    ///
    /// Substitution runs over whole rows of B, so the cost is one pass per
    /// row of the factor regardless of the number of right-hand sides.
    pub fn solve_matrix<S>(&self, b: &ArrayBase<S, Ix2>) -> Result<Array2<T>, CholeskyError>
    where
        S: Data<Elem = T>,
    {
        if b.nrows() != self.n {
            return Err(CholeskyError::DimensionMismatch {
                expected: self.n,
                got: b.nrows(),
            });
        }

        let mut x = b.to_owned();

        for i in 0..self.n {
            for j in 0..i {
                let l_ij = self.l[[i, j]];
                let (head, mut tail) = x.view_mut().split_at(Axis(0), i);
                Zip::from(tail.row_mut(0))
                    .and(head.row(j))
                    .for_each(|xi, &xj| *xi -= l_ij * xj);
            }
            let l_ii = self.l[[i, i]];
            x.row_mut(i).mapv_inplace(|v| v / l_ii);
        }

        for i in (0..self.n).rev() {
            for j in (i + 1)..self.n {
                let l_ji = self.l[[j, i]];
                let (mut head, tail) = x.view_mut().split_at(Axis(0), i + 1);
                Zip::from(head.row_mut(i))
                    .and(tail.row(j - i - 1))
                    .for_each(|xi, &xj| *xi -= l_ji * xj);
            }
            let l_ii = self.l[[i, i]];
            x.row_mut(i).mapv_inplace(|v| v / l_ii);
        }

        Ok(x)
    }
}

/// Compute the Cholesky factorization of a symmetric positive definite matrix
///
/// Only the lower triangle of `a` is read.
pub fn cholesky_factorize<T, S>(
    a: &ArrayBase<S, Ix2>,
) -> Result<CholeskyFactorization<T>, CholeskyError>
where
    T: RealField,
    S: Data<Elem = T>,
{
    let n = a.nrows();
    if n != a.ncols() {
        return Err(CholeskyError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let mut l = Array2::zeros((n, n));

    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        // NaN fails this comparison too
        if !(diag > T::zero()) || !diag.is_finite() {
            return Err(CholeskyError::NotPositiveDefinite { column: j });
        }
        let l_jj = diag.sqrt();
        l[[j, j]] = l_jj;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / l_jj;
        }
    }

    Ok(CholeskyFactorization { l, n })
}

/// Solve Ax = b for a symmetric positive definite A
///
/// This is a convenience function that combines factorization and solve.
pub fn cholesky_solve<T, S1, S2>(
    a: &ArrayBase<S1, Ix2>,
    b: &ArrayBase<S2, Ix1>,
) -> Result<Array1<T>, CholeskyError>
where
    T: RealField,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
{
    let factorization = cholesky_factorize(a)?;
    factorization.solve(b)
}
