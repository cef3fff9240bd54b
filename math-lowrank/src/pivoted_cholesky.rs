//! Greedy pivoted partial Cholesky factorization
//!
//! Builds a rank-`m` factor `L` (shape `m x n`) with `LᵗL ≈ A` for a batch of
//! symmetric PSD matrices. Each iteration picks the largest remaining
//! diagonal entry as pivot, reads the single matrix row at that pivot and
//! deflates the residual diagonal. Only `m` rows of `A` are ever read, which
//! matters when `A` is an implicit kernel matrix.
//!
//! Rows of `L` are stored in the original column order: `L[j, pivot_j]` is
//! the square root of the `j`-th pivot value, and the entries of already
//! chosen pivots are never written again.

use crate::blas_helpers::{axpy, l1_norm};
use crate::error::{LowRankError, Result};
use crate::matrix::{DenseMatrix, MatrixAccess};
use crate::parallel::{is_parallel_available, try_for_each_batch};
use crate::permutation::Permutation;
use crate::traits::RealField;
use ndarray::{
    Array1, Array2, Array3, ArrayBase, ArrayD, ArrayView1, ArrayView2, Axis, Data, Ix1, IxDyn,
    Zip, s,
};

/// Default stopping tolerance on the L1 norm of the residual diagonal
pub const DEFAULT_ERROR_TOL: f64 = 1e-3;

/// Pivoted Cholesky configuration
#[derive(Debug, Clone)]
pub struct PivotedCholeskyConfig<R> {
    /// Maximum rank of the factor (clamped to the matrix size)
    pub max_iter: usize,
    /// Stop once the largest residual L1 norm over the batch is at most this
    pub error_tol: R,
    /// Log progress every N iterations (0 = no output)
    pub print_interval: usize,
}

impl<R: RealField> PivotedCholeskyConfig<R> {
    /// Config with the default tolerance of `1e-3`
    pub fn new(max_iter: usize) -> Self {
        Self {
            max_iter,
            error_tol: R::from_f64_lossy(DEFAULT_ERROR_TOL),
            print_interval: 0,
        }
    }

    /// Set the stopping tolerance
    pub fn with_error_tol(mut self, error_tol: R) -> Self {
        self.error_tol = error_tol;
        self
    }

    /// Set the progress logging interval
    pub fn with_print_interval(mut self, print_interval: usize) -> Self {
        self.print_interval = print_interval;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(LowRankError::InvalidMaxIter);
        }
        if !(self.error_tol >= R::zero()) || !self.error_tol.is_finite() {
            return Err(LowRankError::InvalidTolerance {
                value: self.error_tol.to_f64_lossy(),
            });
        }
        Ok(())
    }
}

/// Pivoted Cholesky result
#[derive(Debug, Clone)]
pub struct PivotedCholesky<T: RealField> {
    /// Low-rank factors, shape `(batch_len, iterations, n)`
    pub factor: Array3<T>,
    /// Final permutation of each batch element; the first `iterations`
    /// positions hold the pivots in selection order
    pub permutations: Vec<Permutation>,
    /// Selected pivot values, shape `(iterations, batch_len)`
    pub pivot_values: Array2<T>,
    /// Residual L1 norms, shape `(iterations + 1, batch_len)`; row 0 is the
    /// norm of the initial diagonal
    pub errors: Array2<T>,
    /// Number of rows actually computed (`m_actual`)
    pub iterations: usize,
    /// Whether the loop stopped because the tolerance was reached
    pub converged: bool,
    /// Leading batch dimensions of the input
    pub batch_shape: Vec<usize>,
}

impl<T: RealField> PivotedCholesky<T> {
    /// Number of matrices in the batch
    pub fn batch_len(&self) -> usize {
        self.factor.len_of(Axis(0))
    }

    /// Rank of the factor (`m_actual`)
    pub fn rank(&self) -> usize {
        self.iterations
    }

    /// Factor of batch element `batch`, shape `(iterations, n)`
    pub fn factor_for(&self, batch: usize) -> ArrayView2<'_, T> {
        self.factor.index_axis(Axis(0), batch)
    }

    /// Factors reshaped to `[*batch_shape, iterations, n]`
    pub fn factor_dyn(&self) -> Result<ArrayD<T>> {
        let (batch_len, m, n) = self.factor.dim();
        let mut shape = self.batch_shape.clone();
        shape.extend([m, n]);
        self.factor
            .clone()
            .into_shape_with_order(IxDyn(&shape))
            .map_err(|_| {
                let expected: usize = shape[..shape.len() - 2].iter().product();
                LowRankError::mismatch("batch elements", batch_len, expected)
            })
    }

    /// The approximation `LᵗL` of batch element `batch`
    pub fn reconstruct(&self, batch: usize) -> Array2<T> {
        let l = self.factor_for(batch);
        l.t().dot(&l)
    }

    /// Residual L1 norm of every batch element after the last iteration
    pub fn final_errors(&self) -> ArrayView1<'_, T> {
        self.errors.row(self.iterations)
    }
}

/// Per-batch factorization state
struct BatchState<T: RealField> {
    diag: Array1<T>,
    perm: Permutation,
    factor: Array2<T>,
    error: T,
    pivot_value: T,
    /// Set when the whole residual is exactly zero; the row stays empty
    exhausted: bool,
}

impl<T: RealField> BatchState<T> {
    fn new(diag: Array1<T>, max_iter: usize) -> Self {
        let n = diag.len();
        let error = l1_norm(&diag);
        Self {
            perm: Permutation::identity(n),
            factor: Array2::zeros((max_iter, n)),
            error,
            pivot_value: T::zero(),
            exhausted: false,
            diag,
        }
    }

    /// Pick the largest residual diagonal entry among positions `[m, n)`,
    /// move it to position `m` and write the diagonal entry of row `m`
    fn select_pivot(&mut self, batch: usize, m: usize) -> Result<()> {
        let candidates = self.perm.gather(&self.diag, m);
        let mut offset = 0;
        let mut value = candidates[0];
        for (i, &v) in candidates.iter().enumerate().skip(1) {
            if v > value {
                offset = i;
                value = v;
            }
        }

        self.perm.swap(m, m + offset);
        self.pivot_value = value;

        if !(value > T::zero()) {
            if self.error == T::zero() {
                self.exhausted = true;
                return Ok(());
            }
            return Err(LowRankError::NegativePivot {
                batch,
                iteration: m,
                value: value.to_f64_lossy(),
            });
        }
        self.exhausted = false;

        let pivot = self.perm.get(m);
        self.factor[[m, pivot]] = value.sqrt();
        Ok(())
    }

    /// Fill row `m` at the unpivoted positions and deflate the diagonal there
    fn eliminate<S>(&mut self, m: usize, row: &ArrayBase<S, Ix1>)
    where
        S: Data<Elem = T>,
    {
        let n = self.diag.len();
        if m + 1 >= n {
            self.error = T::zero();
            return;
        }
        if self.exhausted {
            return;
        }

        let pivot = self.perm.get(m);
        let l_mp = self.factor[[m, pivot]];

        let mut updated = self.perm.gather(row, m + 1);
        for j in 0..m {
            let coeff = self.factor[[j, pivot]];
            if coeff == T::zero() {
                continue;
            }
            let previous = self.perm.gather(&self.factor.row(j), m + 1);
            axpy(-coeff, &previous, &mut updated);
        }
        updated.mapv_inplace(|v| v / l_mp);

        let mut target = self.factor.row_mut(m);
        self.perm.scatter(&mut target, m + 1, &updated);

        let current = self.perm.gather(&self.diag, m + 1);
        let deflated = Zip::from(&current)
            .and(&updated)
            .map_collect(|&d, &l| d - l * l);
        self.perm.scatter(&mut self.diag, m + 1, &deflated);

        self.error = l1_norm(&deflated);
    }
}

/// A NaN error would compare false against the tolerance and end the loop
fn check_finite<T: RealField>(states: &[BatchState<T>], iteration: usize) -> Result<()> {
    match states.iter().position(|s| !s.error.is_finite()) {
        Some(batch) => Err(LowRankError::NonFiniteResidual { batch, iteration }),
        None => Ok(()),
    }
}

fn max_error<T: RealField>(states: &[BatchState<T>]) -> T {
    states
        .iter()
        .fold(T::zero(), |acc, s| if s.error > acc { s.error } else { acc })
}

/// Compute a pivoted partial Cholesky factorization of a batch of PSD matrices
///
/// Iterates while fewer than `max_iter` rows exist and the largest residual
/// L1 norm over the batch exceeds `error_tol`. Every batch element takes part
/// in every iteration, so all factors have the same number of rows.
///
/// # Errors
///
/// - [`LowRankError::InvalidMaxIter`] / [`LowRankError::InvalidTolerance`] for bad config
/// - [`LowRankError::NegativePivot`] when a selected residual diagonal value is
///   not positive while the residual is non-zero (the matrix is not numerically PSD)
/// - any error raised by the matrix while resolving or reading rows
pub fn pivoted_cholesky<T, M>(
    matrix: &mut M,
    config: &PivotedCholeskyConfig<T>,
) -> Result<PivotedCholesky<T>>
where
    T: RealField,
    M: MatrixAccess<T> + ?Sized,
{
    config.validate()?;
    matrix.resolve()?;

    let n = matrix.size();
    let batch_len = matrix.batch_len();
    let batch_shape = matrix.batch_shape().to_vec();

    let diagonal = matrix.diagonal()?;
    if diagonal.nrows() != batch_len {
        return Err(LowRankError::mismatch("diagonal batch", batch_len, diagonal.nrows()));
    }
    if diagonal.ncols() != n {
        return Err(LowRankError::mismatch("diagonal length", n, diagonal.ncols()));
    }

    let max_iter = config.max_iter.min(n);
    log::debug!(
        "pivoted Cholesky: batch {}, n {}, max_iter {}, parallel = {}",
        batch_len,
        n,
        max_iter,
        is_parallel_available()
    );
    let mut states: Vec<BatchState<T>> = diagonal
        .outer_iter()
        .map(|d| BatchState::new(d.to_owned(), max_iter))
        .collect();

    let mut errors = Array2::zeros((max_iter + 1, batch_len));
    let mut pivot_values = Array2::zeros((max_iter, batch_len));
    for (b, state) in states.iter().enumerate() {
        errors[[0, b]] = state.error;
    }
    check_finite(&states, 0)?;

    let tol = config.error_tol;
    let mut m = 0;
    while m < max_iter && max_error(&states) > tol {
        try_for_each_batch(&mut states, |b, state| state.select_pivot(b, m))?;

        let pivots: Vec<usize> = states.iter().map(|state| state.perm.get(m)).collect();
        let rows = matrix.rows(&pivots)?;
        if rows.dim() != (batch_len, n) {
            return Err(LowRankError::mismatch("row length", n, rows.ncols()));
        }

        try_for_each_batch(&mut states, |b, state| {
            state.eliminate(m, &rows.row(b));
            Ok(())
        })?;

        for (b, state) in states.iter().enumerate() {
            pivot_values[[m, b]] = state.pivot_value;
            errors[[m + 1, b]] = state.error;
        }
        m += 1;
        check_finite(&states, m)?;

        let current = max_error(&states);
        log::debug!(
            "pivoted Cholesky iteration {}: max residual = {:.6e}",
            m,
            current.to_f64_lossy()
        );
        if config.print_interval > 0 && m % config.print_interval == 0 {
            log::info!(
                "pivoted Cholesky iteration {}/{}: max residual = {:.6e}",
                m,
                max_iter,
                current.to_f64_lossy()
            );
        }
    }

    let final_error = max_error(&states);
    let converged = !(final_error > tol);
    log::debug!(
        "pivoted Cholesky stopped after {} of {} iterations (batch {}, n {}): \
         max residual = {:.6e}, converged = {}",
        m,
        max_iter,
        batch_len,
        n,
        final_error.to_f64_lossy(),
        converged
    );

    let mut factor = Array3::zeros((batch_len, m, n));
    for (mut out, state) in factor.outer_iter_mut().zip(states.iter()) {
        out.assign(&state.factor.slice(s![..m, ..]));
    }

    Ok(PivotedCholesky {
        factor,
        permutations: states.into_iter().map(|state| state.perm).collect(),
        pivot_values: pivot_values.slice(s![..m, ..]).to_owned(),
        errors: errors.slice(s![..m + 1, ..]).to_owned(),
        iterations: m,
        converged,
        batch_shape,
    })
}

/// Factorize a single dense matrix, returning `L` with shape `(m_actual, n)`
///
/// This is a convenience wrapper around [`pivoted_cholesky`].
pub fn pivoted_cholesky_dense<T: RealField>(
    a: &Array2<T>,
    max_iter: usize,
    error_tol: T,
) -> Result<Array2<T>> {
    let mut matrix = DenseMatrix::from_array2(a.clone())?;
    let config = PivotedCholeskyConfig::new(max_iter).with_error_tol(error_tol);
    let result = pivoted_cholesky(&mut matrix, &config)?;
    Ok(result.factor.index_axis_move(Axis(0), 0))
}
