//! Woodbury solves with a diagonal-plus-low-rank matrix
//!
//! Solves `(diag(shift) + VᵗV) x = b` where `V` is `k x n` with `k << n`,
//! without forming the `n x n` matrix. With `a = max |1/shift|` and
//! `E = diag(1/shift) / a`, the factor
//!
//! ```text
//! R = (I/a + V E Vᵗ)⁻¹ V
//! ```
//!
//! is computed once per `(V, shift)` pair with a `k x k` Cholesky solve.
//! Every right-hand side then costs two products with `V`/`R`:
//!
//! ```text
//! x = a (E b - E Vᵗ R E b)
//! ```
//!
//! The rescaling by `a` keeps the capacitance matrix well conditioned when
//! shift magnitudes differ by orders of magnitude.

use crate::direct::cholesky_factorize;
use crate::error::{LowRankError, Result};
use crate::matrix::MatrixAccess;
use crate::parallel::map_batches;
use crate::pivoted_cholesky::{PivotedCholeskyConfig, pivoted_cholesky};
use crate::precision::{SolvePrecision, cast_array};
use crate::traits::{Preconditioner, RealField};
use ndarray::{
    Array1, Array2, Array3, ArrayBase, ArrayView1, ArrayView2, ArrayView3, Axis, Data, Ix2,
};

/// Diagonal shift added to the low-rank term
#[derive(Debug, Clone)]
pub enum Shift<T: RealField> {
    /// Same value on every diagonal entry of every batch element
    Scalar(T),
    /// One length-`n` diagonal shared by all batch elements
    Vector(Array1<T>),
    /// One length-`n` diagonal per batch element, shape `(batch_len, n)`
    Batched(Array2<T>),
}

impl<T: RealField> Shift<T> {
    fn check(&self, batch_len: usize, n: usize) -> Result<()> {
        match self {
            Shift::Scalar(_) => Ok(()),
            Shift::Vector(v) if v.len() != n => {
                Err(LowRankError::mismatch("shift length", n, v.len()))
            }
            Shift::Vector(_) => Ok(()),
            Shift::Batched(s) if s.nrows() != batch_len => {
                Err(LowRankError::mismatch("shift batch", batch_len, s.nrows()))
            }
            Shift::Batched(s) if s.ncols() != n => {
                Err(LowRankError::mismatch("shift length", n, s.ncols()))
            }
            Shift::Batched(_) => Ok(()),
        }
    }

    /// The shift diagonal of batch element `batch`
    pub fn diagonal(&self, batch: usize, n: usize) -> Array1<T> {
        match self {
            Shift::Scalar(s) => Array1::from_elem(n, *s),
            Shift::Vector(v) => v.clone(),
            Shift::Batched(s) => s.row(batch).to_owned(),
        }
    }
}

/// Returns `(1/shift) / a` and `a = max |1/shift|` for one batch element
fn scaled_inverse<T: RealField>(shift: &Array1<T>, batch: usize) -> Result<(Array1<T>, T)> {
    let mut inv_shift = Array1::zeros(shift.len());
    let mut scale = T::zero();
    for (index, (&s, inv)) in shift.iter().zip(inv_shift.iter_mut()).enumerate() {
        let r = s.recip();
        if !s.is_finite() || !r.is_finite() {
            return Err(LowRankError::ZeroShift { batch, index });
        }
        *inv = r;
        scale = scale.max(r.abs());
    }
    if scale == T::zero() {
        // Empty system, nothing to rescale
        return Ok((inv_shift, T::one()));
    }
    inv_shift.mapv_inplace(|v| v / scale);
    Ok((inv_shift, scale))
}

/// Woodbury configuration
///
/// The default resolves the dense solve precision from the scalar type, so
/// half-precision inputs are upcast to f32 without further configuration.
#[derive(Debug, Clone, Default)]
pub struct WoodburyConfig {
    /// Precision of the `k x k` Cholesky factorization and solves
    pub precision: SolvePrecision,
}

impl WoodburyConfig {
    /// Upcast to single precision for the dense solve (for half-precision inputs)
    pub fn upcast_half() -> Self {
        Self {
            precision: SolvePrecision::Single,
        }
    }

    /// Set the dense solve precision
    pub fn with_precision(mut self, precision: SolvePrecision) -> Self {
        self.precision = precision;
        self
    }
}

/// Reusable Woodbury factor `R`, shape `(batch_len, k, n)`
///
/// Valid for the `(V, shift)` pair it was computed from; recompute it when
/// either changes.
#[derive(Debug, Clone)]
pub struct WoodburyFactor<T: RealField> {
    /// `R = (I/a + V E Vᵗ)⁻¹ V` for every batch element
    pub r: Array3<T>,
}

impl<T: RealField> WoodburyFactor<T> {
    /// Number of batch elements
    pub fn batch_len(&self) -> usize {
        self.r.len_of(Axis(0))
    }

    /// Rank `k` of the low-rank term
    pub fn rank(&self) -> usize {
        self.r.len_of(Axis(1))
    }

    /// System size `n`
    pub fn size(&self) -> usize {
        self.r.len_of(Axis(2))
    }

    /// Factor of batch element `batch`, shape `(k, n)`
    pub fn for_batch(&self, batch: usize) -> ArrayView2<'_, T> {
        self.r.index_axis(Axis(0), batch)
    }
}

/// Solve `M R = V` with a Cholesky factorization of `M` at precision `F`
fn solve_capacitance<F, S1, S2>(
    m: &ArrayBase<S1, Ix2>,
    v: &ArrayBase<S2, Ix2>,
    batch: usize,
) -> Result<Array2<F>>
where
    F: RealField,
    S1: Data<Elem = F>,
    S2: Data<Elem = F>,
{
    let chol = cholesky_factorize(m).map_err(|e| e.in_batch(batch))?;
    chol.solve_matrix(v).map_err(|e| e.in_batch(batch))
}

fn factor_one<T: RealField>(
    v: ArrayView2<'_, T>,
    shift: &Array1<T>,
    precision: SolvePrecision,
    batch: usize,
) -> Result<Array2<T>> {
    let (inv_shift, scale) = scaled_inverse(shift, batch)?;

    // M = V diag(inv_shift) Vᵗ + I / scale
    let weighted = &v * &inv_shift.view().insert_axis(Axis(0));
    let mut m = weighted.dot(&v.t());
    let inv_scale = scale.recip();
    for i in 0..m.nrows() {
        m[[i, i]] += inv_scale;
    }

    match precision {
        SolvePrecision::Working => solve_capacitance(&m, &v, batch),
        SolvePrecision::Single => {
            let m32: Array2<f32> = cast_array(&m);
            let v32: Array2<f32> = cast_array(&v);
            Ok(cast_array(&solve_capacitance(&m32, &v32, batch)?))
        }
        SolvePrecision::Double => {
            let m64: Array2<f64> = cast_array(&m);
            let v64: Array2<f64> = cast_array(&v);
            Ok(cast_array(&solve_capacitance(&m64, &v64, batch)?))
        }
    }
}

/// Compute the Woodbury factor `R` for a batch of low-rank matrices
///
/// `low_rank` has shape `(batch_len, k, n)`, e.g. the factor of
/// [`pivoted_cholesky`]. The scale `a` is computed per batch element.
///
/// # Errors
///
/// - [`LowRankError::ZeroShift`] if a shift entry has no finite reciprocal
/// - [`LowRankError::NotPositiveDefinite`] if the `k x k` matrix cannot be factored
/// - [`LowRankError::DimensionMismatch`] if `shift` does not match `low_rank`
pub fn woodbury_factor<T: RealField>(
    low_rank: ArrayView3<'_, T>,
    shift: &Shift<T>,
    config: &WoodburyConfig,
) -> Result<WoodburyFactor<T>> {
    let (batch_len, k, n) = low_rank.dim();
    shift.check(batch_len, n)?;
    let precision = config.precision.resolve::<T>();

    log::debug!(
        "Woodbury factor: batch {}, rank {}, n {}, solve precision {}",
        batch_len,
        k,
        n,
        precision.name()
    );

    let factors = map_batches(batch_len, |b| {
        factor_one(
            low_rank.index_axis(Axis(0), b),
            &shift.diagonal(b, n),
            precision,
            b,
        )
    });

    let mut r = Array3::zeros((batch_len, k, n));
    for (mut out, factor) in r.outer_iter_mut().zip(factors) {
        out.assign(&factor?);
    }
    Ok(WoodburyFactor { r })
}

/// `x = a (E b - E Vᵗ R E b)` for the columns of `b` (shape `(n, ncols)`)
fn apply_one<T: RealField>(
    b: ArrayView2<'_, T>,
    v: ArrayView2<'_, T>,
    r: ArrayView2<'_, T>,
    inv_shift: ArrayView1<'_, T>,
    scale: T,
) -> Array2<T> {
    let inv_col = inv_shift.insert_axis(Axis(1));
    let shifted = &b * &inv_col;
    let diff = &v.t().dot(&r.dot(&shifted)) * &inv_col;
    let mut x = shifted - diff;
    x.mapv_inplace(|xi| xi * scale);
    x
}

fn check_factor<T: RealField>(
    low_rank: &ArrayView3<'_, T>,
    factor: &WoodburyFactor<T>,
) -> Result<()> {
    let (batch_len, k, n) = low_rank.dim();
    if factor.batch_len() != batch_len {
        return Err(LowRankError::mismatch("factor batch", batch_len, factor.batch_len()));
    }
    if factor.rank() != k {
        return Err(LowRankError::mismatch("factor rank", k, factor.rank()));
    }
    if factor.size() != n {
        return Err(LowRankError::mismatch("factor columns", n, factor.size()));
    }
    Ok(())
}

/// Solve `(diag(shift) + VᵗV) X = B` for several right-hand sides per batch element
///
/// `b` has shape `(batch_len, n, ncols)`; the result has the same shape.
pub fn woodbury_solve_many<T: RealField>(
    b: ArrayView3<'_, T>,
    low_rank: ArrayView3<'_, T>,
    factor: &WoodburyFactor<T>,
    shift: &Shift<T>,
) -> Result<Array3<T>> {
    let (batch_len, _, n) = low_rank.dim();
    check_factor(&low_rank, factor)?;
    shift.check(batch_len, n)?;
    if b.len_of(Axis(0)) != batch_len {
        return Err(LowRankError::mismatch("right-hand side batch", batch_len, b.len_of(Axis(0))));
    }
    if b.len_of(Axis(1)) != n {
        return Err(LowRankError::mismatch("right-hand side length", n, b.len_of(Axis(1))));
    }

    let solutions = map_batches(batch_len, |batch| -> Result<Array2<T>> {
        let (inv_shift, scale) = scaled_inverse(&shift.diagonal(batch, n), batch)?;
        Ok(apply_one(
            b.index_axis(Axis(0), batch),
            low_rank.index_axis(Axis(0), batch),
            factor.for_batch(batch),
            inv_shift.view(),
            scale,
        ))
    });

    let mut x = Array3::zeros(b.raw_dim());
    for (mut out, solution) in x.outer_iter_mut().zip(solutions) {
        out.assign(&solution?);
    }
    Ok(x)
}

/// Solve `(diag(shift) + VᵗV) x = b` for one right-hand side per batch element
///
/// `b` has shape `(batch_len, n)`; the result has the same shape.
pub fn woodbury_solve<T: RealField>(
    b: ArrayView2<'_, T>,
    low_rank: ArrayView3<'_, T>,
    factor: &WoodburyFactor<T>,
    shift: &Shift<T>,
) -> Result<Array2<T>> {
    let x = woodbury_solve_many(b.insert_axis(Axis(2)), low_rank, factor, shift)?;
    Ok(x.index_axis_move(Axis(2), 0))
}

/// Woodbury factor of a single `k x n` matrix `V`
pub fn woodbury_factor_single<T: RealField>(
    low_rank: &Array2<T>,
    shift: &Array1<T>,
    config: &WoodburyConfig,
) -> Result<Array2<T>> {
    let factor = woodbury_factor(
        low_rank.view().insert_axis(Axis(0)),
        &Shift::Vector(shift.clone()),
        config,
    )?;
    Ok(factor.r.index_axis_move(Axis(0), 0))
}

/// Solve `(diag(shift) + VᵗV) x = b` for a single system
pub fn woodbury_solve_single<T: RealField>(
    b: &Array1<T>,
    low_rank: &Array2<T>,
    factor: &Array2<T>,
    shift: &Array1<T>,
) -> Result<Array1<T>> {
    let factor = WoodburyFactor {
        r: factor.view().insert_axis(Axis(0)).to_owned(),
    };
    let x = woodbury_solve(
        b.view().insert_axis(Axis(0)),
        low_rank.view().insert_axis(Axis(0)),
        &factor,
        &Shift::Vector(shift.clone()),
    )?;
    Ok(x.index_axis_move(Axis(0), 0))
}

/// Preconditioner applying `(diag(shift) + VᵗV)⁻¹`
///
/// With `V` a pivoted Cholesky factor of a kernel matrix `K`, this
/// approximates `(K + diag(shift))⁻¹` at `O(kn)` cost per application.
#[derive(Debug, Clone)]
pub struct WoodburyPreconditioner<T: RealField> {
    low_rank: Array2<T>,
    factor: Array2<T>,
    inv_shift: Array1<T>,
    scale: T,
}

impl<T: RealField> WoodburyPreconditioner<T> {
    /// Build from a `k x n` low-rank matrix and a length-`n` shift
    pub fn new(low_rank: Array2<T>, shift: &Array1<T>, config: &WoodburyConfig) -> Result<Self> {
        let (inv_shift, scale) = scaled_inverse(shift, 0)?;
        let factor = woodbury_factor_single(&low_rank, shift, config)?;
        Ok(Self {
            low_rank,
            factor,
            inv_shift,
            scale,
        })
    }

    /// Rank `k` of the low-rank term
    pub fn rank(&self) -> usize {
        self.low_rank.nrows()
    }

    /// The low-rank matrix `V`
    pub fn low_rank(&self) -> &Array2<T> {
        &self.low_rank
    }

    /// The Woodbury factor `R`
    pub fn factor(&self) -> &Array2<T> {
        &self.factor
    }
}

impl<T: RealField> Preconditioner<T> for WoodburyPreconditioner<T> {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        let x = apply_one(
            r.view().insert_axis(Axis(1)),
            self.low_rank.view(),
            self.factor.view(),
            self.inv_shift.view(),
            self.scale,
        );
        x.index_axis_move(Axis(1), 0)
    }
}

/// Build a [`WoodburyPreconditioner`] for `K + diag(shift)` from a pivoted
/// Cholesky factor of batch element `batch` of `matrix`
pub fn pivoted_cholesky_preconditioner<T, M>(
    matrix: &mut M,
    config: &PivotedCholeskyConfig<T>,
    batch: usize,
    shift: &Array1<T>,
    woodbury_config: &WoodburyConfig,
) -> Result<WoodburyPreconditioner<T>>
where
    T: RealField,
    M: MatrixAccess<T> + ?Sized,
{
    let batch_len = matrix.batch_len();
    if batch >= batch_len {
        return Err(LowRankError::IndexOutOfBounds {
            index: batch,
            len: batch_len,
        });
    }
    let result = pivoted_cholesky(matrix, config)?;
    let low_rank = result.factor_for(batch).to_owned();
    log::debug!(
        "pivoted Cholesky preconditioner: rank {}, converged = {}",
        low_rank.nrows(),
        result.converged
    );
    WoodburyPreconditioner::new(low_rank, shift, woodbury_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::cholesky_solve;
    use approx::assert_relative_eq;
    use half::f16;
    use ndarray::array;

    fn dense_system(v: &Array2<f64>, shift: &Array1<f64>) -> Array2<f64> {
        let mut a = v.t().dot(v);
        for i in 0..shift.len() {
            a[[i, i]] += shift[i];
        }
        a
    }

    #[test]
    fn test_identity_rows_example() {
        let v = array![[1.0_f64, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let shift = array![1.0_f64, 1.0, 1.0];
        let b = array![2.0_f64, 2.0, 1.0];

        let r = woodbury_factor_single(&v, &shift, &WoodburyConfig::default()).unwrap();
        // M = 2I, so R = V / 2
        for (ri, vi) in r.iter().zip(v.iter()) {
            assert_relative_eq!(*ri, vi / 2.0, epsilon = 1e-12);
        }

        let x = woodbury_solve_single(&b, &v, &r, &shift).unwrap();
        for i in 0..3 {
            assert_relative_eq!(x[i], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_matches_dense_solve_with_uneven_shift() {
        let v = array![[0.5_f64, -1.0, 0.3, 2.0], [1.5, 0.2, -0.7, 0.1]];
        let shift = array![0.01_f64, 2.0, 50.0, 0.5];
        let b = array![1.0_f64, -2.0, 0.5, 3.0];

        let r = woodbury_factor_single(&v, &shift, &WoodburyConfig::default()).unwrap();
        let x = woodbury_solve_single(&b, &v, &r, &shift).unwrap();
        let expected = cholesky_solve(&dense_system(&v, &shift), &b).unwrap();

        for i in 0..4 {
            assert_relative_eq!(x[i], expected[i], max_relative = 1e-9);
        }
    }

    #[test]
    fn test_multiple_right_hand_sides() {
        let v = array![[1.0_f64, 2.0, 0.0], [0.0, 1.0, 1.0]];
        let shift = array![1.0_f64, 0.5, 2.0];
        let factor = woodbury_factor(
            v.view().insert_axis(Axis(0)),
            &Shift::Vector(shift.clone()),
            &WoodburyConfig::default(),
        )
        .unwrap();

        let b = array![[[1.0_f64, 0.0], [0.0, 1.0], [2.0, -1.0]]];
        let x = woodbury_solve_many(
            b.view(),
            v.view().insert_axis(Axis(0)),
            &factor,
            &Shift::Vector(shift.clone()),
        )
        .unwrap();

        let a = dense_system(&v, &shift);
        for col in 0..2 {
            let expected = cholesky_solve(&a, &b.slice(ndarray::s![0, .., col])).unwrap();
            for i in 0..3 {
                assert_relative_eq!(x[[0, i, col]], expected[i], max_relative = 1e-10);
            }
        }
    }

    #[test]
    fn test_scalar_and_batched_shift() {
        let mut v = Array3::zeros((2, 1, 2));
        v.index_axis_mut(Axis(0), 0).assign(&array![[1.0_f64, 1.0]]);
        v.index_axis_mut(Axis(0), 1).assign(&array![[2.0_f64, 0.0]]);
        let b = array![[1.0_f64, 1.0], [1.0, 1.0]];

        let scalar = Shift::Scalar(2.0);
        let factor = woodbury_factor(v.view(), &scalar, &WoodburyConfig::default()).unwrap();
        let x_scalar = woodbury_solve(b.view(), v.view(), &factor, &scalar).unwrap();

        let batched = Shift::Batched(array![[2.0_f64, 2.0], [2.0, 2.0]]);
        let factor = woodbury_factor(v.view(), &batched, &WoodburyConfig::default()).unwrap();
        let x_batched = woodbury_solve(b.view(), v.view(), &factor, &batched).unwrap();

        for (a, c) in x_scalar.iter().zip(x_batched.iter()) {
            assert_relative_eq!(*a, *c, epsilon = 1e-14);
        }

        // Batch 1: diag(2, 2) + [[4, 0], [0, 0]] = diag(6, 2)
        assert_relative_eq!(x_scalar[[1, 0]], 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(x_scalar[[1, 1]], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_rank() {
        let v = Array2::<f64>::zeros((0, 3));
        let shift = array![1.0_f64, 2.0, 4.0];
        let r = woodbury_factor_single(&v, &shift, &WoodburyConfig::default()).unwrap();
        assert_eq!(r.dim(), (0, 3));

        let x = woodbury_solve_single(&array![1.0, 1.0, 1.0], &v, &r, &shift).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x[2], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_shift_is_instability() {
        let v = array![[1.0_f64, 0.0]];
        let shift = array![1.0_f64, 0.0];
        let err = woodbury_factor_single(&v, &shift, &WoodburyConfig::default()).unwrap_err();
        assert!(err.is_numerical_instability());
        assert!(matches!(err, LowRankError::ZeroShift { batch: 0, index: 1 }));
    }

    #[test]
    fn test_shape_mismatch_is_invalid_argument() {
        let v = array![[1.0_f64, 0.0, 0.0]];
        let shift = array![1.0_f64, 1.0];
        let err = woodbury_factor_single(&v, &shift, &WoodburyConfig::default()).unwrap_err();
        assert!(err.is_invalid_argument());

        let shift = array![1.0_f64, 1.0, 1.0];
        let r = woodbury_factor_single(&v, &shift, &WoodburyConfig::default()).unwrap();
        let err = woodbury_solve_single(&array![1.0, 2.0], &v, &r, &shift).unwrap_err();
        assert!(matches!(err, LowRankError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_half_precision_upcast() {
        let v64 = array![[0.5_f64, -1.0, 0.25], [1.0, 0.5, -0.5]];
        let shift64 = array![1.0_f64, 2.0, 0.5];
        let b64 = array![1.0_f64, 0.0, -1.0];

        let v: Array2<f16> = cast_array(&v64);
        let shift: Array1<f16> = cast_array(&shift64);
        let b: Array1<f16> = cast_array(&b64);

        let r = woodbury_factor_single(&v, &shift, &WoodburyConfig::upcast_half()).unwrap();
        let x = woodbury_solve_single(&b, &v, &r, &shift).unwrap();
        let expected = cholesky_solve(&dense_system(&v64, &shift64), &b64).unwrap();

        for i in 0..3 {
            assert_relative_eq!(x[i].to_f64(), expected[i], epsilon = 2e-2);
        }
    }

    #[test]
    fn test_half_precision_default_upcasts() {
        let v64 = array![
            [0.9_f64, -0.4, 0.3, 0.7],
            [0.2, 0.8, -0.6, 0.1],
            [-0.5, 0.3, 0.9, -0.2]
        ];
        let shift64 = array![0.01_f64, 0.02, 0.01, 0.05];
        let b64 = array![1.0_f64, -1.0, 0.5, 2.0];

        let v: Array2<f16> = cast_array(&v64);
        let shift: Array1<f16> = cast_array(&shift64);
        let b: Array1<f16> = cast_array(&b64);

        let default = woodbury_factor_single(&v, &shift, &WoodburyConfig::default()).unwrap();
        let upcast = woodbury_factor_single(&v, &shift, &WoodburyConfig::upcast_half()).unwrap();
        assert_eq!(default, upcast);

        let x_default = woodbury_solve_single(&b, &v, &default, &shift).unwrap();
        let x_upcast = woodbury_solve_single(&b, &v, &upcast, &shift).unwrap();
        assert_eq!(x_default, x_upcast);

        // Explicitly asking for working precision on f16 goes through the same policy
        let working = WoodburyConfig::default().with_precision(SolvePrecision::Working);
        let r = woodbury_factor_single(&v, &shift, &working).unwrap();
        assert_eq!(r, upcast);
    }

    #[test]
    fn test_preconditioner_accepts_woodbury_config() {
        let kernel = array![[2.0_f32, 0.5, 0.1], [0.5, 1.5, 0.3], [0.1, 0.3, 1.0]];
        let mut matrix = crate::matrix::DenseMatrix::from_array2(kernel).unwrap();
        let shift = array![0.1_f32, 0.1, 0.1];
        let config = PivotedCholeskyConfig::new(2).with_error_tol(0.0);

        let working = pivoted_cholesky_preconditioner(
            &mut matrix,
            &config,
            0,
            &shift,
            &WoodburyConfig::default(),
        )
        .unwrap();
        let double = pivoted_cholesky_preconditioner(
            &mut matrix,
            &config,
            0,
            &shift,
            &WoodburyConfig::default().with_precision(SolvePrecision::Double),
        )
        .unwrap();

        assert_eq!(working.rank(), 2);
        for (a, b) in working.factor().iter().zip(double.factor().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }

        let err = pivoted_cholesky_preconditioner(
            &mut matrix,
            &config,
            1,
            &shift,
            &WoodburyConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LowRankError::IndexOutOfBounds { index: 1, len: 1 }));
    }

    #[test]
    fn test_double_precision_policy_for_f32() {
        let v = array![[0.5_f32, -1.0, 0.25], [1.0, 0.5, -0.5]];
        let shift = array![1.0_f32, 2.0, 0.5];
        let working = woodbury_factor_single(&v, &shift, &WoodburyConfig::default()).unwrap();
        let config = WoodburyConfig::default().with_precision(SolvePrecision::Double);
        let double = woodbury_factor_single(&v, &shift, &config).unwrap();
        for (a, b) in working.iter().zip(double.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_preconditioner_matches_solve() {
        let v = array![[0.5_f64, -1.0, 0.3], [1.5, 0.2, -0.7]];
        let shift = array![0.1_f64, 0.2, 0.3];
        let precond =
            WoodburyPreconditioner::new(v.clone(), &shift, &WoodburyConfig::default()).unwrap();
        assert_eq!(precond.rank(), 2);

        let b = array![1.0_f64, 2.0, 3.0];
        let y = precond.apply(&b);
        let x = woodbury_solve_single(&b, &v, precond.factor(), &shift).unwrap();
        for i in 0..3 {
            assert_relative_eq!(y[i], x[i], epsilon = 1e-14);
        }
    }
}
