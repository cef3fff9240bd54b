//! Access to batched symmetric PSD matrices
//!
//! The factorization never needs the whole matrix: it reads the diagonal once
//! and then one row per iteration. [`MatrixAccess`] captures exactly that, with
//! two implementations:
//! - [`DenseMatrix`]: a materialized `(batch, n, n)` array
//! - [`ImplicitMatrix`]: closures producing the diagonal and rows on demand,
//!   e.g. a kernel matrix evaluated lazily from input points

use crate::error::{LowRankError, Result};
use crate::traits::RealField;
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView2, Axis};
use std::fmt;

/// Read access to a batch of `n x n` symmetric PSD matrices.
///
/// Batch elements are addressed by their flat (row-major) index into
/// [`batch_shape`](MatrixAccess::batch_shape).
pub trait MatrixAccess<T: RealField> {
    /// Leading batch dimensions, empty for a single matrix
    fn batch_shape(&self) -> &[usize];

    /// Number of matrices in the batch
    fn batch_len(&self) -> usize {
        self.batch_shape().iter().product()
    }

    /// Matrix dimension `n`
    fn size(&self) -> usize;

    /// Materialize any deferred state before the diagonal or rows are read
    fn resolve(&mut self) -> Result<()> {
        Ok(())
    }

    /// Diagonal of every matrix, shape `(batch_len, n)`
    ///
    /// Implicit matrices may return an approximation.
    fn diagonal(&self) -> Result<Array2<T>>;

    /// Row `indices[b]` of matrix `b` for every batch element, shape `(batch_len, n)`
    fn rows(&self, indices: &[usize]) -> Result<Array2<T>>;
}

fn check_row_indices(indices: &[usize], batch_len: usize, n: usize) -> Result<()> {
    if indices.len() != batch_len {
        return Err(LowRankError::mismatch("row index batch", batch_len, indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&i| i >= n) {
        return Err(LowRankError::IndexOutOfBounds { index, len: n });
    }
    Ok(())
}

/// Dense batch of matrices stored as a `(batch_len, n, n)` array
#[derive(Debug, Clone)]
pub struct DenseMatrix<T: RealField> {
    data: Array3<T>,
    batch_shape: Vec<usize>,
}

impl<T: RealField> DenseMatrix<T> {
    /// Wrap a single `n x n` matrix (empty batch shape)
    pub fn from_array2(matrix: Array2<T>) -> Result<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(LowRankError::NotSquare { rows, cols });
        }
        Ok(Self {
            data: matrix.insert_axis(Axis(0)),
            batch_shape: Vec::new(),
        })
    }

    /// Wrap a `(batch, n, n)` stack of matrices
    pub fn from_batches(batches: Array3<T>) -> Result<Self> {
        let (batch, rows, cols) = batches.dim();
        if rows != cols {
            return Err(LowRankError::NotSquare { rows, cols });
        }
        Ok(Self {
            data: batches,
            batch_shape: vec![batch],
        })
    }

    /// Wrap an array of shape `[*batch_shape, n, n]`
    pub fn from_dyn(array: ArrayD<T>) -> Result<Self> {
        let ndim = array.ndim();
        if ndim < 2 {
            return Err(LowRankError::mismatch("matrix rank", 2, ndim));
        }
        let shape = array.shape().to_vec();
        let (rows, cols) = (shape[ndim - 2], shape[ndim - 1]);
        if rows != cols {
            return Err(LowRankError::NotSquare { rows, cols });
        }
        let batch_shape = shape[..ndim - 2].to_vec();
        let batch_len: usize = batch_shape.iter().product();
        let data = array
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((batch_len, rows, cols))
            .map_err(|_| {
                LowRankError::mismatch(
                    "batched matrix elements",
                    batch_len * rows * cols,
                    shape.iter().product(),
                )
            })?;
        Ok(Self { data, batch_shape })
    }

    /// View of matrix `batch`
    pub fn matrix(&self, batch: usize) -> ArrayView2<'_, T> {
        self.data.index_axis(Axis(0), batch)
    }

    /// The underlying `(batch_len, n, n)` storage
    pub fn as_array(&self) -> &Array3<T> {
        &self.data
    }
}

impl<T: RealField> MatrixAccess<T> for DenseMatrix<T> {
    fn batch_shape(&self) -> &[usize] {
        &self.batch_shape
    }

    fn batch_len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    fn size(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    fn diagonal(&self) -> Result<Array2<T>> {
        let (batch_len, n, _) = self.data.dim();
        let mut diag = Array2::zeros((batch_len, n));
        for (b, mut out) in diag.outer_iter_mut().enumerate() {
            out.assign(&self.matrix(b).diag());
        }
        Ok(diag)
    }

    fn rows(&self, indices: &[usize]) -> Result<Array2<T>> {
        let (batch_len, n, _) = self.data.dim();
        check_row_indices(indices, batch_len, n)?;
        let mut rows = Array2::zeros((batch_len, n));
        for (b, mut out) in rows.outer_iter_mut().enumerate() {
            out.assign(&self.matrix(b).row(indices[b]));
        }
        Ok(rows)
    }
}

/// Produces the diagonal of matrix `batch`
pub type DiagFn<T> = Box<dyn Fn(usize) -> Array1<T> + Send + Sync>;
/// Produces row `row` of matrix `batch`
pub type RowFn<T> = Box<dyn Fn(usize, usize) -> Array1<T> + Send + Sync>;
/// Materializes deferred state, called once before the first access
pub type ResolveFn = Box<dyn FnMut() -> Result<()> + Send>;

/// Matrix that is never formed, only queried for its diagonal and rows
pub struct ImplicitMatrix<T: RealField> {
    n: usize,
    batch_shape: Vec<usize>,
    diag_fn: DiagFn<T>,
    row_fn: RowFn<T>,
    resolve_fn: Option<ResolveFn>,
    resolved: bool,
}

impl<T: RealField> ImplicitMatrix<T> {
    /// Create a single implicit `n x n` matrix
    pub fn new<D, R>(n: usize, diag_fn: D, row_fn: R) -> Self
    where
        D: Fn(usize) -> Array1<T> + Send + Sync + 'static,
        R: Fn(usize, usize) -> Array1<T> + Send + Sync + 'static,
    {
        Self {
            n,
            batch_shape: Vec::new(),
            diag_fn: Box::new(diag_fn),
            row_fn: Box::new(row_fn),
            resolve_fn: None,
            resolved: false,
        }
    }

    /// Implicit matrix with entries `entry(i, j)`, e.g. a covariance kernel
    pub fn from_entries<F>(n: usize, entry: F) -> Self
    where
        F: Fn(usize, usize) -> T + Send + Sync + 'static,
    {
        let entry = std::sync::Arc::new(entry);
        let diag_entry = entry.clone();
        Self::new(
            n,
            move |_| Array1::from_shape_fn(n, |i| diag_entry(i, i)),
            move |_, row| Array1::from_shape_fn(n, |j| entry(row, j)),
        )
    }

    /// Treat the closures as covering a batch of the given shape
    pub fn with_batch_shape(mut self, batch_shape: Vec<usize>) -> Self {
        self.batch_shape = batch_shape;
        self
    }

    /// Register a hook that materializes deferred state
    pub fn with_resolve<F>(mut self, resolve_fn: F) -> Self
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        self.resolve_fn = Some(Box::new(resolve_fn));
        self.resolved = false;
        self
    }

    fn checked(&self, values: Array1<T>, what: &'static str) -> Result<Array1<T>> {
        if values.len() != self.n {
            return Err(LowRankError::mismatch(what, self.n, values.len()));
        }
        Ok(values)
    }
}

impl<T: RealField> fmt::Debug for ImplicitMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplicitMatrix")
            .field("n", &self.n)
            .field("batch_shape", &self.batch_shape)
            .field("has_resolve", &self.resolve_fn.is_some())
            .field("resolved", &self.resolved)
            .finish()
    }
}

impl<T: RealField> MatrixAccess<T> for ImplicitMatrix<T> {
    fn batch_shape(&self) -> &[usize] {
        &self.batch_shape
    }

    fn size(&self) -> usize {
        self.n
    }

    fn resolve(&mut self) -> Result<()> {
        if self.resolved {
            return Ok(());
        }
        if let Some(resolve_fn) = self.resolve_fn.as_mut() {
            resolve_fn()?;
        }
        self.resolved = true;
        Ok(())
    }

    fn diagonal(&self) -> Result<Array2<T>> {
        let batch_len = self.batch_len();
        let mut diag = Array2::zeros((batch_len, self.n));
        for (b, mut out) in diag.outer_iter_mut().enumerate() {
            out.assign(&self.checked((self.diag_fn)(b), "diagonal length")?);
        }
        Ok(diag)
    }

    fn rows(&self, indices: &[usize]) -> Result<Array2<T>> {
        let batch_len = self.batch_len();
        check_row_indices(indices, batch_len, self.n)?;
        let mut rows = Array2::zeros((batch_len, self.n));
        for (b, mut out) in rows.outer_iter_mut().enumerate() {
            out.assign(&self.checked((self.row_fn)(b, indices[b]), "row length")?);
        }
        Ok(rows)
    }
}
