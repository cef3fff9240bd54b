//! Vector kernels shared by the factorization and the iterative solvers
//!
//! Plain Rust loops over contiguous ndarray storage. They are generic over
//! [`RealField`] so the same code runs at half, single and double precision.

use crate::traits::RealField;
use ndarray::{ArrayBase, Data, DataMut, Ix1};

/// Compute inner product (x, y) = Σ x_i * y_i
#[inline]
pub fn inner_product<T, S1, S2>(x: &ArrayBase<S1, Ix1>, y: &ArrayBase<S2, Ix1>) -> T
where
    T: RealField,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
{
    assert_eq!(
        x.len(),
        y.len(),
        "Vector lengths must match for inner product"
    );
    let mut sum = T::zero();
    for (xi, yi) in x.iter().zip(y.iter()) {
        sum += *xi * *yi;
    }
    sum
}

/// Compute vector 2-norm: ||x||_2 = sqrt(Σ x_i^2)
#[inline]
pub fn vector_norm<T, S>(x: &ArrayBase<S, Ix1>) -> T
where
    T: RealField,
    S: Data<Elem = T>,
{
    vector_norm_sqr(x).sqrt()
}

/// Compute vector norm squared: ||x||_2^2 = Σ x_i^2
#[inline]
pub fn vector_norm_sqr<T, S>(x: &ArrayBase<S, Ix1>) -> T
where
    T: RealField,
    S: Data<Elem = T>,
{
    let mut sum = T::zero();
    for xi in x.iter() {
        sum += xi.norm_sqr();
    }
    sum
}

/// Compute vector 1-norm: ||x||_1 = Σ |x_i|
#[inline]
pub fn l1_norm<T, S>(x: &ArrayBase<S, Ix1>) -> T
where
    T: RealField,
    S: Data<Elem = T>,
{
    let mut sum = T::zero();
    for xi in x.iter() {
        sum += xi.abs();
    }
    sum
}

/// Compute axpy: y = α * x + y
#[inline]
pub fn axpy<T, S1, S2>(alpha: T, x: &ArrayBase<S1, Ix1>, y: &mut ArrayBase<S2, Ix1>)
where
    T: RealField,
    S1: Data<Elem = T>,
    S2: DataMut<Elem = T>,
{
    for (xi, yi) in x.iter().zip(y.iter_mut()) {
        *yi += alpha * *xi;
    }
}

/// Compute vector scale in-place: x = α * x
#[inline]
pub fn scale_inplace<T, S>(x: &mut ArrayBase<S, Ix1>, alpha: T)
where
    T: RealField,
    S: DataMut<Elem = T>,
{
    for xi in x.iter_mut() {
        *xi *= alpha;
    }
}
