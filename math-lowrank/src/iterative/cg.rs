//! CG (Conjugate Gradient) solver
//!
//! The (preconditioned) Conjugate Gradient method for symmetric positive
//! definite systems. Pairs naturally with a
//! [`WoodburyPreconditioner`](crate::WoodburyPreconditioner) built from a
//! pivoted Cholesky factor when solving with `K + diag(shift)`.

use crate::blas_helpers::{axpy, inner_product, scale_inplace, vector_norm};
use crate::traits::{IdentityPreconditioner, LinearOperator, Preconditioner, RealField};
use ndarray::Array1;

/// CG solver configuration
#[derive(Debug, Clone)]
pub struct CgConfig<R> {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Relative tolerance for convergence
    pub tolerance: R,
    /// Print progress every N iterations (0 = no output)
    pub print_interval: usize,
}

impl Default for CgConfig<f64> {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            print_interval: 0,
        }
    }
}

impl Default for CgConfig<f32> {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-5,
            print_interval: 0,
        }
    }
}

/// CG solver result
#[derive(Debug)]
pub struct CgSolution<T: RealField> {
    /// Solution vector
    pub x: Array1<T>,
    /// Number of iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: T,
    /// Whether convergence was achieved
    pub converged: bool,
}

/// Solve Ax = b using the Conjugate Gradient method
///
/// Note: This method is only correct for symmetric positive definite matrices.
pub fn cg<T, A>(operator: &A, b: &Array1<T>, config: &CgConfig<T>) -> CgSolution<T>
where
    T: RealField,
    A: LinearOperator<T>,
{
    pcg(operator, b, &IdentityPreconditioner, config)
}

/// Solve Ax = b using the preconditioned Conjugate Gradient method
///
/// The preconditioner must be symmetric positive definite as well.
pub fn pcg<T, A, P>(
    operator: &A,
    b: &Array1<T>,
    preconditioner: &P,
    config: &CgConfig<T>,
) -> CgSolution<T>
where
    T: RealField,
    A: LinearOperator<T>,
    P: Preconditioner<T>,
{
    let n = b.len();
    let mut x = Array1::from_elem(n, T::zero());

    let b_norm = vector_norm(b);
    let tiny = T::min_positive_value();
    if b_norm <= tiny {
        return CgSolution {
            x,
            iterations: 0,
            residual: T::zero(),
            converged: true,
        };
    }

    // Initial residual r = b - Ax = b (since x = 0)
    let mut r = b.clone();
    let mut z = preconditioner.apply(&r);
    let mut p = z.clone();
    let mut rho = inner_product(&r, &z);

    for iter in 0..config.max_iterations {
        // q = A * p
        let q = operator.apply(&p);

        // alpha = rho / (p, q)
        let pq = inner_product(&p, &q);
        if pq.is_zero_approx(tiny) {
            return CgSolution {
                x,
                iterations: iter,
                residual: vector_norm(&r) / b_norm,
                converged: false,
            };
        }

        let alpha = rho / pq;

        // x = x + alpha * p
        axpy(alpha, &p, &mut x);

        // r = r - alpha * q
        axpy(-alpha, &q, &mut r);

        let rel_residual = vector_norm(&r) / b_norm;

        if config.print_interval > 0 && (iter + 1) % config.print_interval == 0 {
            log::info!(
                "CG iteration {}: relative residual = {:.6e}",
                iter + 1,
                rel_residual.to_f64_lossy()
            );
        }

        if rel_residual < config.tolerance {
            return CgSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: true,
            };
        }

        z = preconditioner.apply(&r);
        let rho_new = inner_product(&r, &z);
        if rho.is_zero_approx(tiny) {
            return CgSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                converged: false,
            };
        }

        let beta = rho_new / rho;
        rho = rho_new;

        // p = z + beta * p
        scale_inplace(&mut p, beta);
        axpy(T::one(), &z, &mut p);
    }

    let rel_residual = vector_norm(&r) / b_norm;
    log::warn!(
        "CG did not converge in {} iterations: relative residual = {:.6e}",
        config.max_iterations,
        rel_residual.to_f64_lossy()
    );
    CgSolution {
        x,
        iterations: config.max_iterations,
        residual: rel_residual,
        converged: false,
    }
}
