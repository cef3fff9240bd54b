//! Iterative solvers for linear systems
//!
//! This module provides Krylov subspace methods for large SPD systems:
//! - [`cg`]: Conjugate Gradient
//! - [`pcg`]: Preconditioned Conjugate Gradient, e.g. with a Woodbury preconditioner

mod cg;

pub use cg::{CgConfig, CgSolution, cg, pcg};
