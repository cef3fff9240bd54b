//! Batch-wise parallel utilities with feature-gated implementations
//!
//! Every batch element of a factorization owns its own state, so the
//! per-iteration work can be spread over rayon when the `rayon` feature is
//! enabled. Without it the same closures run sequentially.

use crate::error::Result;

/// Check if parallel processing is available
#[cfg(feature = "rayon")]
pub fn is_parallel_available() -> bool {
    true
}

/// Check if parallel processing is available
#[cfg(not(feature = "rayon"))]
pub fn is_parallel_available() -> bool {
    false
}

/// Apply `f` to every batch state, in parallel
///
/// All batch elements run even if one fails; the error of the lowest
/// failing batch index is returned so results do not depend on scheduling.
#[cfg(feature = "rayon")]
pub fn try_for_each_batch<S, F>(states: &mut [S], f: F) -> Result<()>
where
    S: Send,
    F: Fn(usize, &mut S) -> Result<()> + Sync + Send,
{
    use rayon::prelude::*;
    let outcomes: Vec<Result<()>> = states
        .par_iter_mut()
        .enumerate()
        .map(|(b, state)| f(b, state))
        .collect();
    outcomes.into_iter().collect()
}

/// Apply `f` to every batch state (sequential fallback)
#[cfg(not(feature = "rayon"))]
pub fn try_for_each_batch<S, F>(states: &mut [S], f: F) -> Result<()>
where
    F: Fn(usize, &mut S) -> Result<()>,
{
    let outcomes: Vec<Result<()>> = states
        .iter_mut()
        .enumerate()
        .map(|(b, state)| f(b, state))
        .collect();
    outcomes.into_iter().collect()
}

/// Parallel map with batch index
#[cfg(feature = "rayon")]
pub fn map_batches<U, F>(count: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(usize) -> U + Sync + Send,
{
    use rayon::prelude::*;
    (0..count).into_par_iter().map(f).collect()
}

/// Sequential map with batch index (fallback)
#[cfg(not(feature = "rayon"))]
pub fn map_batches<U, F>(count: usize, f: F) -> Vec<U>
where
    F: Fn(usize) -> U,
{
    (0..count).map(f).collect()
}
