//! Explicit pivot permutation with gather/scatter access
//!
//! The permutation is a plain index array. Reads of permuted data go through
//! [`Permutation::gather`], which copies into a fresh buffer, and writes go
//! through [`Permutation::scatter`]. No aliased view of the permuted data is
//! ever held while it is being written.

use crate::error::{LowRankError, Result};
use ndarray::{Array1, ArrayBase, Data, DataMut, Ix1};

/// A bijection on `[0, n)`.
///
/// After `m` pivoting steps the prefix `[0, m)` holds the chosen pivots in
/// selection order and the suffix `[m, n)` holds the remaining candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    /// The identity ordering `0, 1, ..., n-1`
    pub fn identity(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
        }
    }

    /// Build from an explicit index array, checking the bijection invariant
    pub fn from_indices(indices: Vec<usize>) -> Result<Self> {
        let perm = Self { indices };
        perm.check_bijection()?;
        Ok(perm)
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the permutation is over an empty set
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Index stored at `position`
    #[inline]
    pub fn get(&self, position: usize) -> usize {
        self.indices[position]
    }

    /// All indices in position order
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Indices at positions `[0, m)`
    pub fn head(&self, m: usize) -> &[usize] {
        &self.indices[..m]
    }

    /// Indices at positions `[m, n)`
    pub fn tail(&self, m: usize) -> &[usize] {
        &self.indices[m..]
    }

    /// Exchange the entries at two positions (a transposition)
    #[inline]
    pub fn swap(&mut self, a: usize, b: usize) {
        self.indices.swap(a, b);
    }

    /// Copy `values[perm[p]]` for every position `p >= from` into a new array
    pub fn gather<T, S>(&self, values: &ArrayBase<S, Ix1>, from: usize) -> Array1<T>
    where
        T: Copy,
        S: Data<Elem = T>,
    {
        self.tail(from).iter().map(|&idx| values[idx]).collect()
    }

    /// Write `updates[p - from]` to `target[perm[p]]` for every position `p >= from`
    pub fn scatter<T, S1, S2>(
        &self,
        target: &mut ArrayBase<S1, Ix1>,
        from: usize,
        updates: &ArrayBase<S2, Ix1>,
    ) where
        T: Copy,
        S1: DataMut<Elem = T>,
        S2: Data<Elem = T>,
    {
        debug_assert_eq!(updates.len(), self.len() - from);
        for (&idx, &value) in self.tail(from).iter().zip(updates.iter()) {
            target[idx] = value;
        }
    }

    /// The inverse permutation: `inverse.get(perm.get(p)) == p`
    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.len()];
        for (position, &idx) in self.indices.iter().enumerate() {
            inv[idx] = position;
        }
        Self { indices: inv }
    }

    /// Check that every index in `[0, n)` appears exactly once
    pub fn check_bijection(&self) -> Result<()> {
        let n = self.len();
        let mut seen = vec![false; n];
        for &idx in &self.indices {
            if idx >= n {
                return Err(LowRankError::IndexOutOfBounds { index: idx, len: n });
            }
            if seen[idx] {
                return Err(LowRankError::DuplicateIndex { index: idx });
            }
            seen[idx] = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_identity_and_swap() {
        let mut perm = Permutation::identity(4);
        perm.swap(0, 2);
        assert_eq!(perm.as_slice(), &[2, 1, 0, 3]);
        assert_eq!(perm.head(1), &[2]);
        assert_eq!(perm.tail(1), &[1, 0, 3]);
        assert!(perm.check_bijection().is_ok());
    }

    #[test]
    fn test_gather_scatter() {
        let perm = Permutation::from_indices(vec![3, 0, 2, 1]).unwrap();
        let values = array![10.0_f64, 11.0, 12.0, 13.0];

        let gathered = perm.gather(&values, 1);
        assert_eq!(gathered, array![10.0, 12.0, 11.0]);

        let mut target = array![0.0_f64, 0.0, 0.0, 0.0];
        perm.scatter(&mut target, 1, &gathered.mapv(|v| v + 1.0));
        assert_eq!(target, array![11.0, 12.0, 13.0, 0.0]);
    }

    #[test]
    fn test_inverse() {
        let perm = Permutation::from_indices(vec![2, 0, 3, 1]).unwrap();
        let inv = perm.inverse();
        for p in 0..4 {
            assert_eq!(inv.get(perm.get(p)), p);
        }
    }

    #[test]
    fn test_rejects_non_bijection() {
        assert!(Permutation::from_indices(vec![0, 0, 1]).is_err());
        assert!(Permutation::from_indices(vec![0, 3, 1]).is_err());
    }
}
