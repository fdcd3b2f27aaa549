//! Sparse vector, mirroring `Math/SparseVector.h`.

use super::Vector;

/// A sparse vector of logical length `len`, storing only its nonzero
/// `(index, value)` pairs. Indices are not required to be sorted by the
/// producers in this crate (interpolation weights are built axis by axis),
/// but dot products against a dense vector don't need that ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVec {
    indices: Vec<usize>,
    values: Vec<f64>,
    len: usize,
}

impl SparseVec {
    pub fn new(len: usize) -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
            len,
        }
    }

    pub fn from_pairs(len: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (i, v) in pairs {
            debug_assert!(i < len);
            indices.push(i);
            values.push(v);
        }
        Self {
            indices,
            values,
            len,
        }
    }

    pub fn push(&mut self, index: usize, value: f64) {
        debug_assert!(index < self.len);
        self.indices.push(index);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Dot product against a dense vector of the same logical length.
    pub fn dot(&self, dense: &Vector) -> f64 {
        debug_assert_eq!(dense.len(), self.len);
        self.iter().map(|(i, v)| v * dense[i]).sum()
    }

    pub fn to_dense(&self) -> Vector {
        let mut out = Vector::zeros(self.len);
        for (i, v) in self.iter() {
            out[i] += v;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_product_against_dense_vector() {
        let sv = SparseVec::from_pairs(5, [(1, 2.0), (3, 4.0)]);
        let dense = Vector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(sv.dot(&dense), 2.0 * 2.0 + 4.0 * 4.0);
    }

    #[test]
    fn to_dense_round_trips_nonzeros() {
        let sv = SparseVec::from_pairs(3, [(0, 1.0), (2, 3.0)]);
        assert_eq!(sv.to_dense(), Vector::from_vec(vec![1.0, 0.0, 3.0]));
    }
}
