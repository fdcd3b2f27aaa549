//! CSR sparse matrix, built on `nalgebra_sparse::CsrMatrix` rather than a
//! bespoke triple of arrays — `nalgebra-sparse` is a direct dependency of
//! the teacher crate (see `diffsol/Cargo.toml`), reused here instead of
//! duplicated. Mirrors the shape contract of `Math/CSRMatrix.h`.

use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix;
use std::collections::HashMap;

use super::Vector;

/// A CSR matrix of `f64` values. Column indices within a row are kept
/// sorted ascending, matching `Math/CSRMatrix.h`'s assembly contract.
#[derive(Debug, Clone)]
pub struct Csr {
    inner: CsrMatrix<f64>,
}

impl Csr {
    pub fn from_inner(inner: CsrMatrix<f64>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &CsrMatrix<f64> {
        &self.inner
    }

    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn nnz(&self) -> usize {
        self.inner.nnz()
    }

    /// Builds a CSR matrix from row-major triplets, summing duplicate
    /// `(row, col)` entries (matches the accumulation requirement in
    /// Jacobian numerical assembly when building a pattern from scratch).
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Self {
        let mut coo = CooMatrix::new(nrows, ncols);
        for (r, c, v) in triplets {
            if v != 0.0 {
                coo.push(r, c, v);
            }
        }
        Self {
            inner: CsrMatrix::from(&coo),
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::from_triplets(n, n, (0..n).map(|i| (i, i, 1.0)))
    }

    /// Column indices of `row`, already sorted ascending by construction.
    pub fn row_col_indices(&self, row: usize) -> &[usize] {
        self.inner.row(row).col_indices()
    }

    pub fn row_values(&self, row: usize) -> &[f64] {
        self.inner.row(row).values()
    }

    /// Absolute offset into the flat `values`/`col_indices` arrays of the
    /// first entry of `row` (i.e. `rowPtr[row]`).
    pub fn row_offset(&self, row: usize) -> usize {
        self.inner.row_offsets()[row]
    }

    /// Binary-searches `row` for `col`, returning the absolute flat index
    /// into the values array if present. Used to precompute an O(1)
    /// scatter map during Jacobian structural analysis.
    pub fn find_slot(&self, row: usize, col: usize) -> Option<usize> {
        let cols = self.row_col_indices(row);
        cols.binary_search(&col)
            .ok()
            .map(|local| self.row_offset(row) + local)
    }

    pub fn values(&self) -> &[f64] {
        self.inner.values()
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        self.inner.values_mut()
    }

    pub fn zero_values(&mut self) {
        self.values_mut().iter_mut().for_each(|v| *v = 0.0);
    }

    /// Accumulates (rather than overwrites) into a flat slot obtained from
    /// `find_slot`. Numerical Jacobian assembly relies on this: several
    /// operator indices may scatter into the same CSR slot.
    pub fn accumulate(&mut self, flat_index: usize, value: f64) {
        self.values_mut()[flat_index] += value;
    }

    pub fn gemv(&self, x: &Vector) -> Vector {
        debug_assert_eq!(x.len(), self.ncols());
        let mut y = Vector::zeros(self.nrows());
        for row in 0..self.nrows() {
            let cols = self.row_col_indices(row);
            let vals = self.row_values(row);
            let mut acc = 0.0;
            for (&c, &v) in cols.iter().zip(vals) {
                acc += v * x[c];
            }
            y[row] = acc;
        }
        y
    }

    /// Sparse-sparse matrix product `self * other`, via row-wise
    /// accumulation (Gustavson's algorithm). Used to compose per-axis
    /// differentiation matrices into a multi-dimensional operator.
    pub fn matmul(&self, other: &Csr) -> Csr {
        assert_eq!(self.ncols(), other.nrows());
        let mut triplets = Vec::new();
        for row in 0..self.nrows() {
            let mut accum: HashMap<usize, f64> = HashMap::new();
            for (&k, &a_ik) in self
                .row_col_indices(row)
                .iter()
                .zip(self.row_values(row))
            {
                for (&j, &b_kj) in other.row_col_indices(k).iter().zip(other.row_values(k)) {
                    *accum.entry(j).or_insert(0.0) += a_ik * b_kj;
                }
            }
            for (j, v) in accum {
                if v != 0.0 {
                    triplets.push((row, j, v));
                }
            }
        }
        Csr::from_triplets(self.nrows(), other.ncols(), triplets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_gemv_is_noop() {
        let id = Csr::identity(3);
        let x = Vector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(id.gemv(&x), x);
    }

    #[test]
    fn matmul_composes_two_scalings() {
        let a = Csr::from_triplets(2, 2, [(0, 0, 2.0), (1, 1, 3.0)]);
        let b = Csr::from_triplets(2, 2, [(0, 0, 5.0), (1, 1, 7.0)]);
        let c = a.matmul(&b);
        let x = Vector::from_vec(vec![1.0, 1.0]);
        let y = c.gemv(&x);
        assert_eq!(y, Vector::from_vec(vec![10.0, 21.0]));
    }

    #[test]
    fn find_slot_locates_existing_entry() {
        let m = Csr::from_triplets(2, 2, [(0, 1, 4.0)]);
        assert_eq!(m.find_slot(0, 1), Some(0));
        assert_eq!(m.find_slot(0, 0), None);
    }

    #[test]
    fn accumulate_adds_rather_than_overwrites() {
        let mut m = Csr::from_triplets(1, 1, [(0, 0, 1.0)]);
        let slot = m.find_slot(0, 0).unwrap();
        m.accumulate(slot, 5.0);
        assert_eq!(m.values()[slot], 6.0);
    }
}
