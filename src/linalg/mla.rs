//! Ragged multi-level array, mirroring `Math/MultiLevelArray.h`.
//!
//! The original is a single flat buffer plus per-level index tables,
//! rematerialised as non-owning sub-views. Rust's ownership rules make the
//! non-owning nested-view trick (`MultiLevelSpan`) awkward to reproduce
//! faithfully; per the Design Notes this is instead exposed as an owned
//! flat buffer plus an offset table returning explicit slice views, which
//! is the two-level case (`MultiLevelArray<T>`, aliased as `TwoLevelArray`).
//! Three- and four-level ragged structures (`[field][operator][gridPoint]`
//! and deeper) are built by nesting: a `Vec` of `MultiLevelArray<T>`, which
//! keeps each level's flat buffer contiguous without forcing the whole
//! structure into a single allocation.

/// A ragged two-level array: `rowCount` rows of independently-sized length,
/// backed by one flat buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLevelArray<T> {
    data: Vec<T>,
    offsets: Vec<usize>,
}

impl<T: Clone + Default> MultiLevelArray<T> {
    /// Builds a ragged array from a pre-declared row-length structure,
    /// filling every slot with `T::default()`.
    pub fn from_row_lengths(row_lengths: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(row_lengths.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for &len in row_lengths {
            total += len;
            offsets.push(total);
        }
        Self {
            data: vec![T::default(); total],
            offsets,
        }
    }
}

impl<T> MultiLevelArray<T> {
    pub fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut data = Vec::new();
        offsets.push(0);
        for row in rows {
            data.extend(row);
            offsets.push(data.len());
        }
        Self { data, offsets }
    }

    pub fn num_rows(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn row_len(&self, row: usize) -> usize {
        self.offsets[row + 1] - self.offsets[row]
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[self.offsets[row]..self.offsets[row + 1]]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        &mut self.data[self.offsets[row]..self.offsets[row + 1]]
    }

    pub fn flatten(&self) -> &[T] {
        &self.data
    }

    pub fn flatten_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn element_count(&self) -> usize {
        self.data.len()
    }
}

/// Alias matching the original's naming for the common two-level case.
pub type TwoLevelArray<T> = MultiLevelArray<T>;
/// Three-level ragged array: `[outer][middle][leaf]`, each outer slot
/// owning its own contiguous `MultiLevelArray`.
pub type ThreeLevelArray<T> = Vec<MultiLevelArray<T>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_keep_independent_lengths() {
        let mla = MultiLevelArray::from_rows(vec![vec![1, 2, 3], vec![4], vec![5, 6]]);
        assert_eq!(mla.num_rows(), 3);
        assert_eq!(mla.row(0), &[1, 2, 3]);
        assert_eq!(mla.row(1), &[4]);
        assert_eq!(mla.row(2), &[5, 6]);
        assert_eq!(mla.flatten(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn from_row_lengths_default_fills() {
        let mla: MultiLevelArray<f64> = MultiLevelArray::from_row_lengths(&[2, 0, 1]);
        assert_eq!(mla.row(0), &[0.0, 0.0]);
        assert_eq!(mla.row(1), &[] as &[f64]);
        assert_eq!(mla.row(2), &[0.0]);
    }

    #[test]
    fn row_mut_writes_back_into_flat_buffer() {
        let mut mla = MultiLevelArray::from_rows(vec![vec![0, 0], vec![0]]);
        mla.row_mut(0)[1] = 9;
        assert_eq!(mla.flatten(), &[0, 9, 0]);
    }
}
