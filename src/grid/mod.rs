//! Structured direct-product grid, mirroring `Grid/DirectProductGrid.h` and
//! `Grid/Grid.h`.
//!
//! Dimension is represented as a runtime `Vec<Axis>` rather than a
//! const-generic parameter — see DESIGN.md's "Grid dimension
//! representation" entry.

use crate::error::{CesdsolError, Result};

/// A single axis of a direct-product grid: a sorted, not-necessarily-
/// uniform point list and an optional period.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    points: Vec<f64>,
    period: Option<f64>,
}

impl Axis {
    pub fn new(points: Vec<f64>, period: Option<f64>, axis_index: usize) -> Result<Self> {
        if points.is_empty() {
            return Err(CesdsolError::EmptyAxis { axis: axis_index });
        }
        for i in 1..points.len() {
            if !(points[i] > points[i - 1]) {
                return Err(CesdsolError::NonMonotonicAxis {
                    axis: axis_index,
                    index: i,
                });
            }
        }
        if let Some(p) = period {
            if !(p > 0.0) {
                return Err(CesdsolError::NonPositivePeriod {
                    axis: axis_index,
                    period: p,
                });
            }
        }
        Ok(Self { points, period })
    }

    pub fn uniform(start: f64, end: f64, count: usize, period: Option<f64>, axis_index: usize) -> Result<Self> {
        Self::new(crate::linalg::vector_ops::uniform_range(start, end, count), period, axis_index)
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn is_periodic(&self) -> bool {
        self.period.is_some()
    }

    pub fn period(&self) -> Option<f64> {
        self.period
    }
}

/// A structured direct-product grid over `D = axes.len()` dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    axes: Vec<Axis>,
    /// Per-grid-point region index, indexed by single index.
    regions: Vec<usize>,
}

impl Grid {
    pub fn new(axes: Vec<Axis>) -> Self {
        let regions = Self::make_regions(&axes);
        Self { axes, regions }
    }

    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis_grid(&self, d: usize) -> &[f64] {
        self.axes[d].points()
    }

    pub fn dimension_size(&self, d: usize) -> usize {
        self.axes[d].size()
    }

    pub fn is_periodic(&self, d: usize) -> bool {
        self.axes[d].is_periodic()
    }

    pub fn period(&self, d: usize) -> Option<f64> {
        self.axes[d].period()
    }

    /// Total number of grid points `G = prod(Nd)`.
    pub fn size(&self) -> usize {
        self.axes.iter().map(|a| a.size()).product()
    }

    /// `1 + 2 * (number of non-periodic axes)`.
    pub fn region_count(&self) -> usize {
        1 + 2 * self.axes.iter().filter(|a| !a.is_periodic()).count()
    }

    /// Lexicographic single index from a multi-index, last axis
    /// fastest-varying.
    pub fn single_index_of(&self, multi: &[usize]) -> usize {
        debug_assert_eq!(multi.len(), self.dimension());
        let mut single = 0usize;
        for (d, &m) in multi.iter().enumerate() {
            single = single * self.axes[d].size() + m;
        }
        single
    }

    pub fn multi_index_of(&self, mut single: usize) -> Vec<usize> {
        let d = self.dimension();
        let mut multi = vec![0usize; d];
        for axis in (0..d).rev() {
            let size = self.axes[axis].size();
            multi[axis] = single % size;
            single /= size;
        }
        multi
    }

    pub fn coords_of(&self, single: usize) -> Vec<f64> {
        self.multi_index_of(single)
            .iter()
            .enumerate()
            .map(|(d, &m)| self.axes[d].points()[m])
            .collect()
    }

    pub fn region_of(&self, single: usize) -> usize {
        self.regions[single]
    }

    /// Region labelling: interior is 0; for each non-periodic axis `i`,
    /// boundary points get region `2i+1` (low end) or `2i+2` (high end).
    /// Assigned in reverse axis order so the *last* non-periodic axis at a
    /// boundary dominates at corners, matching `MakePoints` in the
    /// original `DirectProductGrid.h`.
    fn make_regions(axes: &[Axis]) -> Vec<usize> {
        let sizes: Vec<usize> = axes.iter().map(|a| a.size()).collect();
        let total: usize = sizes.iter().product::<usize>().max(1);
        let dims = axes.len();
        let mut regions = vec![0usize; if axes.is_empty() { 0 } else { total }];
        for single in 0..regions.len() {
            // decompose single index into multi-index, same convention as
            // `multi_index_of`, inlined to avoid borrowing `self`.
            let mut rem = single;
            let mut multi = vec![0usize; dims];
            for axis in (0..dims).rev() {
                let size = sizes[axis];
                multi[axis] = rem % size;
                rem /= size;
            }
            let mut region = 0usize;
            for axis in (0..dims).rev() {
                if axes[axis].is_periodic() {
                    continue;
                }
                if multi[axis] == 0 {
                    region = 2 * axis + 1;
                    break;
                } else if multi[axis] == sizes[axis] - 1 {
                    region = 2 * axis + 2;
                    break;
                }
            }
            regions[single] = region;
        }
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(points: Vec<f64>) -> Axis {
        Axis::new(points, None, 0).unwrap()
    }

    #[test]
    fn empty_axis_is_rejected() {
        assert!(Axis::new(vec![], None, 0).is_err());
    }

    #[test]
    fn non_monotonic_axis_is_rejected() {
        assert!(Axis::new(vec![0.0, 1.0, 0.5], None, 0).is_err());
    }

    #[test]
    fn single_and_multi_index_round_trip_3d() {
        let grid = Grid::new(vec![axis(vec![0.0, 1.0]), axis(vec![0.0, 1.0, 2.0]), axis(vec![0.0, 1.0, 2.0, 3.0])]);
        for single in 0..grid.size() {
            let multi = grid.multi_index_of(single);
            assert_eq!(grid.single_index_of(&multi), single);
        }
    }

    #[test]
    fn region_count_counts_non_periodic_axes() {
        let grid = Grid::new(vec![axis(vec![0.0, 1.0, 2.0]), axis(vec![0.0, 1.0, 2.0])]);
        assert_eq!(grid.region_count(), 5);
    }

    #[test]
    fn periodic_axis_never_gets_boundary_region() {
        let periodic = Axis::new(vec![0.0, 1.0, 2.0], Some(3.0), 0).unwrap();
        let grid = Grid::new(vec![periodic]);
        assert_eq!(grid.region_count(), 1);
        for single in 0..grid.size() {
            assert_eq!(grid.region_of(single), 0);
        }
    }

    #[test]
    fn corner_region_dominated_by_last_non_periodic_axis() {
        // Both axes non-periodic, 3x3 grid. Corner (0,0) is low-end of both
        // axis 0 and axis 1; last axis (axis 1) dominates -> region 2*1+1=3.
        let grid = Grid::new(vec![axis(vec![0.0, 1.0, 2.0]), axis(vec![0.0, 1.0, 2.0])]);
        let corner = grid.single_index_of(&[0, 0]);
        assert_eq!(grid.region_of(corner), 3);
        let other_corner = grid.single_index_of(&[2, 2]);
        assert_eq!(grid.region_of(other_corner), 4);
    }

    #[test]
    fn interior_point_is_region_zero() {
        let grid = Grid::new(vec![axis(vec![0.0, 1.0, 2.0]), axis(vec![0.0, 1.0, 2.0])]);
        let interior = grid.single_index_of(&[1, 1]);
        assert_eq!(grid.region_of(interior), 0);
    }
}
