//! Finite-difference discretizer: Fornberg weights, per-axis differentiation
//! matrices, composed multi-dimensional operators, interpolation and
//! integration weights. Mirrors
//! `Discretization/StructuredFiniteDifferenceDiscretization.h`.

use crate::error::{CesdsolError, Result};
use crate::grid::Grid;
use crate::linalg::vector_ops::lower_bound_index;
use crate::linalg::{Csr, SparseVec};

/// Entries smaller than this are dropped during CSR scatter, matching the
/// epsilon-based zero-skipping in the original.
const WEIGHT_EPSILON: f64 = 1e-13;

/// Fornberg's recurrence for finite-difference weights.
///
/// Given a stencil `x[0..s]`, a center `xc` and a derivative order `k`,
/// returns weights `w[0..s]` such that `sum_i w_i f(x_i)` approximates
/// `f^(k)(xc)` exactly for all polynomials of degree `< s`.
pub fn fornberg_weights(stencil: &[f64], xc: f64, order: usize) -> Vec<f64> {
    let s = stencil.len();
    assert!(order < s, "order must be less than stencil size");
    // c[m][j]: weight of order m using the first j+1 stencil points.
    let mut c = vec![vec![0.0; s]; order + 1];
    c[0][0] = 1.0;
    let mut c1 = 1.0;
    for n in 1..s {
        let mut c2 = 1.0;
        let min_m = order.min(n);
        for v in 0..n {
            let c3 = stencil[n] - stencil[v];
            c2 *= c3;
            if v == n - 1 {
                for m in (1..=min_m).rev() {
                    c[m][n] = c1 * (m as f64 * c[m - 1][n - 1] - (stencil[n - 1] - xc) * c[m][n - 1]) / c2;
                }
                c[0][n] = -c1 * (stencil[n - 1] - xc) * c[0][n - 1] / c2;
            }
            for m in (1..=min_m).rev() {
                c[m][v] = ((stencil[n] - xc) * c[m][v] - m as f64 * c[m - 1][v]) / c3;
            }
            c[0][v] = (stencil[n] - xc) * c[0][v] / c3;
        }
        c1 = c2;
    }
    c[order].clone()
}

/// Per-axis differentiation stencil selection, returning the center index
/// of the stencil in `gridData` coordinates (may be outside `[0, Nd)` for
/// periodic wrap, in which case values are shifted by `+/- period`).
fn row_stencil(points: &[f64], period: Option<f64>, row: usize, stencil: usize) -> (Vec<f64>, Vec<isize>) {
    let n = points.len();
    let half = stencil / 2;
    match period {
        None => {
            let start = if row < half {
                0
            } else if row + stencil - half > n {
                n - stencil
            } else {
                row - half
            };
            let xs: Vec<f64> = (start..start + stencil).map(|i| points[i]).collect();
            let idx: Vec<isize> = (start..start + stencil).map(|i| i as isize).collect();
            (xs, idx)
        }
        Some(period) => {
            let mut xs = Vec::with_capacity(stencil);
            let mut idx = Vec::with_capacity(stencil);
            for offset in 0..stencil {
                // Signed local index relative to the row, centered.
                let local = row as isize + offset as isize - half as isize;
                let (wrapped, shift) = if local < 0 {
                    (local + n as isize, -period)
                } else if local >= n as isize {
                    (local - n as isize, period)
                } else {
                    (local, 0.0)
                };
                idx.push(wrapped);
                xs.push(points[wrapped as usize] + shift);
            }
            (xs, idx)
        }
    }
}

/// Builds the `G x G` CSR differentiation matrix for axis `d`, derivative
/// order `order`, using a stencil of size `stencil`.
pub fn differentiation_matrix_1d(grid: &Grid, axis: usize, order: usize, stencil: usize) -> Result<Csr> {
    let n = grid.dimension_size(axis);
    if stencil > n {
        return Err(CesdsolError::StencilTooLarge {
            axis,
            stencil,
            axis_size: n,
        });
    }
    let points = grid.axis_grid(axis);
    let period = grid.period(axis);

    // Precompute per-row weights once per distinct row along this axis.
    let mut row_weights: Vec<Vec<f64>> = Vec::with_capacity(n);
    let mut row_indices: Vec<Vec<isize>> = Vec::with_capacity(n);
    for row in 0..n {
        let (xs, idx) = row_stencil(points, period, row, stencil);
        let weights = fornberg_weights(&xs, points[row], order);
        row_weights.push(weights);
        row_indices.push(idx);
    }

    let g = grid.size();
    let mut triplets = Vec::new();
    for p in 0..g {
        let multi = grid.multi_index_of(p);
        let row_along_axis = multi[axis];
        let weights = &row_weights[row_along_axis];
        let indices = &row_indices[row_along_axis];
        for (&w, &local_idx) in weights.iter().zip(indices) {
            if w.abs() <= WEIGHT_EPSILON {
                continue;
            }
            let mut col_multi = multi.clone();
            col_multi[axis] = local_idx.rem_euclid(n as isize) as usize;
            let col = grid.single_index_of(&col_multi);
            triplets.push((p, col, w));
        }
    }
    Ok(Csr::from_triplets(g, g, triplets))
}

/// Composed multi-dimensional differentiation matrix for operator
/// `orders[0..D]`, i.e. the product (ascending axis order, only over axes
/// with nonzero order) of the per-axis matrices. All-zero returns identity.
pub fn composed_differentiation_matrix(grid: &Grid, orders: &[usize], stencil: usize) -> Result<Csr> {
    if orders.len() != grid.dimension() {
        return Err(CesdsolError::OperatorDimensionMismatch {
            got: orders.len(),
            expected: grid.dimension(),
        });
    }
    let mut composed: Option<Csr> = None;
    for (axis, &order) in orders.iter().enumerate() {
        if order == 0 {
            continue;
        }
        let m = differentiation_matrix_1d(grid, axis, order, stencil)?;
        composed = Some(match composed {
            None => m,
            Some(acc) => acc.matmul(&m),
        });
    }
    Ok(composed.unwrap_or_else(|| Csr::identity(grid.size())))
}

/// Interpolation weights at an arbitrary point `p` (length `D`), via a
/// tensor product of per-axis order-0 Fornberg weights around a clamped
/// stencil located by binary search.
pub fn interpolation_weights(grid: &Grid, point: &[f64], stencil: usize) -> Result<SparseVec> {
    if point.len() != grid.dimension() {
        return Err(CesdsolError::OperatorDimensionMismatch {
            got: point.len(),
            expected: grid.dimension(),
        });
    }
    let mut per_axis_weights = Vec::with_capacity(grid.dimension());
    let mut per_axis_cols: Vec<Vec<usize>> = Vec::with_capacity(grid.dimension());
    for (d, &coord) in point.iter().enumerate() {
        let points = grid.axis_grid(d);
        let n = points.len();
        let s = stencil.min(n);
        let half = s / 2;
        let center = lower_bound_index(points, coord);
        let start = center.saturating_sub(half).min(n - s);
        let xs: Vec<f64> = (start..start + s).map(|i| points[i]).collect();
        let w = fornberg_weights(&xs, coord, 0);
        per_axis_weights.push(w);
        per_axis_cols.push((start..start + s).collect());
    }

    // Tensor product of (weight, column) pairs, last axis fastest-varying.
    let mut combos: Vec<(f64, Vec<usize>)> = vec![(1.0, Vec::new())];
    for (weights, cols) in per_axis_weights.iter().zip(&per_axis_cols) {
        let mut next = Vec::with_capacity(combos.len() * weights.len());
        for (w_acc, idx_acc) in &combos {
            for (&w, &c) in weights.iter().zip(cols) {
                let mut idx = idx_acc.clone();
                idx.push(c);
                next.push((w_acc * w, idx));
            }
        }
        combos = next;
    }

    let mut sv = SparseVec::new(grid.size());
    for (w, multi) in combos {
        if w.abs() <= WEIGHT_EPSILON {
            continue;
        }
        sv.push(grid.single_index_of(&multi), w);
    }
    Ok(sv)
}

/// Per-axis trapezoidal integration weights.
fn integration_weights_1d(points: &[f64], period: Option<f64>) -> Vec<f64> {
    let n = points.len();
    let mut w = vec![0.0; n];
    if n == 1 {
        return w;
    }
    for i in 1..n - 1 {
        w[i] = 0.5 * (points[i + 1] - points[i - 1]);
    }
    match period {
        None => {
            w[0] = 0.5 * (points[1] - points[0]);
            w[n - 1] = 0.5 * (points[n - 1] - points[n - 2]);
        }
        Some(period) => {
            w[0] = 0.5 * (period + points[1] - points[n - 1]);
            w[n - 1] = 0.5 * (points[0] + period - points[n - 2]);
        }
    }
    w
}

/// Flattened `G`-length integration weight vector (tensor product of the
/// per-axis trapezoidal weights).
pub fn integration_weights(grid: &Grid) -> Vec<f64> {
    let factors: Vec<Vec<f64>> = (0..grid.dimension())
        .map(|d| integration_weights_1d(grid.axis_grid(d), grid.period(d)))
        .collect();
    crate::linalg::vector_ops::direct_product_as_vector(&factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Axis;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn uniform_axis(start: f64, end: f64, n: usize, period: Option<f64>) -> Axis {
        Axis::uniform(start, end, n, period, 0).unwrap()
    }

    #[test]
    fn fornberg_weights_reproduce_kronecker_delta_for_order_zero() {
        let stencil = [0.0, 1.0, 2.0, 3.0, 4.0];
        for (j, &xj) in stencil.iter().enumerate() {
            let w = fornberg_weights(&stencil, xj, 0);
            for (i, &wi) in w.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(wi, expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn fornberg_weights_satisfy_moment_conditions() {
        let stencil = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let xc = 0.5;
        let k = 2;
        let w = fornberg_weights(&stencil, xc, k);
        for m in 0..stencil.len() {
            let moment: f64 = w.iter().zip(&stencil).map(|(&wi, &xi)| wi * (xi - xc).powi(m as i32)).sum();
            let expected = if m == k {
                (1..=k).map(|v| v as f64).product::<f64>()
            } else {
                0.0
            };
            assert_abs_diff_eq!(moment, expected, epsilon = 1e-8);
        }
    }

    #[test]
    fn first_derivative_of_sine_on_periodic_grid() {
        let grid = Grid::new(vec![uniform_axis(0.0, 2.0 * PI, 21, Some(2.0 * PI))]);
        let d = differentiation_matrix_1d(&grid, 0, 1, 5).unwrap();
        let y = crate::linalg::Vector::from_iterator(grid.size(), grid.axis_grid(0).iter().map(|&x| x.sin()));
        let dy = d.gemv(&y);
        let mut max_err = 0.0f64;
        for i in 0..grid.size() {
            let x = grid.axis_grid(0)[i];
            max_err = max_err.max((dy[i] - x.cos()).abs());
        }
        assert!(max_err < 1e-4, "max_err = {max_err}");
    }

    #[test]
    fn integration_weights_sum_to_domain_measure_non_periodic() {
        let grid = Grid::new(vec![uniform_axis(0.0, 10.0, 101, None)]);
        let w = integration_weights(&grid);
        assert_abs_diff_eq!(w.iter().sum::<f64>(), 10.0, epsilon = 1e-10);
    }

    #[test]
    fn integration_weights_sum_to_period_periodic() {
        let grid = Grid::new(vec![uniform_axis(0.0, 2.0 * PI, 50, Some(2.0 * PI))]);
        let w = integration_weights(&grid);
        assert_abs_diff_eq!(w.iter().sum::<f64>(), 2.0 * PI, epsilon = 1e-8);
    }

    #[test]
    fn interpolation_at_grid_node_is_kronecker_delta() {
        let grid = Grid::new(vec![uniform_axis(0.0, 10.0, 11, None)]);
        let node = grid.axis_grid(0)[4];
        let sv = interpolation_weights(&grid, &[node], 5).unwrap();
        assert_eq!(sv.nnz(), 1);
        let (idx, val) = sv.iter().next().unwrap();
        assert_eq!(idx, 4);
        assert_abs_diff_eq!(val, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn trapezoidal_integration_matches_known_integral() {
        // 50 points on [0, pi/2]; weights dotted with cos(x) ~ sin(pi/2)-sin(0) = 1.
        let xs: Vec<f64> = (0..50).map(|i| (i as f64) * (PI / 2.0) / 49.0).collect();
        let axis = Axis::new(xs.clone(), None, 0).unwrap();
        let grid = Grid::new(vec![axis]);
        let w = integration_weights(&grid);
        let integral: f64 = w.iter().zip(xs.iter()).map(|(&wi, &x)| wi * x.cos()).sum();
        assert_abs_diff_eq!(integral, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn stencil_larger_than_axis_is_a_construction_error() {
        let grid = Grid::new(vec![uniform_axis(0.0, 1.0, 3, None)]);
        assert!(differentiation_matrix_1d(&grid, 0, 1, 5).is_err());
    }
}
