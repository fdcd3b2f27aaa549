//! Linear solver trait and a dense LU reference implementation, mirroring
//! `Math/LinearSolver.h` and the teacher's `LU<T>` default solver.

use crate::linalg::{Csr, Vector};

/// Solves `matrix * x = y` for `x`. Implementations report failure
/// (singular matrix, non-convergence) by returning `false` rather than
/// via `Result`, matching the original's `bool`-returning contract.
pub trait LinearSolver {
    fn solve(&mut self, matrix: &Csr, y: &Vector, x: &mut Vector) -> bool;
}

/// Dense LU decomposition via `nalgebra::LU`, converting the CSR system
/// to a dense matrix first. A reference solver for small-to-medium
/// systems; production use would inject a sparse direct or iterative
/// solver through the same trait.
#[derive(Default)]
pub struct DenseLu;

impl DenseLu {
    pub fn new() -> Self {
        Self
    }
}

impl LinearSolver for DenseLu {
    fn solve(&mut self, matrix: &Csr, y: &Vector, x: &mut Vector) -> bool {
        let n = matrix.nrows();
        if matrix.ncols() != n || y.len() != n {
            return false;
        }
        let mut dense = nalgebra::DMatrix::<f64>::zeros(n, n);
        for row in 0..n {
            for (&col, &value) in matrix.row_col_indices(row).iter().zip(matrix.row_values(row)) {
                dense[(row, col)] = value;
            }
        }
        let lu = dense.lu();
        match lu.solve(y) {
            Some(solution) => {
                x.copy_from(&solution);
                true
            }
            None => {
                log::warn!("dense LU solve failed: matrix is singular to working precision");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_diagonal_system() {
        let m = Csr::from_triplets(2, 2, [(0, 0, 2.0), (1, 1, 4.0)]);
        let y = Vector::from_vec(vec![2.0, 8.0]);
        let mut x = Vector::zeros(2);
        let mut solver = DenseLu::new();
        assert!(solver.solve(&m, &y, &mut x));
        assert!((x[0] - 1.0).abs() < 1e-10);
        assert!((x[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn reports_failure_on_singular_matrix() {
        let m = Csr::from_triplets(2, 2, [(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 1.0)]);
        let y = Vector::from_vec(vec![1.0, 1.0]);
        let mut x = Vector::zeros(2);
        let mut solver = DenseLu::new();
        assert!(!solver.solve(&m, &y, &mut x));
    }
}
