//! Free-function vector operations, mirroring `Math/VectorOperations.h`.
//!
//! These are thin wrappers over `nalgebra::DVector` rather than a
//! reimplementation: the teacher crate builds directly on `nalgebra`'s
//! dense vector type instead of a bespoke one, and there is no reason to
//! diverge from that here.

use super::Vector;

/// `y <- a*x + y`
pub fn axpy(a: f64, x: &Vector, y: &mut Vector) {
    debug_assert_eq!(x.len(), y.len());
    y.axpy(a, x, 1.0);
}

/// `y <- a*x + b*y`
pub fn axpby(a: f64, x: &Vector, b: f64, y: &mut Vector) {
    debug_assert_eq!(x.len(), y.len());
    y.axpy(a, x, b);
}

/// `x <- a*x`
pub fn scale(a: f64, x: &mut Vector) {
    *x *= a;
}

/// `sqrt(sum(x_i^2))`
pub fn norm2(x: &Vector) -> f64 {
    x.norm()
}

/// Copies `src` into `dst` in place, resizing is not performed: lengths must match.
pub fn copy(src: &Vector, dst: &mut Vector) {
    debug_assert_eq!(src.len(), dst.len());
    dst.copy_from(src);
}

/// A uniform range of `count` points from `start` to `end`, inclusive.
pub fn uniform_range(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    let step = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Index of the last element `<= value` in a sorted slice (lower-bound binary search).
pub fn lower_bound_index(data: &[f64], value: f64) -> usize {
    match data.binary_search_by(|probe| probe.partial_cmp(&value).unwrap()) {
        Ok(i) => i,
        Err(0) => 0,
        Err(i) => i - 1,
    }
}

/// Flattened tensor (outer) product of a list of per-axis weight vectors.
///
/// `factors[0] (x) factors[1] (x) ... (x) factors[D-1]`, flattened with the
/// last axis fastest-varying, matching the grid's own index convention.
pub fn direct_product_as_vector(factors: &[Vec<f64>]) -> Vec<f64> {
    if factors.is_empty() {
        return Vec::new();
    }
    let mut result = vec![1.0];
    for factor in factors {
        let mut next = Vec::with_capacity(result.len() * factor.len());
        for &r in &result {
            for &f in factor {
                next.push(r * f);
            }
        }
        result = next;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axpy_matches_manual_computation() {
        let x = Vector::from_vec(vec![1.0, 2.0, 3.0]);
        let mut y = Vector::from_vec(vec![10.0, 10.0, 10.0]);
        axpy(2.0, &x, &mut y);
        assert_eq!(y, Vector::from_vec(vec![12.0, 14.0, 16.0]));
    }

    #[test]
    fn direct_product_of_two_axes() {
        let a = vec![1.0, 2.0];
        let b = vec![10.0, 20.0, 30.0];
        let prod = direct_product_as_vector(&[a, b]);
        assert_eq!(prod, vec![10.0, 20.0, 30.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn lower_bound_finds_exact_and_nearby() {
        let data = vec![0.0, 1.0, 2.0, 3.0];
        assert_eq!(lower_bound_index(&data, 1.0), 1);
        assert_eq!(lower_bound_index(&data, 1.5), 1);
        assert_eq!(lower_bound_index(&data, -1.0), 0);
    }
}
