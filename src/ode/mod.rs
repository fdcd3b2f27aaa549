//! Explicit Runge-Kutta time integration, generic over a [`tableau::ButcherTableau`].
//! Grounded on `Math/ODE/RungeKuttaSolver.h`: step computation, embedded-error
//! step control and Horner-style dense output all mirror that file's algorithm.

pub mod tableau;

use crate::linalg::Vector;
use tableau::ButcherTableau;

/// The subset of problem state the integrator drives: time, the flat DOF
/// vector, the RHS `f(t, y)` (after actualization), and a transient cache
/// the problem owns and snapshots into.
pub trait TransientProblem {
    fn dof_count(&self) -> usize;
    fn set_time(&mut self, t: f64);
    fn variables(&self) -> Vector;
    fn set_variables_updated(&mut self, values: &Vector);
    fn equations(&mut self) -> Vector;
    fn cache_current(&mut self);
}

bitflags::bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct RkExitConditions: u32 {
        const STEP_UNDERFLOW = 1 << 0;
        const STEP_COUNT_LIMIT = 1 << 1;
        const SOLUTION_NORM_OVERFLOW = 1 << 2;
    }
}

pub struct OutputInfo {
    pub success: bool,
    pub step_count: usize,
    pub final_time: f64,
}

/// Fixed-tableau explicit RK driver with adaptive step control and, for
/// tableaus that support it, dense output onto a uniform time grid.
pub struct RungeKuttaSolver {
    pub tableau: ButcherTableau,
    pub exit_conditions: RkExitConditions,
    pub initial_step: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_error: f64,
    pub step_scale_factor: f64,
    pub min_step_scale: f64,
    pub max_step_scale: f64,
    pub step_count_limit: usize,
    pub max_solution_norm: f64,
    /// When set on a dense-output-capable tableau, the integrator fills
    /// the problem's transient cache on this uniform grid instead of (in
    /// addition to) the adaptively chosen step points.
    pub dense_output_step: Option<f64>,
}

impl RungeKuttaSolver {
    pub fn new(tableau: ButcherTableau) -> Self {
        Self {
            tableau,
            exit_conditions: RkExitConditions::all(),
            initial_step: 1e-2,
            min_step: 1e-10,
            max_step: f64::INFINITY,
            abs_tol: 1e-6,
            rel_tol: 1e-6,
            max_error: 1.0,
            step_scale_factor: 0.9,
            min_step_scale: 0.2,
            max_step_scale: 5.0,
            step_count_limit: 10_000,
            max_solution_norm: 1e10,
            dense_output_step: None,
        }
    }

    fn evaluate<P: TransientProblem>(&self, problem: &mut P, t: f64, y: &Vector) -> Vector {
        problem.set_time(t);
        problem.set_variables_updated(y);
        problem.equations()
    }

    /// Computes the stage derivatives and the step's provisional solution.
    /// Returns `(y_next, stages)`.
    fn step<P: TransientProblem>(&self, problem: &mut P, t: f64, y: &Vector, h: f64) -> (Vector, Vec<Vector>) {
        let s = self.tableau.stage_count;
        let mut k: Vec<Vector> = Vec::with_capacity(s);
        k.push(self.evaluate(problem, t, y));
        for i in 1..s {
            let mut y_try = y.clone();
            for (j, &aij) in self.tableau.a[i].iter().enumerate() {
                if aij != 0.0 {
                    y_try.axpy(h * aij, &k[j], 1.0);
                }
            }
            let ti = t + self.tableau.c[i] * h;
            k.push(self.evaluate(problem, ti, &y_try));
        }
        let mut y_next = y.clone();
        for (j, &bj) in self.tableau.b.iter().enumerate() {
            if bj != 0.0 {
                y_next.axpy(h * bj, &k[j], 1.0);
            }
        }
        (y_next, k)
    }

    /// Embedded single-correction error norm. A `stage_count + 1`-long
    /// error row (Dormand-Prince, Tsitouras) denotes one extra derivative
    /// evaluation at the accepted point, folded in with its own
    /// coefficient.
    fn error_norm<P: TransientProblem>(&self, problem: &mut P, t_next: f64, y: &Vector, y_next: &Vector, h: f64, k: &[Vector]) -> f64 {
        let error_row = match &self.tableau.error_row {
            Some(row) => row,
            None => return 0.0,
        };
        let n = y_next.len();
        let mut err = Vector::zeros(n);
        for j in 0..self.tableau.stage_count {
            let coeff = error_row[j];
            if coeff != 0.0 {
                err.axpy(h * coeff, &k[j], 1.0);
            }
        }
        if error_row.len() == self.tableau.stage_count + 1 {
            let k_extra = self.evaluate(problem, t_next, y_next);
            err.axpy(h * error_row[self.tableau.stage_count], &k_extra, 1.0);
        }
        let mut sum_sq = 0.0;
        for i in 0..n {
            let scale = self.abs_tol + self.rel_tol * y_next[i].abs().max(y[i].abs());
            let e = err[i] / scale;
            sum_sq += e * e;
        }
        (sum_sq / n.max(1) as f64).sqrt()
    }

    fn step_scale(&self, err_norm: f64) -> f64 {
        let order = self.tableau.error_accuracy_order.unwrap_or(1) as f64;
        let raw = self.step_scale_factor * err_norm.max(1e-300).powf(-1.0 / (order + 1.0));
        raw.clamp(self.min_step_scale, self.max_step_scale)
    }

    /// Fills the problem's transient cache at every multiple of
    /// `dense_step` between the previously handled grid index and the
    /// grid index reached by `t_next`, via the tableau's Horner-style
    /// dense-output polynomial. Assumes forward integration (`dense_step
    /// > 0`, `t_next > t_prev`), matching how dense output is used in
    /// practice (uniform post-processing grids).
    #[allow(clippy::too_many_arguments)]
    fn emit_dense_output<P: TransientProblem>(
        &self,
        problem: &mut P,
        t_prev: f64,
        y_prev: &Vector,
        t_next: f64,
        h: f64,
        k: &[Vector],
        dense_step: f64,
        x0: f64,
        next_idx: i64,
    ) -> i64 {
        let coeffs = match &self.tableau.dense_output_coefficients {
            Some(c) => c,
            None => return next_idx,
        };
        let target_idx = ((t_next - x0) / dense_step).floor() as i64;
        let mut idx = next_idx;
        while idx <= target_idx {
            let t_grid = x0 + dense_step * idx as f64;
            if t_grid < t_prev || t_grid > t_next {
                idx += 1;
                continue;
            }
            let theta = (t_grid - t_prev) / h;
            let mut y_grid = y_prev.clone();
            for (i, stage_coeffs) in coeffs.iter().enumerate() {
                if stage_coeffs.is_empty() {
                    continue;
                }
                let weight = horner(theta, stage_coeffs);
                if weight != 0.0 {
                    y_grid.axpy(h * weight, &k[i], 1.0);
                }
            }
            problem.set_time(t_grid);
            problem.set_variables_updated(&y_grid);
            problem.cache_current();
            idx += 1;
        }
        idx
    }

    /// Integrates from `(x0, y0)` to `xend`, snapshotting the problem's
    /// transient cache at `x0`, at every accepted step, and (when
    /// `dense_output_step` is set on a capable tableau) at every missed
    /// uniform grid point in between.
    pub fn solve<P: TransientProblem>(&self, problem: &mut P, x0: f64, xend: f64, y0: &Vector) -> OutputInfo {
        log::info!(
            "starting Runge-Kutta integration with {} tableau from t={} to t={}",
            self.tableau.name,
            x0,
            xend
        );
        let direction = (xend - x0).signum();
        let mut t = x0;
        let mut y = y0.clone();
        let mut h = (self.initial_step.abs().min(self.max_step)) * direction;
        let mut step_count = 0usize;
        let mut next_dense_idx: i64 = self
            .dense_output_step
            .filter(|s| *s > 0.0)
            .map(|s| ((t - x0) / s).floor() as i64 + 1)
            .unwrap_or(0);

        problem.set_time(t);
        problem.set_variables_updated(&y);
        problem.cache_current();

        loop {
            if (xend - t) * direction <= 0.0 {
                log::info!("Runge-Kutta integration reached t_end after {} steps", step_count);
                return OutputInfo { success: true, step_count, final_time: t };
            }

            if (t + h - xend) * direction > 0.0 {
                h = xend - t;
            }

            if self.tableau.is_adaptive
                && self.exit_conditions.contains(RkExitConditions::STEP_UNDERFLOW)
                && h.abs() <= self.min_step
            {
                log::warn!("stopping Runge-Kutta integration: step size underflow at t={}", t);
                return OutputInfo { success: false, step_count, final_time: t };
            }

            let (y_next, k) = self.step(problem, t, &y, h);
            let t_next = t + h;

            if self.tableau.is_adaptive {
                let err_norm = self.error_norm(problem, t_next, &y, &y_next, h, &k);
                if err_norm > self.max_error {
                    h *= self.step_scale(err_norm);
                    log::debug!(
                        "rejecting Runge-Kutta step at t={}: error norm {} exceeds tolerance, retrying with h={}",
                        t,
                        err_norm,
                        h
                    );
                    continue;
                }
                let next_h = h * self.step_scale(err_norm);

                if self.tableau.dense_output_supported {
                    if let Some(dense_step) = self.dense_output_step {
                        next_dense_idx = self.emit_dense_output(problem, t, &y, t_next, h, &k, dense_step, x0, next_dense_idx);
                    }
                }

                t = t_next;
                y = y_next;
                h = next_h;
            } else {
                t = t_next;
                y = y_next;
            }
            step_count += 1;

            problem.set_time(t);
            problem.set_variables_updated(&y);
            problem.cache_current();

            let norm = (y.iter().map(|v| v * v).sum::<f64>() / y.len().max(1) as f64).sqrt();
            if self.exit_conditions.contains(RkExitConditions::SOLUTION_NORM_OVERFLOW) && norm >= self.max_solution_norm {
                log::warn!("stopping Runge-Kutta integration: solution norm {} exceeded bound at t={}", norm, t);
                return OutputInfo { success: false, step_count, final_time: t };
            }
            if self.exit_conditions.contains(RkExitConditions::STEP_COUNT_LIMIT) && step_count >= self.step_count_limit {
                log::warn!("stopping Runge-Kutta integration: step count limit {} reached", self.step_count_limit);
                return OutputInfo { success: false, step_count, final_time: t };
            }
        }
    }
}

fn horner(theta: f64, coeffs_ascending: &[f64]) -> f64 {
    coeffs_ascending.iter().rev().fold(0.0, |acc, &c| acc * theta + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `y' = -y`, `y(0) = 1`, exact solution `y(t) = exp(-t)`.
    struct Decay {
        t: f64,
        y: Vector,
        cache: Vec<(f64, Vector)>,
    }

    impl TransientProblem for Decay {
        fn dof_count(&self) -> usize {
            1
        }
        fn set_time(&mut self, t: f64) {
            self.t = t;
        }
        fn variables(&self) -> Vector {
            self.y.clone()
        }
        fn set_variables_updated(&mut self, values: &Vector) {
            self.y = values.clone();
        }
        fn equations(&mut self) -> Vector {
            Vector::from_vec(vec![-self.y[0]])
        }
        fn cache_current(&mut self) {
            self.cache.push((self.t, self.y.clone()));
        }
    }

    #[test]
    fn euler_step_matches_forward_euler_formula() {
        let mut problem = Decay { t: 0.0, y: Vector::from_vec(vec![1.0]), cache: Vec::new() };
        let mut solver = RungeKuttaSolver::new(tableau::euler1());
        solver.initial_step = 0.1;
        solver.exit_conditions = RkExitConditions::STEP_COUNT_LIMIT;
        let result = solver.solve(&mut problem, 0.0, 0.1, &Vector::from_vec(vec![1.0]));
        assert!(result.success);
        assert!((problem.y[0] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn dormand_prince_converges_close_to_exact_decay() {
        let mut problem = Decay { t: 0.0, y: Vector::from_vec(vec![1.0]), cache: Vec::new() };
        let mut solver = RungeKuttaSolver::new(tableau::dormand_prince54());
        solver.initial_step = 0.05;
        solver.abs_tol = 1e-10;
        solver.rel_tol = 1e-10;
        let result = solver.solve(&mut problem, 0.0, 1.0, &Vector::from_vec(vec![1.0]));
        assert!(result.success);
        let exact = (-1.0_f64).exp();
        assert!((problem.y[0] - exact).abs() < 1e-6);
    }

    #[test]
    fn solution_norm_overflow_stops_a_diverging_problem() {
        struct Growth {
            t: f64,
            y: Vector,
        }
        impl TransientProblem for Growth {
            fn dof_count(&self) -> usize {
                1
            }
            fn set_time(&mut self, t: f64) {
                self.t = t;
            }
            fn variables(&self) -> Vector {
                self.y.clone()
            }
            fn set_variables_updated(&mut self, values: &Vector) {
                self.y = values.clone();
            }
            fn equations(&mut self) -> Vector {
                Vector::from_vec(vec![self.y[0] * 10.0])
            }
            fn cache_current(&mut self) {}
        }
        let mut problem = Growth { t: 0.0, y: Vector::from_vec(vec![1.0]) };
        let mut solver = RungeKuttaSolver::new(tableau::euler1());
        solver.initial_step = 1.0;
        solver.max_solution_norm = 100.0;
        let result = solver.solve(&mut problem, 0.0, 100.0, &Vector::from_vec(vec![1.0]));
        assert!(!result.success);
    }
}
