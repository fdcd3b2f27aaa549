//! Modified Newton nonlinear solver, mirroring `Math/ModifiedNewton.h`:
//! linear solve for the Newton direction, line search along it, then one
//! of six OR-combined exit conditions decides whether to keep iterating.

use crate::line_search::{LineSearcher, MeritProblem};
use crate::linalg::{Csr, Vector};
use crate::linear_solver::LinearSolver;

bitflags::bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct MnExitConditions: u32 {
        const MERIT_GOAL_REACHED = 1 << 0;
        const ITERATION_COUNT = 1 << 1;
        const MERIT_OVERFLOW = 1 << 2;
        const SOLUTION_STAGNATION = 1 << 3;
        const MERIT_STAGNATION = 1 << 4;
        const MERIT_INCREASE = 1 << 5;
    }
}

/// The subset of the problem runtime a Newton iteration needs, beyond the
/// merit-evaluation contract of [`MeritProblem`]: the residual vector,
/// the Jacobian at the current state, and a solution-norm for stagnation
/// checks.
pub trait NewtonProblem: MeritProblem {
    fn equations(&mut self) -> Vector;
    fn jacobian(&mut self) -> Csr;
    fn solution_norm(&mut self) -> f64;
}

pub struct OutputInfo {
    pub success: bool,
    pub final_merit: f64,
    pub iteration_count: usize,
}

pub struct ModifiedNewton<P: NewtonProblem> {
    pub linear_solver: Box<dyn LinearSolver>,
    pub line_searcher: Box<dyn LineSearcher<P>>,
    pub exit_conditions: MnExitConditions,
    pub merit_goal: f64,
    pub iteration_limit: usize,
    pub max_merit: f64,
    pub solution_tolerance: f64,
    pub merit_tolerance: f64,
    pub merit_increase_factor: f64,
}

impl<P: NewtonProblem> ModifiedNewton<P> {
    pub fn new(linear_solver: Box<dyn LinearSolver>, line_searcher: Box<dyn LineSearcher<P>>) -> Self {
        Self {
            linear_solver,
            line_searcher,
            exit_conditions: MnExitConditions::MERIT_GOAL_REACHED
                | MnExitConditions::SOLUTION_STAGNATION
                | MnExitConditions::MERIT_STAGNATION
                | MnExitConditions::ITERATION_COUNT
                | MnExitConditions::MERIT_INCREASE,
            merit_goal: 1e-8,
            iteration_limit: 100,
            max_merit: 1e10,
            solution_tolerance: 1e-10,
            merit_tolerance: 1e-10,
            merit_increase_factor: 1.0,
        }
    }

    pub fn solve(&mut self, problem: &mut P) -> OutputInfo {
        log::info!("starting solution of nonlinear equation system using modified Newton method");
        let mut old_merit = 0.0_f64;
        let mut old_solution_norm = 0.0_f64;
        let mut iteration_count = 0usize;

        loop {
            let jacobian = problem.jacobian();
            let residual = problem.equations();
            let mut step = Vector::zeros(residual.len());
            if !self.linear_solver.solve(&jacobian, &residual, &mut step) {
                log::warn!(
                    "stopping modified Newton solution due to linear solver failure after {} iterations",
                    iteration_count + 1
                );
                return OutputInfo {
                    success: false,
                    final_merit: old_merit,
                    iteration_count,
                };
            }
            step *= -1.0;

            let search_result = self.line_searcher.solve(problem, &step);
            if !search_result.success {
                log::warn!(
                    "stopping modified Newton solution due to line searcher failure after {} iterations",
                    iteration_count + 1
                );
                return OutputInfo {
                    success: false,
                    final_merit: old_merit,
                    iteration_count,
                };
            }

            let merit = problem.merit();
            let solution_norm = problem.solution_norm();

            if self.exit_conditions.contains(MnExitConditions::MERIT_GOAL_REACHED) && merit < self.merit_goal {
                log::info!("modified Newton solver converged after {} iterations", iteration_count + 1);
                return OutputInfo {
                    success: true,
                    final_merit: merit,
                    iteration_count,
                };
            }
            if self.exit_conditions.contains(MnExitConditions::MERIT_OVERFLOW) && merit > self.max_merit {
                log::warn!("stopping modified Newton solution: merit overflow {}", merit);
                return OutputInfo {
                    success: false,
                    final_merit: merit,
                    iteration_count,
                };
            }
            if iteration_count > 0 {
                if self.exit_conditions.contains(MnExitConditions::MERIT_INCREASE) && merit > self.merit_increase_factor * old_merit {
                    log::warn!("stopping modified Newton solution: merit increased to {} from {}", merit, old_merit);
                    return OutputInfo {
                        success: false,
                        final_merit: merit,
                        iteration_count,
                    };
                }
                if self.exit_conditions.contains(MnExitConditions::MERIT_STAGNATION) && (merit - old_merit).abs() < self.merit_tolerance {
                    log::warn!("stopping modified Newton solution: merit change below tolerance");
                    return OutputInfo {
                        success: false,
                        final_merit: merit,
                        iteration_count,
                    };
                }
                if self.exit_conditions.contains(MnExitConditions::SOLUTION_STAGNATION)
                    && (solution_norm - old_solution_norm).abs() < self.solution_tolerance
                {
                    log::warn!("stopping modified Newton solution: solution norm change below tolerance");
                    return OutputInfo {
                        success: false,
                        final_merit: merit,
                        iteration_count,
                    };
                }
            }
            old_merit = merit;
            old_solution_norm = solution_norm;

            iteration_count += 1;
            if self.exit_conditions.contains(MnExitConditions::ITERATION_COUNT) && iteration_count > self.iteration_limit {
                log::warn!("stopping modified Newton solution: iteration limit {} exceeded", self.iteration_limit);
                return OutputInfo {
                    success: false,
                    final_merit: merit,
                    iteration_count,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_search::TrivialLineSearcher;
    use crate::linear_solver::DenseLu;

    struct ScalarRoot {
        x: Vector,
    }

    impl MeritProblem for ScalarRoot {
        fn variables(&self) -> Vector {
            self.x.clone()
        }
        fn set_variables(&mut self, values: &Vector) {
            self.x = values.clone();
        }
        fn merit(&mut self) -> f64 {
            let r = self.x[0] * self.x[0] - 4.0;
            r * r
        }
    }

    impl NewtonProblem for ScalarRoot {
        fn equations(&mut self) -> Vector {
            Vector::from_vec(vec![self.x[0] * self.x[0] - 4.0])
        }
        fn jacobian(&mut self) -> Csr {
            Csr::from_triplets(1, 1, [(0, 0, 2.0 * self.x[0])])
        }
        fn solution_norm(&mut self) -> f64 {
            self.x[0].abs()
        }
    }

    #[test]
    fn converges_to_a_root_of_a_scalar_equation() {
        let mut problem = ScalarRoot { x: Vector::from_vec(vec![3.0]) };
        let mut solver = ModifiedNewton::new(Box::new(DenseLu::new()), Box::new(TrivialLineSearcher::default()));
        solver.merit_goal = 1e-16;
        solver.iteration_limit = 50;
        let result = solver.solve(&mut problem);
        assert!(result.success);
        assert!((problem.x[0] - 2.0).abs() < 1e-6);
    }
}
