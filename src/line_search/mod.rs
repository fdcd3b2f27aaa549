//! Line searchers used inside the modified Newton iteration, mirroring
//! `Math/LineSearcher.h` and `Math/GoldenSectionSearch.h`.

use crate::linalg::Vector;

/// A quantity that can report its current merit (sum of squared
/// residuals) and accept a variable update — the subset of the problem
/// runtime's contract a line searcher needs.
pub trait MeritProblem {
    fn variables(&self) -> Vector;
    fn set_variables(&mut self, values: &Vector);
    fn merit(&mut self) -> f64;
}

pub struct OutputInfo {
    pub success: bool,
}

pub trait LineSearcher<P: MeritProblem> {
    fn solve(&self, problem: &mut P, shift: &Vector) -> OutputInfo;
}

/// Applies the full step unconditionally: `x += shift_factor * shift`.
pub struct TrivialLineSearcher {
    pub shift_factor: f64,
}

impl Default for TrivialLineSearcher {
    fn default() -> Self {
        Self { shift_factor: 1.0 }
    }
}

impl<P: MeritProblem> LineSearcher<P> for TrivialLineSearcher {
    fn solve(&self, problem: &mut P, shift: &Vector) -> OutputInfo {
        let mut x = problem.variables();
        x.axpy(self.shift_factor, shift, 1.0);
        problem.set_variables(&x);
        OutputInfo { success: true }
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct GssExitConditions: u32 {
        const MERIT_GOAL_REACHED = 1 << 0;
        const ITERATION_COUNT = 1 << 1;
        const SOLUTION_STAGNATION = 1 << 2;
        const MERIT_STAGNATION = 1 << 3;
    }
}

const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Golden-section search along the Newton step direction, mirroring
/// `GoldenSectionSearch::Solve`: brackets the minimum of the merit
/// function between `left` and `right` multipliers of `shift` and
/// narrows it until one of the configured exit conditions fires.
pub struct GoldenSectionLineSearcher {
    pub exit_conditions: GssExitConditions,
    pub left: f64,
    pub right: f64,
    pub solution_tolerance: f64,
    pub merit_tolerance: f64,
    pub merit_goal: f64,
    pub iteration_limit: usize,
}

impl Default for GoldenSectionLineSearcher {
    fn default() -> Self {
        Self {
            exit_conditions: GssExitConditions::all(),
            left: 0.0,
            right: 1.0,
            solution_tolerance: 1e-8,
            merit_tolerance: 1e-8,
            merit_goal: 1e-8,
            iteration_limit: 100,
        }
    }
}

impl GoldenSectionLineSearcher {
    fn merit_at(&self, problem: &mut impl MeritProblem, previous: &Vector, shift: &Vector, multiplier: f64) -> f64 {
        let mut x = previous.clone();
        x.axpy(multiplier, shift, 1.0);
        problem.set_variables(&x);
        problem.merit()
    }
}

impl<P: MeritProblem> LineSearcher<P> for GoldenSectionLineSearcher {
    fn solve(&self, problem: &mut P, shift: &Vector) -> OutputInfo {
        let previous = problem.variables();
        log::info!("starting line search using golden section method");

        let (mut a, mut b) = (self.left, self.right);
        let mut c = b - (b - a) / GOLDEN_RATIO;
        let mut d = a + (b - a) / GOLDEN_RATIO;
        let mut fc = self.merit_at(problem, &previous, shift, c);
        let mut fd = self.merit_at(problem, &previous, shift, d);

        let mut iteration = 0usize;
        let mut f_current;
        loop {
            if fc < fd {
                b = d;
                d = c;
                fd = fc;
                c = b - (b - a) / GOLDEN_RATIO;
                fc = self.merit_at(problem, &previous, shift, c);
                f_current = fc;
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + (b - a) / GOLDEN_RATIO;
                fd = self.merit_at(problem, &previous, shift, d);
                f_current = fd;
            }

            if self.exit_conditions.contains(GssExitConditions::MERIT_GOAL_REACHED) && f_current < self.merit_goal {
                log::info!("golden section search converged after {} iterations", iteration + 1);
                return OutputInfo { success: true };
            }
            if self.exit_conditions.contains(GssExitConditions::SOLUTION_STAGNATION) && b - a < self.solution_tolerance {
                log::warn!("stopping golden section search: search range {} below tolerance", b - a);
                return OutputInfo { success: false };
            }
            if self.exit_conditions.contains(GssExitConditions::MERIT_STAGNATION) && (fd - fc).abs() < self.merit_tolerance {
                log::warn!("stopping golden section search: merit change {} below tolerance", (fd - fc).abs());
                return OutputInfo { success: false };
            }

            iteration += 1;
            if self.exit_conditions.contains(GssExitConditions::ITERATION_COUNT) && iteration > self.iteration_limit {
                log::warn!("golden section search failed: iteration limit {} exceeded", self.iteration_limit);
                return OutputInfo { success: false };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quadratic {
        x: Vector,
    }

    impl MeritProblem for Quadratic {
        fn variables(&self) -> Vector {
            self.x.clone()
        }
        fn set_variables(&mut self, values: &Vector) {
            self.x = values.clone();
        }
        fn merit(&mut self) -> f64 {
            self.x.iter().map(|v| (v - 3.0).powi(2)).sum()
        }
    }

    #[test]
    fn trivial_line_searcher_applies_full_step() {
        let mut p = Quadratic { x: Vector::from_vec(vec![0.0]) };
        let shift = Vector::from_vec(vec![1.5]);
        let searcher = TrivialLineSearcher::default();
        let info = searcher.solve(&mut p, &shift);
        assert!(info.success);
        assert_eq!(p.x[0], 1.5);
    }

    #[test]
    fn golden_section_search_approaches_the_minimum() {
        let mut p = Quadratic { x: Vector::from_vec(vec![0.0]) };
        let shift = Vector::from_vec(vec![6.0]);
        let searcher = GoldenSectionLineSearcher {
            right: 1.0,
            iteration_limit: 200,
            ..Default::default()
        };
        searcher.solve(&mut p, &shift);
        assert!((p.x[0] - 3.0).abs() < 1e-3);
    }
}
