//! Parametric sweepers, mirroring `ParametricSweep/FixedStepSweeper.h` and
//! `ParametricSweep/AdaptiveSweeper.h`: drive a stationary solver while
//! walking one problem parameter from `p0` to `p_end`.

use crate::events::{EventExecutor, EventKind};
use crate::linalg::Vector;

/// The subset of problem state a sweeper needs: the swept parameter and
/// the solution vector used for arc-length extrapolation.
pub trait SweepProblem {
    fn variables(&self) -> Vector;
    fn set_variables_updated(&mut self, values: &Vector);
    fn set_parameter(&mut self, value: f64);
}

#[derive(Clone, Copy, Debug)]
pub enum SweepEvent {
    StartSweep,
    StartSolution,
    SuccessfulSolution,
    FailedSolution,
    FinishSweep,
}

impl EventKind for SweepEvent {
    const COUNT: usize = 5;
    fn index(&self) -> usize {
        match self {
            SweepEvent::StartSweep => 0,
            SweepEvent::StartSolution => 1,
            SweepEvent::SuccessfulSolution => 2,
            SweepEvent::FailedSolution => 3,
            SweepEvent::FinishSweep => 4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum AdaptiveSweepEvent {
    StartSweep,
    StartSolution,
    SuccessfulSolution,
    FailedSolution,
    FinishSweep,
    StartBranchChange,
    FailedBranchChangeAttempt,
}

impl EventKind for AdaptiveSweepEvent {
    const COUNT: usize = 7;
    fn index(&self) -> usize {
        match self {
            AdaptiveSweepEvent::StartSweep => 0,
            AdaptiveSweepEvent::StartSolution => 1,
            AdaptiveSweepEvent::SuccessfulSolution => 2,
            AdaptiveSweepEvent::FailedSolution => 3,
            AdaptiveSweepEvent::FinishSweep => 4,
            AdaptiveSweepEvent::StartBranchChange => 5,
            AdaptiveSweepEvent::FailedBranchChangeAttempt => 6,
        }
    }
}

fn extrapolate(y_curr: &Vector, y_prev: &Vector, alpha: f64) -> Vector {
    let mut guess = y_curr.clone();
    guess.axpy(alpha, y_curr, 1.0);
    guess.axpy(-alpha, y_prev, 1.0);
    guess
}

/// Walks the parameter in fixed-size ticks, snapping the final tick to
/// land exactly on `p_end`. Stops at the first solver failure.
pub struct FixedStepSweeper<P> {
    pub step: f64,
    pub extrapolate_initial_guess: bool,
    pub events: EventExecutor<SweepEvent, P>,
}

impl<P: SweepProblem> FixedStepSweeper<P> {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            extrapolate_initial_guess: true,
            events: EventExecutor::new(),
        }
    }

    pub fn run<F: FnMut(&mut P) -> bool>(&mut self, problem: &mut P, p0: f64, p_end: f64, mut solve: F) -> bool {
        log::info!("starting fixed-step parametric sweep from p={} to p={}", p0, p_end);
        let sign = (p_end - p0).signum();
        let step = sign * self.step.abs();
        let mut p = p0;
        let mut y_curr = problem.variables();
        let mut y_prev = y_curr.clone();
        let mut old_step = step;

        self.events.apply_actions(SweepEvent::StartSweep, problem);
        loop {
            if (p_end - p) * sign <= 0.0 {
                log::info!("fixed-step sweep reached p_end");
                self.events.apply_actions(SweepEvent::FinishSweep, problem);
                return true;
            }

            let mut this_step = step;
            if (p + this_step - p_end) * sign > 0.0 {
                this_step = p_end - p;
            }
            p += this_step;
            problem.set_parameter(p);
            if self.extrapolate_initial_guess && old_step != 0.0 {
                let guess = extrapolate(&y_curr, &y_prev, this_step / old_step);
                problem.set_variables_updated(&guess);
            }

            self.events.apply_actions(SweepEvent::StartSolution, problem);
            if !solve(problem) {
                log::warn!("fixed-step sweep stopping: solution failed at p={}", p);
                self.events.apply_actions(SweepEvent::FailedSolution, problem);
                return false;
            }
            self.events.apply_actions(SweepEvent::SuccessfulSolution, problem);
            y_prev = y_curr;
            y_curr = problem.variables();
            old_step = this_step;
        }
    }
}

/// Walks the parameter with an adaptively grown/shrunk step, attempting a
/// branch change (reversing sweep direction from the last good solution)
/// when the step shrinks below `min_step`.
pub struct AdaptiveSweeper<P> {
    pub step: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub shrink_factor: f64,
    pub growth_factor: f64,
    pub extrapolate_initial_guess: bool,
    pub allow_branch_change: bool,
    pub max_branch_count: usize,
    pub max_solution_count: usize,
    pub max_change_branch_trials: usize,
    pub events: EventExecutor<AdaptiveSweepEvent, P>,
}

impl<P: SweepProblem> AdaptiveSweeper<P> {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            min_step: step * 1e-6,
            max_step: step * 100.0,
            shrink_factor: 0.5,
            growth_factor: 1.5,
            extrapolate_initial_guess: true,
            allow_branch_change: true,
            max_branch_count: 10,
            max_solution_count: 100_000,
            max_change_branch_trials: 5,
            events: EventExecutor::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt_branch_change<F: FnMut(&mut P) -> bool>(
        &mut self,
        problem: &mut P,
        p: f64,
        reversed_sign: f64,
        y_curr: &Vector,
        y_prev: &Vector,
        solve: &mut F,
    ) -> Option<(f64, Vector, f64)> {
        if !self.allow_branch_change {
            return None;
        }
        log::info!("attempting branch change at p={}", p);
        self.events.apply_actions(AdaptiveSweepEvent::StartBranchChange, problem);
        let mut change_branch_step = 1.0_f64;
        let mut trial = 0usize;
        loop {
            let this_step = reversed_sign * self.step.abs();
            let p_try = p + this_step;
            problem.set_parameter(p_try);
            if self.extrapolate_initial_guess {
                let guess = extrapolate(y_curr, y_prev, -change_branch_step);
                problem.set_variables_updated(&guess);
            } else {
                problem.set_variables_updated(y_curr);
            }

            self.events.apply_actions(AdaptiveSweepEvent::StartSolution, problem);
            if solve(problem) {
                log::info!("branch change succeeded after {} extra trials", trial);
                self.events.apply_actions(AdaptiveSweepEvent::SuccessfulSolution, problem);
                return Some((p_try, problem.variables(), this_step));
            }
            self.events.apply_actions(AdaptiveSweepEvent::FailedSolution, problem);
            trial += 1;
            if trial > self.max_change_branch_trials {
                log::warn!("branch change failed after {} trials", trial);
                self.events.apply_actions(AdaptiveSweepEvent::FailedBranchChangeAttempt, problem);
                return None;
            }
            change_branch_step *= self.growth_factor;
        }
    }

    pub fn run<F: FnMut(&mut P) -> bool>(&mut self, problem: &mut P, p0: f64, p_end: f64, mut solve: F) -> bool {
        log::info!("starting adaptive parametric sweep from p={} to p={}", p0, p_end);
        let mut sign = (p_end - p0).signum();
        let mut step = sign * self.step.abs();
        let mut p = p0;
        let mut y_curr = problem.variables();
        let mut y_prev = y_curr.clone();
        let mut old_step = step;
        let mut branch_count = 0usize;
        let mut solution_count = 0usize;

        self.events.apply_actions(AdaptiveSweepEvent::StartSweep, problem);
        loop {
            if solution_count >= self.max_solution_count || branch_count > self.max_branch_count {
                log::info!("adaptive sweep stopping: solution or branch count limit reached");
                self.events.apply_actions(AdaptiveSweepEvent::FinishSweep, problem);
                return true;
            }
            if (p_end - p) * sign <= 0.0 {
                log::info!("adaptive sweep reached p_end");
                self.events.apply_actions(AdaptiveSweepEvent::FinishSweep, problem);
                return true;
            }

            let mut this_step = step;
            if (p + this_step - p_end) * sign > 0.0 {
                this_step = p_end - p;
            }
            let p_try = p + this_step;
            problem.set_parameter(p_try);
            if self.extrapolate_initial_guess && old_step != 0.0 {
                let guess = extrapolate(&y_curr, &y_prev, this_step / old_step);
                problem.set_variables_updated(&guess);
            }

            self.events.apply_actions(AdaptiveSweepEvent::StartSolution, problem);
            if solve(problem) {
                self.events.apply_actions(AdaptiveSweepEvent::SuccessfulSolution, problem);
                p = p_try;
                y_prev = y_curr;
                y_curr = problem.variables();
                old_step = this_step;
                solution_count += 1;
                step = sign * (step.abs() * self.growth_factor).min(self.max_step);
                continue;
            }

            log::debug!("adaptive sweep: solution failed at p={}, shrinking step", p_try);
            self.events.apply_actions(AdaptiveSweepEvent::FailedSolution, problem);
            problem.set_variables_updated(&y_curr);
            step *= self.shrink_factor;
            if step.abs() >= self.min_step {
                continue;
            }

            match self.attempt_branch_change(problem, p, -sign, &y_curr, &y_prev, &mut solve) {
                Some((new_p, new_y, committed_step)) => {
                    branch_count += 1;
                    sign = -sign;
                    p = new_p;
                    y_prev = y_curr;
                    y_curr = new_y;
                    old_step = committed_step;
                    step = sign * self.step.abs();
                    solution_count += 1;
                }
                None => {
                    log::warn!("adaptive sweep stopping: step underflow with no branch change available");
                    self.events.apply_actions(AdaptiveSweepEvent::FinishSweep, problem);
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Linear {
        p: f64,
        y: Vector,
    }

    impl SweepProblem for Linear {
        fn variables(&self) -> Vector {
            self.y.clone()
        }
        fn set_variables_updated(&mut self, values: &Vector) {
            self.y = values.clone();
        }
        fn set_parameter(&mut self, value: f64) {
            self.p = value;
        }
    }

    #[test]
    fn fixed_step_sweeper_walks_to_the_end() {
        let mut problem = Linear { p: 0.0, y: Vector::from_vec(vec![0.0]) };
        let mut sweeper = FixedStepSweeper::new(0.3);
        let visited = std::cell::RefCell::new(Vec::new());
        let ok = sweeper.run(&mut problem, 0.0, 1.0, |p: &mut Linear| {
            p.y = Vector::from_vec(vec![p.p * 2.0]);
            visited.borrow_mut().push(p.p);
            true
        });
        assert!(ok);
        assert!((problem.p - 1.0).abs() < 1e-12);
        assert!((problem.y[0] - 2.0).abs() < 1e-12);
        assert!(visited.borrow().last().copied().unwrap() <= 1.0 + 1e-12);
    }

    #[test]
    fn fixed_step_sweeper_stops_on_failure() {
        let mut problem = Linear { p: 0.0, y: Vector::from_vec(vec![0.0]) };
        let mut sweeper = FixedStepSweeper::new(0.25);
        let ok = sweeper.run(&mut problem, 0.0, 1.0, |p: &mut Linear| p.p < 0.4);
        assert!(!ok);
    }

    #[test]
    fn adaptive_sweeper_reaches_the_end_when_solves_always_succeed() {
        let mut problem = Linear { p: 0.0, y: Vector::from_vec(vec![0.0]) };
        let mut sweeper = AdaptiveSweeper::new(0.1);
        let ok = sweeper.run(&mut problem, 0.0, 1.0, |p: &mut Linear| {
            p.y = Vector::from_vec(vec![p.p]);
            true
        });
        assert!(ok);
        assert!((problem.p - 1.0).abs() < 1e-9);
    }
}
