//! A framework for constructing and solving discretized stationary and
//! transient field problems: finite-difference discretization over
//! structured grids, a declarative problem descriptor/runtime evaluation
//! engine, sparse Jacobian assembly, a modified Newton nonlinear solver
//! with pluggable line search, an explicit Runge-Kutta time integrator,
//! and parametric sweepers for continuation along a problem parameter.
//!
//! See `Grid`, `problem::Descriptor`/`problem::ProblemRuntime`,
//! `problem::jacobian::JacobianAssembler`, `nonlinear_solver::ModifiedNewton`,
//! `ode::RungeKuttaSolver` and `sweep` for the entry points of each piece.

pub mod discretization;
pub mod error;
pub mod events;
pub mod grid;
pub mod linalg;
pub mod line_search;
pub mod linear_solver;
pub mod nonlinear_solver;
pub mod ode;
pub mod problem;
pub mod sweep;

pub use error::{CesdsolError, Result};
pub use grid::{Axis, Grid};
pub use linalg::{Csr, Vector};
pub use problem::{Descriptor, ProblemRuntime, StationaryProblem, TransientProblemState};
