//! Thin adapters wiring the evaluation-engine [`Runtime`] to the generic
//! solver traits (`MeritProblem`/`NewtonProblem`, `TransientProblem`,
//! `SweepProblem`), so a descriptor-built problem can be handed directly
//! to `ModifiedNewton`, `RungeKuttaSolver` or a sweeper without every
//! caller re-deriving the same flattening/actualization glue.

use std::rc::Rc;

use crate::error::Result;
use crate::grid::Grid;
use crate::line_search::MeritProblem;
use crate::linalg::{Csr, Vector};
use crate::nonlinear_solver::NewtonProblem;
use crate::ode::TransientProblem;
use crate::problem::descriptor::Descriptor;
use crate::problem::jacobian::JacobianAssembler;
use crate::problem::runtime::Runtime;
use crate::sweep::SweepProblem;

/// Wraps a [`Runtime`] and its precomputed [`JacobianAssembler`] for use
/// as a stationary (Newton-solved, parameter-swept) problem.
pub struct StationaryProblem {
    runtime: Runtime,
    assembler: JacobianAssembler,
    swept_parameter: usize,
}

impl StationaryProblem {
    pub fn new(grid: Rc<Grid>, descriptor: Descriptor, stencil: usize) -> Result<Self> {
        let runtime = Runtime::new(grid, descriptor, stencil)?;
        let assembler = JacobianAssembler::build(&runtime);
        Ok(Self {
            runtime,
            assembler,
            swept_parameter: 0,
        })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Selects which parameter index `SweepProblem::set_parameter`
    /// drives. Defaults to `0`.
    pub fn set_swept_parameter_index(&mut self, index: usize) {
        self.swept_parameter = index;
    }
}

/// `‖v‖₂ / N`, matching the original `DefaultMeritFunction`
/// (`Norm2(fields) / fields.size()`). Not to be confused with the RK
/// integrator's own RMS error norm, which divides by `sqrt(N)` instead.
fn merit_norm(v: &Vector) -> f64 {
    let norm2 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    norm2 / v.len().max(1) as f64
}

impl MeritProblem for StationaryProblem {
    fn variables(&self) -> Vector {
        self.runtime.flat_variables()
    }

    fn set_variables(&mut self, values: &Vector) {
        self.runtime
            .set_flat_variables(values.as_slice())
            .expect("line searcher handed back a vector of the wrong DOF count");
        self.runtime.actualize();
    }

    fn merit(&mut self) -> f64 {
        self.runtime.actualize();
        merit_norm(&self.runtime.equations())
    }
}

impl NewtonProblem for StationaryProblem {
    fn equations(&mut self) -> Vector {
        self.runtime.actualize();
        self.runtime.equations()
    }

    fn jacobian(&mut self) -> Csr {
        self.runtime.actualize();
        self.assembler.assemble(&self.runtime)
    }

    fn solution_norm(&mut self) -> f64 {
        merit_norm(&self.runtime.flat_variables())
    }
}

impl SweepProblem for StationaryProblem {
    fn variables(&self) -> Vector {
        self.runtime.flat_variables()
    }

    fn set_variables_updated(&mut self, values: &Vector) {
        self.runtime
            .set_flat_variables(values.as_slice())
            .expect("sweeper handed back a vector of the wrong DOF count");
    }

    fn set_parameter(&mut self, value: f64) {
        self.runtime
            .set_parameter(self.swept_parameter, value)
            .expect("swept parameter index out of range");
    }
}

/// Wraps a [`Runtime`] for use as a transient (RK-integrated) problem,
/// owning the time -> variables snapshot cache the original source keeps
/// only on transient problems.
pub struct TransientProblemState {
    runtime: Runtime,
    cache: Vec<(f64, Vector)>,
}

impl TransientProblemState {
    pub fn new(grid: Rc<Grid>, descriptor: Descriptor, stencil: usize) -> Result<Self> {
        Ok(Self {
            runtime: Runtime::new(grid, descriptor, stencil)?,
            cache: Vec::new(),
        })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    pub fn cache(&self) -> &[(f64, Vector)] {
        &self.cache
    }
}

impl TransientProblem for TransientProblemState {
    fn dof_count(&self) -> usize {
        self.runtime.dof_count()
    }

    fn set_time(&mut self, t: f64) {
        self.runtime.set_time(t);
    }

    fn variables(&self) -> Vector {
        self.runtime.flat_variables()
    }

    fn set_variables_updated(&mut self, values: &Vector) {
        self.runtime
            .set_flat_variables(values.as_slice())
            .expect("RK stepper handed back a vector of the wrong DOF count");
    }

    fn equations(&mut self) -> Vector {
        self.runtime.actualize();
        self.runtime.equations()
    }

    fn cache_current(&mut self) {
        let t = self.runtime.time().unwrap_or(0.0);
        self.cache.push((t, self.runtime.flat_variables()));
    }
}
