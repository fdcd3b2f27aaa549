//! The evaluation engine: owns the variable/parameter state, derivative
//! caches and expression caches, and drives the dirty-flag actualization
//! pipeline described in SPEC_FULL.md §4.4. Grounded on the `Actualize`
//! method family of `Problem/BaseProblem.h`.

use std::rc::Rc;

use crate::discretization;
use crate::error::{CesdsolError, Result};
use crate::grid::Grid;
use crate::linalg::Csr;
use crate::problem::descriptor::Descriptor;
use crate::problem::views::{Globals, GlobalsForPie, GlobalsForVie, Locals, LocalsForPie, LocalsForVie};

/// A continuous field's declared operator, resolved against the grid's
/// shared differentiation-weight cache. `global_op_id` deduplicates
/// identical `(axis-order-tuple, stencil)` operators across fields.
struct FieldOperator {
    global_op_id: usize,
}

/// The live evaluation engine for one problem instance: grid, descriptor
/// and the full state + cache arrays the dirty-flag pipeline reads and
/// writes.
pub struct Runtime {
    grid: Rc<Grid>,
    descriptor: Descriptor,
    stencil: usize,

    parameters: Vec<f64>,
    /// `variables[field][point]`, one entry per continuous field.
    variables: Vec<Vec<f64>>,
    discrete_variables: Vec<f64>,
    time: Option<f64>,

    /// `field_operators[field]` lists the declared non-identity operators
    /// for that field, each resolved to a shared global operator id.
    field_operators: Vec<Vec<FieldOperator>>,
    /// Differentiation matrices shared across fields with the same
    /// operator, indexed by `global_op_id`.
    differentiation_weights: Vec<Csr>,
    integration_weights: Vec<f64>,

    /// `derivatives[field][local_op_idx][point]`, `local_op_idx` 0-based
    /// among declared (non-identity) operators.
    derivatives: Vec<Vec<Vec<f64>>>,

    /// `local_pies[idx][point]`.
    local_pies: Vec<Vec<f64>>,
    global_pies: Vec<f64>,
    local_vies: Vec<Vec<f64>>,
    global_vies: Vec<f64>,
    local_vdes: Vec<Vec<f64>>,
    global_vdes: Vec<f64>,
    reductions: Vec<f64>,
    /// Pre-external-function raw integral for each reduction, kept
    /// alongside `reductions` so Jacobian assembly can evaluate the
    /// external function's derivative at the same point value evaluation
    /// applied it.
    reductions_raw: Vec<f64>,

    variables_dirty: bool,
    parameters_dirty: bool,
}

impl Runtime {
    pub fn new(grid: Rc<Grid>, descriptor: Descriptor, stencil: usize) -> Result<Self> {
        descriptor.validate()?;
        if descriptor.region_count != grid.region_count() {
            return Err(CesdsolError::RegionCountMismatch {
                descriptor_regions: descriptor.region_count,
                grid_regions: grid.region_count(),
            });
        }
        let g = grid.size();
        let nc = descriptor.continuous_eq_count;

        let mut op_catalogue: Vec<Vec<usize>> = Vec::new();
        let mut field_operators = Vec::with_capacity(nc);
        for ops in &descriptor.field_operators {
            let mut resolved = Vec::with_capacity(ops.len());
            for order in ops {
                let global_op_id = match op_catalogue.iter().position(|o| o == order) {
                    Some(id) => id,
                    None => {
                        op_catalogue.push(order.clone());
                        op_catalogue.len() - 1
                    }
                };
                resolved.push(FieldOperator { global_op_id });
            }
            field_operators.push(resolved);
        }
        let differentiation_weights = op_catalogue
            .iter()
            .map(|order| discretization::composed_differentiation_matrix(&grid, order, stencil.max(2)))
            .collect::<Result<Vec<_>>>()?;
        let integration_weights = discretization::integration_weights(&grid);

        let derivatives = field_operators
            .iter()
            .map(|ops| ops.iter().map(|_| vec![0.0; g]).collect())
            .collect();

        Ok(Self {
            grid,
            stencil: stencil.max(2),
            parameters: vec![0.0; descriptor.parameter_count],
            variables: vec![vec![0.0; g]; nc],
            discrete_variables: vec![0.0; descriptor.discrete_eq_count],
            time: None,
            field_operators,
            differentiation_weights,
            integration_weights,
            derivatives,
            local_pies: vec![vec![0.0; g]; descriptor.local_pie_count],
            global_pies: vec![0.0; descriptor.global_pie_count],
            local_vies: vec![vec![0.0; g]; descriptor.local_vie_count],
            global_vies: vec![0.0; descriptor.global_vie_count],
            local_vdes: vec![vec![0.0; g]; descriptor.local_vde_count],
            global_vdes: vec![0.0; descriptor.global_vde_count],
            reductions: vec![0.0; descriptor.reduction_count],
            reductions_raw: vec![0.0; descriptor.reduction_count],
            variables_dirty: true,
            parameters_dirty: true,
            descriptor,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn stencil(&self) -> usize {
        self.stencil
    }

    pub fn differentiation_weights(&self, global_op_id: usize) -> &Csr {
        &self.differentiation_weights[global_op_id]
    }

    pub fn field_global_op_id(&self, field: usize, local_op_idx: usize) -> usize {
        self.field_operators[field][local_op_idx - 1].global_op_id
    }

    pub fn integration_weights(&self) -> &[f64] {
        &self.integration_weights
    }

    pub fn set_parameter(&mut self, index: usize, value: f64) -> Result<()> {
        if index >= self.parameters.len() {
            return Err(CesdsolError::ParameterIndexOutOfRange {
                index,
                count: self.parameters.len(),
            });
        }
        self.parameters[index] = value;
        self.parameters_dirty = true;
        Ok(())
    }

    pub fn set_parameters(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.parameters.len() {
            return Err(CesdsolError::LengthMismatch {
                expected: self.parameters.len(),
                got: values.len(),
            });
        }
        self.parameters.copy_from_slice(values);
        self.parameters_dirty = true;
        Ok(())
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn set_variable(&mut self, field: usize, point: usize, value: f64) -> Result<()> {
        if field >= self.variables.len() {
            return Err(CesdsolError::FieldIndexOutOfRange {
                index: field,
                count: self.variables.len(),
            });
        }
        self.variables[field][point] = value;
        self.variables_dirty = true;
        Ok(())
    }

    pub fn set_variables(&mut self, field: usize, values: &[f64]) -> Result<()> {
        if field >= self.variables.len() {
            return Err(CesdsolError::FieldIndexOutOfRange {
                index: field,
                count: self.variables.len(),
            });
        }
        if values.len() != self.variables[field].len() {
            return Err(CesdsolError::LengthMismatch {
                expected: self.variables[field].len(),
                got: values.len(),
            });
        }
        self.variables[field].copy_from_slice(values);
        self.variables_dirty = true;
        Ok(())
    }

    pub fn variable(&self, field: usize, point: usize) -> f64 {
        self.variables[field][point]
    }

    pub fn variables_field(&self, field: usize) -> &[f64] {
        &self.variables[field]
    }

    pub fn set_discrete_variable(&mut self, var: usize, value: f64) {
        self.discrete_variables[var] = value;
        self.variables_dirty = true;
    }

    pub fn discrete_variables(&self) -> &[f64] {
        &self.discrete_variables
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = Some(time);
        self.variables_dirty = true;
    }

    pub fn time(&self) -> Option<f64> {
        self.time
    }

    pub fn mark_variables_updated(&mut self) {
        self.variables_dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.variables_dirty || self.parameters_dirty
    }

    /// Runs the full re-actualization pipeline if anything is dirty:
    /// derivatives -> PIE -> VIE -> VDE -> reductions. Idempotent when
    /// nothing has changed since the last call.
    pub fn actualize(&mut self) {
        if !self.is_dirty() {
            return;
        }
        self.compute_derivatives();
        self.compute_pies();
        self.compute_vies();
        self.compute_vdes();
        self.compute_reductions();
        self.variables_dirty = false;
        self.parameters_dirty = false;
    }

    fn compute_derivatives(&mut self) {
        for field in 0..self.variables.len() {
            let ops = &self.field_operators[field];
            for (local_idx, op) in ops.iter().enumerate() {
                let w = &self.differentiation_weights[op.global_op_id];
                let out = w.gemv(&nalgebra::DVector::from_column_slice(&self.variables[field]));
                self.derivatives[field][local_idx].copy_from_slice(out.as_slice());
            }
        }
    }

    fn compute_pies(&mut self) {
        let g = self.grid.size();
        for idx in 0..self.local_pies.len() {
            let f = match self.descriptor.local_pie(idx) {
                Some(f) => f,
                None => continue,
            };
            for point in 0..g {
                let coords = self.grid.coords_of(point);
                let pies: Vec<f64> = (0..idx).map(|j| self.local_pies[j][point]).collect();
                let view = LocalsForPie { point, coords, pies };
                self.local_pies[idx][point] = f(&view);
            }
        }
        for idx in 0..self.global_pies.len() {
            let f = match self.descriptor.global_pie(idx) {
                Some(f) => f,
                None => continue,
            };
            let view = GlobalsForPie {
                global_pies: self.global_pies[..idx].to_vec(),
            };
            self.global_pies[idx] = f(&view);
        }
    }

    fn compute_vies(&mut self) {
        let g = self.grid.size();
        for idx in 0..self.local_vies.len() {
            let f = match self.descriptor.local_vie(idx) {
                Some(f) => f,
                None => continue,
            };
            for point in 0..g {
                let coords = self.grid.coords_of(point);
                let pies = self.local_pie_values_at(point);
                let vies: Vec<f64> = (0..idx).map(|j| self.local_vies[j][point]).collect();
                let view = LocalsForVie { point, coords, pies, vies };
                self.local_vies[idx][point] = f(&view);
            }
        }
        for idx in 0..self.global_vies.len() {
            let f = match self.descriptor.global_vie(idx) {
                Some(f) => f,
                None => continue,
            };
            let view = GlobalsForVie {
                pies: self.global_pies.clone(),
                parameters: self.parameters.clone(),
                global_vies: self.global_vies[..idx].to_vec(),
                time: self.time,
            };
            self.global_vies[idx] = f(&view);
        }
    }

    fn compute_vdes(&mut self) {
        let g = self.grid.size();
        for idx in 0..self.local_vdes.len() {
            let f = match self.descriptor.local_vde(idx) {
                Some(f) => f,
                None => continue,
            };
            for point in 0..g {
                let locals = self.locals_at(point, self.grid.region_of(point), idx);
                self.local_vdes[idx][point] = f(&locals);
            }
        }
        for idx in 0..self.global_vdes.len() {
            let f = match self.descriptor.global_vde(idx) {
                Some(f) => f,
                None => continue,
            };
            let globals = self.globals(idx);
            self.global_vdes[idx] = f(&globals);
        }
    }

    fn compute_reductions(&mut self) {
        let g = self.grid.size();
        for idx in 0..self.reductions.len() {
            let internal = match self.descriptor.reduction_internal(idx) {
                Some(f) => f,
                None => continue,
            };
            let mut acc = 0.0;
            let globals = self.globals(self.global_vdes.len());
            for point in 0..g {
                let locals = self.locals_at(point, self.grid.region_of(point), self.local_vdes.len());
                acc += internal(&locals, &globals) * self.integration_weights[point];
            }
            let external = self.descriptor.reduction_external(idx);
            self.reductions_raw[idx] = acc;
            self.reductions[idx] = external(acc);
        }
    }

    fn local_pie_values_at(&self, point: usize) -> Vec<f64> {
        self.local_pies.iter().map(|v| v[point]).collect()
    }

    fn local_vie_values_at(&self, point: usize) -> Vec<f64> {
        self.local_vies.iter().map(|v| v[point]).collect()
    }

    fn local_vde_values_at(&self, point: usize, upto: usize) -> Vec<f64> {
        self.local_vdes[..upto].iter().map(|v| v[point]).collect()
    }

    fn field_derivatives_at(&self, point: usize) -> Vec<Vec<f64>> {
        self.derivatives
            .iter()
            .map(|field| field.iter().map(|op| op[point]).collect())
            .collect()
    }

    /// Full local view at `point`, with `vdes` populated up to (but not
    /// including) index `vde_upto` — pass `self.local_vdes.len()` for
    /// equation/reduction evaluation and the VDE's own index during VDE
    /// evaluation itself.
    pub fn locals_at(&self, point: usize, region: usize, vde_upto: usize) -> Locals {
        Locals {
            point,
            region,
            coords: self.grid.coords_of(point),
            pies: self.local_pie_values_at(point),
            vies: self.local_vie_values_at(point),
            vdes: self.local_vde_values_at(point, vde_upto),
            field_values: self.variables.iter().map(|f| f[point]).collect(),
            field_derivatives: self.field_derivatives_at(point),
            integration_weight: self.integration_weights[point],
        }
    }

    /// Full global view, with `global_vdes` populated up to (but not
    /// including) index `vde_upto`.
    pub fn globals(&self, vde_upto: usize) -> Globals {
        Globals {
            pies: self.global_pies.clone(),
            parameters: self.parameters.clone(),
            vies: self.global_vies.clone(),
            discrete_variables: self.discrete_variables.clone(),
            global_vdes: self.global_vdes[..vde_upto].to_vec(),
            reductions: self.reductions.clone(),
        }
    }

    pub fn reductions(&self) -> &[f64] {
        &self.reductions
    }

    /// Pre-external-function raw integrals, one per reduction.
    pub fn reductions_raw(&self) -> &[f64] {
        &self.reductions_raw
    }

    /// Total DOF count: `Nc * |grid| + Nd`, matching `JacobianAssembler`'s
    /// `DofLayout`.
    pub fn dof_count(&self) -> usize {
        self.variables.len() * self.grid.size() + self.discrete_variables.len()
    }

    /// Flattens continuous fields followed by discrete variables into one
    /// vector, in `DofLayout` order.
    pub fn flat_variables(&self) -> crate::linalg::Vector {
        let mut out = Vec::with_capacity(self.dof_count());
        for field in &self.variables {
            out.extend_from_slice(field);
        }
        out.extend_from_slice(&self.discrete_variables);
        crate::linalg::Vector::from_vec(out)
    }

    /// Inverse of [`Runtime::flat_variables`]: scatters a flat DOF vector
    /// back into the per-field and discrete-variable arrays.
    pub fn set_flat_variables(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.dof_count() {
            return Err(CesdsolError::LengthMismatch {
                expected: self.dof_count(),
                got: values.len(),
            });
        }
        let g = self.grid.size();
        for (field, slot) in self.variables.iter_mut().enumerate() {
            slot.copy_from_slice(&values[field * g..(field + 1) * g]);
        }
        let nc = self.variables.len();
        self.discrete_variables.copy_from_slice(&values[nc * g..]);
        self.variables_dirty = true;
        Ok(())
    }

    /// Evaluates every continuous equation (at its point, falling back to
    /// the interior region callback) and every discrete equation at the
    /// runtime's current (already actualized) state, in `DofLayout` row
    /// order. For a stationary problem this is the residual vector
    /// handed to the nonlinear solver; for a transient problem, the same
    /// callbacks are expected to return `dy/dt` instead.
    pub fn equations(&self) -> crate::linalg::Vector {
        let g = self.grid.size();
        let nc = self.descriptor.continuous_eq_count;
        let nd = self.descriptor.discrete_eq_count;
        let mut out = vec![0.0; nc * g + nd];
        let globals = self.globals(self.descriptor.global_vde_count);
        for eq in 0..nc {
            for point in 0..g {
                let region = self.grid.region_of(point);
                if let Some(f) = self.descriptor.continuous_equation(eq, region) {
                    let locals = self.locals_at(point, region, self.descriptor.local_vde_count);
                    out[eq * g + point] = f(&locals, &globals);
                }
            }
        }
        for var in 0..nd {
            if let Some(f) = self.descriptor.discrete_equation(var) {
                out[nc * g + var] = f(&globals);
            }
        }
        crate::linalg::Vector::from_vec(out)
    }
}
