//! Sparse Jacobian assembly: a structural pass discovers the column set of
//! every row once, then numerical assembly zeroes and accumulates into the
//! resulting CSR pattern. Grounded on the structure/assemble split of
//! `Problem/BaseProblem.h`'s `CalculateJacobian`.
//!
//! Degree-of-freedom layout: continuous fields first, `field * G + point`,
//! followed by discrete variables at `Nc * G + var`.

use crate::linalg::Csr;
use crate::problem::descriptor::Dependency;
use crate::problem::runtime::Runtime;
use crate::problem::views::{GlobalsForJacobian, LocalsForJacobian};

pub struct DofLayout {
    pub continuous_count: usize,
    pub grid_size: usize,
    pub discrete_count: usize,
}

impl DofLayout {
    pub fn new(continuous_count: usize, grid_size: usize, discrete_count: usize) -> Self {
        Self {
            continuous_count,
            grid_size,
            discrete_count,
        }
    }

    pub fn total(&self) -> usize {
        self.continuous_count * self.grid_size + self.discrete_count
    }

    pub fn continuous_row(&self, eq: usize, point: usize) -> usize {
        eq * self.grid_size + point
    }

    pub fn discrete_row(&self, var: usize) -> usize {
        self.continuous_count * self.grid_size + var
    }

    pub fn field_col(&self, field: usize, point: usize) -> usize {
        field * self.grid_size + point
    }

    pub fn discrete_col(&self, var: usize) -> usize {
        self.continuous_count * self.grid_size + var
    }
}

/// Precomputed structural information, reused across every numerical
/// assembly so long as the descriptor's dependency declarations (not its
/// callback values) don't change.
pub struct JacobianAssembler {
    layout: DofLayout,
    eq_field_deps: Vec<Vec<(usize, usize)>>,
    eq_discrete_deps: Vec<Vec<usize>>,
    discrete_field_deps: Vec<Vec<usize>>,
    discrete_discrete_deps: Vec<Vec<usize>>,
}

impl JacobianAssembler {
    pub fn build(runtime: &Runtime) -> Self {
        let d = runtime.descriptor();
        let layout = DofLayout::new(d.continuous_eq_count, runtime.grid().size(), d.discrete_eq_count);
        let mut eq_field_deps = Vec::with_capacity(d.continuous_eq_count);
        let mut eq_discrete_deps = Vec::with_capacity(d.continuous_eq_count);
        for eq in 0..d.continuous_eq_count {
            let deps = d.dependencies_for_equation(eq);
            let mut fields = Vec::new();
            let mut discretes = Vec::new();
            for dep in deps {
                match dep {
                    Dependency::Field { field, local_op_idx } => fields.push((field, local_op_idx)),
                    Dependency::Discrete { var } => discretes.push(var),
                }
            }
            eq_field_deps.push(fields);
            eq_discrete_deps.push(discretes);
        }
        let mut discrete_field_deps = Vec::with_capacity(d.discrete_eq_count);
        let mut discrete_discrete_deps = Vec::with_capacity(d.discrete_eq_count);
        for var in 0..d.discrete_eq_count {
            let (fields, others) = d.dependencies_for_discrete_equation(var);
            discrete_field_deps.push(fields);
            discrete_discrete_deps.push(others);
        }
        Self {
            layout,
            eq_field_deps,
            eq_discrete_deps,
            discrete_field_deps,
            discrete_discrete_deps,
        }
    }

    pub fn layout(&self) -> &DofLayout {
        &self.layout
    }

    /// Builds the sparsity pattern: one pass over every row's declared
    /// dependencies, without touching callback values.
    fn pattern(&self, runtime: &Runtime) -> Csr {
        let g = self.layout.grid_size;
        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        for (eq, fields) in self.eq_field_deps.iter().enumerate() {
            for point in 0..g {
                let row = self.layout.continuous_row(eq, point);
                for &(field, local_op_idx) in fields {
                    if local_op_idx == 0 {
                        triplets.push((row, self.layout.field_col(field, point), 1.0));
                    } else {
                        let op_id = runtime.field_global_op_id(field, local_op_idx);
                        let w = runtime.differentiation_weights(op_id);
                        for &col in w.row_col_indices(point) {
                            triplets.push((row, self.layout.field_col(field, col), 1.0));
                        }
                    }
                }
            }
        }
        for (eq, vars) in self.eq_discrete_deps.iter().enumerate() {
            for point in 0..g {
                let row = self.layout.continuous_row(eq, point);
                for &var in vars {
                    triplets.push((row, self.layout.discrete_col(var), 1.0));
                }
            }
        }
        for (var, fields) in self.discrete_field_deps.iter().enumerate() {
            let row = self.layout.discrete_row(var);
            for &field in fields {
                for point in 0..g {
                    triplets.push((row, self.layout.field_col(field, point), 1.0));
                }
            }
        }
        for (var, others) in self.discrete_discrete_deps.iter().enumerate() {
            let row = self.layout.discrete_row(var);
            for &other in others {
                triplets.push((row, self.layout.discrete_col(other), 1.0));
            }
        }
        Csr::from_triplets(self.layout.total(), self.layout.total(), triplets)
    }

    /// Numerically assembles the Jacobian at the runtime's current state
    /// (which must already be actualized). VDE Jacobians and reduction
    /// Jacobians are evaluated first into reusable scalar caches (per
    /// SPEC_FULL §4.5's evaluation order), then the equation/discrete-
    /// equation Jacobian rows are assembled by chain rule through them.
    pub fn assemble(&self, runtime: &Runtime) -> Csr {
        let mut csr = self.pattern(runtime);
        csr.zero_values();
        let d = runtime.descriptor();
        let g = self.layout.grid_size;
        let globals = runtime.globals(d.global_vde_count);

        // Reduction partials wrt each discrete variable: a genuine sum
        // over every grid point (the variable affects every point's
        // integrand simultaneously), cached once per (reduction, var).
        let reduction_partial_wrt_discrete = |reduction: usize, var: usize| -> f64 {
            let dep = Dependency::Discrete { var };
            let internal = match d.reduction_jacobian(reduction, dep) {
                Some(f) => f,
                None => return 0.0,
            };
            let mut raw = 0.0;
            for point in 0..g {
                let locals = runtime.locals_at(point, runtime.grid().region_of(point), d.local_vde_count);
                let vde_partials = self.local_vde_partials_at(runtime, point, dep);
                let ljac = LocalsForJacobian {
                    locals: &locals,
                    vde_partials: &vde_partials,
                };
                let global_vde_partials = self.global_vde_partials(runtime, dep);
                let gjac = GlobalsForJacobian {
                    globals: &globals,
                    reduction_partials: &[],
                    global_vde_partials: &global_vde_partials,
                };
                raw += internal(&ljac, &gjac) * runtime.integration_weights()[point];
            }
            let external_jac = d.reduction_external_jacobian(reduction);
            external_jac(runtime.reductions_raw()[reduction]) * raw
        };

        for (eq, fields) in self.eq_field_deps.iter().enumerate() {
            for &(field, local_op_idx) in fields {
                let dep = Dependency::Field { field, local_op_idx };
                self.assemble_continuous_dep(runtime, &mut csr, eq, dep, &globals, &reduction_partial_wrt_discrete);
            }
        }
        for (eq, vars) in self.eq_discrete_deps.iter().enumerate() {
            for &var in vars {
                let dep = Dependency::Discrete { var };
                self.assemble_continuous_dep(runtime, &mut csr, eq, dep, &globals, &reduction_partial_wrt_discrete);
            }
        }

        for (var, fields) in self.discrete_field_deps.iter().enumerate() {
            let row = self.layout.discrete_row(var);
            for &field in fields {
                let f = match d.discrete_equation_jacobian_field(var, field) {
                    Some(f) => f,
                    None => continue,
                };
                let dep = Dependency::Field { field, local_op_idx: 0 };
                for point in 0..g {
                    let locals = runtime.locals_at(point, runtime.grid().region_of(point), d.local_vde_count);
                    let vde_partials = self.local_vde_partials_at(runtime, point, dep);
                    let ljac = LocalsForJacobian {
                        locals: &locals,
                        vde_partials: &vde_partials,
                    };
                    let reduction_partials = self.reduction_partials_at_point(runtime, point, dep, &globals);
                    let gjac = GlobalsForJacobian {
                        globals: &globals,
                        reduction_partials: &reduction_partials,
                        global_vde_partials: &[],
                    };
                    let value = f(&ljac, &gjac);
                    if value != 0.0 {
                        if let Some(slot) = csr.find_slot(row, self.layout.field_col(field, point)) {
                            csr.accumulate(slot, value);
                        }
                    }
                }
            }
        }
        for (var, others) in self.discrete_discrete_deps.iter().enumerate() {
            let row = self.layout.discrete_row(var);
            for &other in others {
                let f = match d.discrete_equation_jacobian_discrete(var, other) {
                    Some(f) => f,
                    None => continue,
                };
                let value = f(&globals);
                if value != 0.0 {
                    if let Some(slot) = csr.find_slot(row, self.layout.discrete_col(other)) {
                        csr.accumulate(slot, value);
                    }
                }
            }
        }
        csr
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble_continuous_dep(
        &self,
        runtime: &Runtime,
        csr: &mut Csr,
        eq: usize,
        dep: Dependency,
        globals: &crate::problem::views::Globals,
        reduction_partial_wrt_discrete: &impl Fn(usize, usize) -> f64,
    ) {
        let d = runtime.descriptor();
        let g = self.layout.grid_size;
        for point in 0..g {
            let region = runtime.grid().region_of(point);
            let f = match d.equation_jacobian(eq, region, dep) {
                Some(f) => f,
                None => continue,
            };
            let locals = runtime.locals_at(point, region, d.local_vde_count);
            let vde_partials = self.local_vde_partials_at(runtime, point, dep);
            let ljac = LocalsForJacobian {
                locals: &locals,
                vde_partials: &vde_partials,
            };
            let reduction_partials: Vec<f64> = (0..d.reduction_count)
                .map(|k| match dep {
                    Dependency::Discrete { var } => reduction_partial_wrt_discrete(k, var),
                    Dependency::Field { .. } => self.reduction_partial_at_point(runtime, k, point, dep, globals),
                })
                .collect();
            let global_vde_partials = self.global_vde_partials(runtime, dep);
            let gjac = GlobalsForJacobian {
                globals,
                reduction_partials: &reduction_partials,
                global_vde_partials: &global_vde_partials,
            };
            let value = f(&ljac, &gjac);
            if value == 0.0 {
                continue;
            }
            let row = self.layout.continuous_row(eq, point);
            match dep {
                Dependency::Field { field, local_op_idx: 0 } => {
                    if let Some(slot) = csr.find_slot(row, self.layout.field_col(field, point)) {
                        csr.accumulate(slot, value);
                    }
                }
                Dependency::Field { field, local_op_idx } => {
                    let op_id = runtime.field_global_op_id(field, local_op_idx);
                    let w = runtime.differentiation_weights(op_id);
                    for (&col, &weight) in w.row_col_indices(point).iter().zip(w.row_values(point)) {
                        if let Some(slot) = csr.find_slot(row, self.layout.field_col(field, col)) {
                            csr.accumulate(slot, value * weight);
                        }
                    }
                }
                Dependency::Discrete { var } => {
                    if let Some(slot) = csr.find_slot(row, self.layout.discrete_col(var)) {
                        csr.accumulate(slot, value);
                    }
                }
            }
        }
    }

    /// Local VDE partials wrt `dep` at `point`: `LocalsForJacobian`'s
    /// `vde_partials` slice for whichever equation/VDE/reduction Jacobian
    /// is currently being assembled there.
    fn local_vde_partials_at(&self, runtime: &Runtime, point: usize, dep: Dependency) -> Vec<f64> {
        let d = runtime.descriptor();
        let region = runtime.grid().region_of(point);
        (0..d.local_vde_count)
            .map(|i| match d.local_vde_jacobian(i, dep) {
                Some(f) => f(&runtime.locals_at(point, region, d.local_vde_count)),
                None => 0.0,
            })
            .collect()
    }

    /// Global VDE partials wrt `dep`: nonzero only when `dep` is a
    /// discrete variable, since global VDEs never read per-point data.
    fn global_vde_partials(&self, runtime: &Runtime, dep: Dependency) -> Vec<f64> {
        let d = runtime.descriptor();
        let var = match dep {
            Dependency::Discrete { var } => var,
            Dependency::Field { .. } => return vec![0.0; d.global_vde_count],
        };
        let globals = runtime.globals(d.global_vde_count);
        (0..d.global_vde_count)
            .map(|j| d.global_vde_jacobian(j, var).map_or(0.0, |f| f(&globals)))
            .collect()
    }

    /// Reduction partial wrt a `Field` dependency at a specific point: a
    /// pointwise quantity (no cross-point sum), since only that point's
    /// integrand term depends on the field's value there.
    fn reduction_partial_at_point(
        &self,
        runtime: &Runtime,
        reduction: usize,
        point: usize,
        dep: Dependency,
        globals: &crate::problem::views::Globals,
    ) -> f64 {
        let d = runtime.descriptor();
        let internal = match d.reduction_jacobian(reduction, dep) {
            Some(f) => f,
            None => return 0.0,
        };
        let region = runtime.grid().region_of(point);
        let locals = runtime.locals_at(point, region, d.local_vde_count);
        let vde_partials = self.local_vde_partials_at(runtime, point, dep);
        let ljac = LocalsForJacobian {
            locals: &locals,
            vde_partials: &vde_partials,
        };
        let global_vde_partials = self.global_vde_partials(runtime, dep);
        let gjac = GlobalsForJacobian {
            globals,
            reduction_partials: &[],
            global_vde_partials: &global_vde_partials,
        };
        let external_jac = d.reduction_external_jacobian(reduction);
        let raw = internal(&ljac, &gjac) * runtime.integration_weights()[point];
        external_jac(runtime.reductions_raw()[reduction]) * raw
    }

    /// Reduction partials wrt `dep` at `point`, one per reduction — used
    /// to fill a discrete equation's `GlobalsForJacobian.reduction_partials`.
    fn reduction_partials_at_point(
        &self,
        runtime: &Runtime,
        point: usize,
        dep: Dependency,
        globals: &crate::problem::views::Globals,
    ) -> Vec<f64> {
        let d = runtime.descriptor();
        (0..d.reduction_count)
            .map(|k| self.reduction_partial_at_point(runtime, k, point, dep, globals))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Axis, Grid};
    use crate::problem::descriptor::Descriptor;
    use std::rc::Rc;

    fn simple_grid() -> Rc<Grid> {
        Rc::new(Grid::new(vec![Axis::new(vec![0.0, 1.0, 2.0, 3.0, 4.0], None, 0).unwrap()]))
    }

    #[test]
    fn identity_equation_jacobian_has_diagonal_ones() {
        let grid = simple_grid();
        let mut desc = Descriptor::new(1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3);
        desc.set_continuous_equation(0, 0, Box::new(|l, _g| l.field(0)));
        desc.set_continuous_equation(0, 1, Box::new(|l, _g| l.field(0)));
        desc.set_continuous_equation(0, 2, Box::new(|l, _g| l.field(0)));
        desc.set_equation_jacobian(0, 0, Dependency::Field { field: 0, local_op_idx: 0 }, Box::new(|_l, _g| 1.0));
        desc.set_equation_jacobian(0, 1, Dependency::Field { field: 0, local_op_idx: 0 }, Box::new(|_l, _g| 1.0));
        desc.set_equation_jacobian(0, 2, Dependency::Field { field: 0, local_op_idx: 0 }, Box::new(|_l, _g| 1.0));
        let runtime = Runtime::new(grid, desc, 2).unwrap();
        let assembler = JacobianAssembler::build(&runtime);
        let j = assembler.assemble(&runtime);
        assert_eq!(j.nrows(), 5);
        assert_eq!(j.ncols(), 5);
        for p in 0..5 {
            let slot = j.find_slot(p, p).unwrap();
            assert_eq!(j.values()[slot], 1.0);
        }
    }
}
