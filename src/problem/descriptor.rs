//! Declarative problem descriptor: counts, per-field derivative operators,
//! and the callback catalogue from SPEC_FULL.md §3. Mirrors the descriptor
//! half of `Problem/BaseProblem.h`.

use std::collections::HashMap;

use crate::error::{CesdsolError, Result};
use crate::problem::views::{
    Globals, GlobalsForJacobian, GlobalsForPie, GlobalsForVie, Locals, LocalsForJacobian, LocalsForPie, LocalsForVie,
};

/// A single Jacobian dependency: either a field (by value, operator index
/// `0`, or one of its declared derivative operators) or a discrete
/// variable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dependency {
    Field { field: usize, local_op_idx: usize },
    Discrete { var: usize },
}

pub type ContinuousEqFn = Box<dyn Fn(&Locals, &Globals) -> f64 + Send + Sync>;
pub type DiscreteEqFn = Box<dyn Fn(&Globals) -> f64 + Send + Sync>;
pub type LocalPieFn = Box<dyn Fn(&LocalsForPie) -> f64 + Send + Sync>;
pub type GlobalPieFn = Box<dyn Fn(&GlobalsForPie) -> f64 + Send + Sync>;
pub type LocalVieFn = Box<dyn Fn(&LocalsForVie) -> f64 + Send + Sync>;
pub type GlobalVieFn = Box<dyn Fn(&GlobalsForVie) -> f64 + Send + Sync>;
pub type LocalVdeFn = Box<dyn Fn(&Locals) -> f64 + Send + Sync>;
pub type GlobalVdeFn = Box<dyn Fn(&Globals) -> f64 + Send + Sync>;
pub type ReductionInternalFn = Box<dyn Fn(&Locals, &Globals) -> f64 + Send + Sync>;
pub type ReductionExternalFn = Box<dyn Fn(f64) -> f64 + Send + Sync>;
pub type EqJacobianFn = Box<dyn Fn(&LocalsForJacobian, &GlobalsForJacobian) -> f64 + Send + Sync>;
pub type DiscreteEqJacobianFieldFn = Box<dyn Fn(&LocalsForJacobian, &GlobalsForJacobian) -> f64 + Send + Sync>;
pub type DiscreteEqJacobianDiscreteFn = Box<dyn Fn(&Globals) -> f64 + Send + Sync>;
pub type LocalVdeJacobianFn = Box<dyn Fn(&Locals) -> f64 + Send + Sync>;
pub type GlobalVdeJacobianFn = Box<dyn Fn(&Globals) -> f64 + Send + Sync>;
pub type ReductionJacobianFn = Box<dyn Fn(&LocalsForJacobian, &GlobalsForJacobian) -> f64 + Send + Sync>;

fn default_reduction_external() -> ReductionExternalFn {
    Box::new(|x| x)
}

fn default_reduction_external_jacobian() -> ReductionExternalJacobianFn {
    Box::new(|_x| 1.0)
}

pub type ReductionExternalJacobianFn = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Declarative bundle of counts, operator declarations and callbacks.
/// Field count equals the continuous-equation count `Nc` (field `e` is
/// governed by equation `e`).
pub struct Descriptor {
    pub continuous_eq_count: usize,
    pub discrete_eq_count: usize,
    pub parameter_count: usize,
    pub local_pie_count: usize,
    pub global_pie_count: usize,
    pub local_vie_count: usize,
    pub global_vie_count: usize,
    pub local_vde_count: usize,
    pub global_vde_count: usize,
    pub reduction_count: usize,
    pub region_count: usize,

    /// Per field, the list of declared non-identity derivative operators
    /// (each a length-`D` order tuple). Operator index `0` is always the
    /// implicit field value and is not stored here.
    pub field_operators: Vec<Vec<Vec<usize>>>,

    continuous_eqs: HashMap<(usize, usize), ContinuousEqFn>,
    discrete_eqs: Vec<Option<DiscreteEqFn>>,
    local_pies: Vec<Option<LocalPieFn>>,
    global_pies: Vec<Option<GlobalPieFn>>,
    local_vies: Vec<Option<LocalVieFn>>,
    global_vies: Vec<Option<GlobalVieFn>>,
    local_vdes: Vec<Option<LocalVdeFn>>,
    global_vdes: Vec<Option<GlobalVdeFn>>,
    reduction_internal: Vec<Option<ReductionInternalFn>>,
    reduction_external: Vec<ReductionExternalFn>,
    reduction_external_jacobian: Vec<ReductionExternalJacobianFn>,

    eq_jacobian: HashMap<(usize, usize, Dependency), EqJacobianFn>,
    discrete_eq_jacobian_field: HashMap<(usize, usize), DiscreteEqJacobianFieldFn>,
    discrete_eq_jacobian_discrete: HashMap<(usize, usize), DiscreteEqJacobianDiscreteFn>,
    local_vde_jacobian: HashMap<(usize, Dependency), LocalVdeJacobianFn>,
    global_vde_jacobian: HashMap<(usize, usize), GlobalVdeJacobianFn>,
    reduction_jacobian: HashMap<(usize, Dependency), ReductionJacobianFn>,
}

impl Descriptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        continuous_eq_count: usize,
        discrete_eq_count: usize,
        parameter_count: usize,
        local_pie_count: usize,
        global_pie_count: usize,
        local_vie_count: usize,
        global_vie_count: usize,
        local_vde_count: usize,
        global_vde_count: usize,
        reduction_count: usize,
        region_count: usize,
    ) -> Self {
        Self {
            continuous_eq_count,
            discrete_eq_count,
            parameter_count,
            local_pie_count,
            global_pie_count,
            local_vie_count,
            global_vie_count,
            local_vde_count,
            global_vde_count,
            reduction_count,
            region_count,
            field_operators: vec![Vec::new(); continuous_eq_count],
            continuous_eqs: HashMap::new(),
            discrete_eqs: (0..discrete_eq_count).map(|_| None).collect(),
            local_pies: (0..local_pie_count).map(|_| None).collect(),
            global_pies: (0..global_pie_count).map(|_| None).collect(),
            local_vies: (0..local_vie_count).map(|_| None).collect(),
            global_vies: (0..global_vie_count).map(|_| None).collect(),
            local_vdes: (0..local_vde_count).map(|_| None).collect(),
            global_vdes: (0..global_vde_count).map(|_| None).collect(),
            reduction_internal: (0..reduction_count).map(|_| None).collect(),
            reduction_external: (0..reduction_count).map(|_| default_reduction_external()).collect(),
            reduction_external_jacobian: (0..reduction_count)
                .map(|_| default_reduction_external_jacobian())
                .collect(),
            eq_jacobian: HashMap::new(),
            discrete_eq_jacobian_field: HashMap::new(),
            discrete_eq_jacobian_discrete: HashMap::new(),
            local_vde_jacobian: HashMap::new(),
            global_vde_jacobian: HashMap::new(),
            reduction_jacobian: HashMap::new(),
        }
    }

    pub fn declare_operator(&mut self, field: usize, order: Vec<usize>) -> usize {
        let ops = &mut self.field_operators[field];
        ops.push(order);
        ops.len() // local_op_idx, 1-based among declared operators
    }

    pub fn set_continuous_equation(&mut self, eq: usize, region: usize, f: ContinuousEqFn) {
        self.continuous_eqs.insert((eq, region), f);
    }

    pub fn set_discrete_equation(&mut self, var: usize, f: DiscreteEqFn) {
        self.discrete_eqs[var] = Some(f);
    }

    pub fn set_local_pie(&mut self, idx: usize, f: LocalPieFn) {
        self.local_pies[idx] = Some(f);
    }

    pub fn set_global_pie(&mut self, idx: usize, f: GlobalPieFn) {
        self.global_pies[idx] = Some(f);
    }

    pub fn set_local_vie(&mut self, idx: usize, f: LocalVieFn) {
        self.local_vies[idx] = Some(f);
    }

    pub fn set_global_vie(&mut self, idx: usize, f: GlobalVieFn) {
        self.global_vies[idx] = Some(f);
    }

    pub fn set_local_vde(&mut self, idx: usize, f: LocalVdeFn) {
        self.local_vdes[idx] = Some(f);
    }

    pub fn set_global_vde(&mut self, idx: usize, f: GlobalVdeFn) {
        self.global_vdes[idx] = Some(f);
    }

    pub fn set_reduction(&mut self, idx: usize, internal: ReductionInternalFn) {
        self.reduction_internal[idx] = Some(internal);
    }

    pub fn set_reduction_external(&mut self, idx: usize, external: ReductionExternalFn, external_jacobian: ReductionExternalJacobianFn) {
        self.reduction_external[idx] = external;
        self.reduction_external_jacobian[idx] = external_jacobian;
    }

    pub fn set_equation_jacobian(&mut self, eq: usize, region: usize, dep: Dependency, f: EqJacobianFn) {
        self.eq_jacobian.insert((eq, region, dep), f);
    }

    pub fn set_discrete_equation_jacobian_field(&mut self, var: usize, field: usize, f: DiscreteEqJacobianFieldFn) {
        self.discrete_eq_jacobian_field.insert((var, field), f);
    }

    pub fn set_discrete_equation_jacobian_discrete(&mut self, var: usize, other_var: usize, f: DiscreteEqJacobianDiscreteFn) {
        self.discrete_eq_jacobian_discrete.insert((var, other_var), f);
    }

    pub fn set_local_vde_jacobian(&mut self, vde: usize, dep: Dependency, f: LocalVdeJacobianFn) {
        self.local_vde_jacobian.insert((vde, dep), f);
    }

    pub fn set_global_vde_jacobian(&mut self, vde: usize, var: usize, f: GlobalVdeJacobianFn) {
        self.global_vde_jacobian.insert((vde, var), f);
    }

    pub fn set_reduction_jacobian(&mut self, reduction: usize, dep: Dependency, f: ReductionJacobianFn) {
        self.reduction_jacobian.insert((reduction, dep), f);
    }

    /// Looks up the callback for `(eq, region)`, falling back to the
    /// interior region `0` callback when `region` has none registered.
    pub fn continuous_equation(&self, eq: usize, region: usize) -> Option<&ContinuousEqFn> {
        self.continuous_eqs
            .get(&(eq, region))
            .or_else(|| self.continuous_eqs.get(&(eq, 0)))
    }

    pub fn discrete_equation(&self, var: usize) -> Option<&DiscreteEqFn> {
        self.discrete_eqs[var].as_ref()
    }

    pub fn local_pie(&self, idx: usize) -> Option<&LocalPieFn> {
        self.local_pies[idx].as_ref()
    }

    pub fn global_pie(&self, idx: usize) -> Option<&GlobalPieFn> {
        self.global_pies[idx].as_ref()
    }

    pub fn local_vie(&self, idx: usize) -> Option<&LocalVieFn> {
        self.local_vies[idx].as_ref()
    }

    pub fn global_vie(&self, idx: usize) -> Option<&GlobalVieFn> {
        self.global_vies[idx].as_ref()
    }

    pub fn local_vde(&self, idx: usize) -> Option<&LocalVdeFn> {
        self.local_vdes[idx].as_ref()
    }

    pub fn global_vde(&self, idx: usize) -> Option<&GlobalVdeFn> {
        self.global_vdes[idx].as_ref()
    }

    pub fn reduction_internal(&self, idx: usize) -> Option<&ReductionInternalFn> {
        self.reduction_internal[idx].as_ref()
    }

    pub fn reduction_external(&self, idx: usize) -> &ReductionExternalFn {
        &self.reduction_external[idx]
    }

    pub fn reduction_external_jacobian(&self, idx: usize) -> &ReductionExternalJacobianFn {
        &self.reduction_external_jacobian[idx]
    }

    pub fn equation_jacobian(&self, eq: usize, region: usize, dep: Dependency) -> Option<&EqJacobianFn> {
        self.eq_jacobian
            .get(&(eq, region, dep))
            .or_else(|| self.eq_jacobian.get(&(eq, 0, dep)))
    }

    pub fn discrete_equation_jacobian_field(&self, var: usize, field: usize) -> Option<&DiscreteEqJacobianFieldFn> {
        self.discrete_eq_jacobian_field.get(&(var, field))
    }

    pub fn discrete_equation_jacobian_discrete(&self, var: usize, other_var: usize) -> Option<&DiscreteEqJacobianDiscreteFn> {
        self.discrete_eq_jacobian_discrete.get(&(var, other_var))
    }

    pub fn local_vde_jacobian(&self, vde: usize, dep: Dependency) -> Option<&LocalVdeJacobianFn> {
        self.local_vde_jacobian.get(&(vde, dep))
    }

    pub fn global_vde_jacobian(&self, vde: usize, var: usize) -> Option<&GlobalVdeJacobianFn> {
        self.global_vde_jacobian.get(&(vde, var))
    }

    pub fn reduction_jacobian(&self, reduction: usize, dep: Dependency) -> Option<&ReductionJacobianFn> {
        self.reduction_jacobian.get(&(reduction, dep))
    }

    /// All dependencies that appear in *any* Jacobian callback for `eq`
    /// across all regions: the structural footprint of that equation.
    pub fn dependencies_for_equation(&self, eq: usize) -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = self
            .eq_jacobian
            .keys()
            .filter(|(e, _, _)| *e == eq)
            .map(|(_, _, d)| *d)
            .collect();
        deps.sort_by_key(dependency_sort_key);
        deps.dedup();
        deps
    }

    pub fn dependencies_for_reduction(&self, reduction: usize) -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = self
            .reduction_jacobian
            .keys()
            .filter(|(r, _)| *r == reduction)
            .map(|(_, d)| *d)
            .collect();
        deps.sort_by_key(dependency_sort_key);
        deps.dedup();
        deps
    }

    pub fn dependencies_for_local_vde(&self, vde: usize) -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = self
            .local_vde_jacobian
            .keys()
            .filter(|(v, _)| *v == vde)
            .map(|(_, d)| *d)
            .collect();
        deps.sort_by_key(dependency_sort_key);
        deps.dedup();
        deps
    }

    pub fn discrete_vars_for_global_vde(&self, vde: usize) -> Vec<usize> {
        let mut vars: Vec<usize> = self
            .global_vde_jacobian
            .keys()
            .filter(|(v, _)| *v == vde)
            .map(|(_, var)| *var)
            .collect();
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    pub fn dependencies_for_discrete_equation(&self, var: usize) -> (Vec<usize>, Vec<usize>) {
        let mut fields: Vec<usize> = self
            .discrete_eq_jacobian_field
            .keys()
            .filter(|(v, _)| *v == var)
            .map(|(_, f)| *f)
            .collect();
        fields.sort_unstable();
        fields.dedup();
        let mut others: Vec<usize> = self
            .discrete_eq_jacobian_discrete
            .keys()
            .filter(|(v, _)| *v == var)
            .map(|(_, o)| *o)
            .collect();
        others.sort_unstable();
        others.dedup();
        (fields, others)
    }

    /// Validates the descriptor per SPEC_FULL §4.3.
    pub fn validate(&self) -> Result<()> {
        for eq in 0..self.continuous_eq_count {
            if !self.continuous_eqs.contains_key(&(eq, 0)) {
                return Err(CesdsolError::MissingInteriorCallback { eq });
            }
        }
        for var in 0..self.discrete_eq_count {
            if self.discrete_eqs[var].is_none() {
                return Err(CesdsolError::MissingDiscreteCallback { var });
            }
        }
        for (kind, slots) in [
            ("local_pie", &self.local_pies.iter().map(Option::is_some).collect::<Vec<_>>()),
            ("global_pie", &self.global_pies.iter().map(Option::is_some).collect::<Vec<_>>()),
            ("local_vie", &self.local_vies.iter().map(Option::is_some).collect::<Vec<_>>()),
            ("global_vie", &self.global_vies.iter().map(Option::is_some).collect::<Vec<_>>()),
            ("local_vde", &self.local_vdes.iter().map(Option::is_some).collect::<Vec<_>>()),
            ("global_vde", &self.global_vdes.iter().map(Option::is_some).collect::<Vec<_>>()),
        ] {
            if let Some(index) = slots.iter().position(|&present| !present) {
                return Err(CesdsolError::MissingExpressionCallback { kind, index });
            }
        }
        for (index, present) in self.reduction_internal.iter().enumerate() {
            if present.is_none() {
                return Err(CesdsolError::MissingReductionCallback { index });
            }
        }
        Ok(())
    }
}

fn dependency_sort_key(d: &Dependency) -> (u8, usize, usize) {
    match *d {
        Dependency::Field { field, local_op_idx } => (0, field, local_op_idx),
        Dependency::Discrete { var } => (1, var, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_fails_without_interior_callback() {
        let desc = Descriptor::new(1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1);
        assert!(matches!(
            desc.validate(),
            Err(CesdsolError::MissingInteriorCallback { eq: 0 })
        ));
    }

    #[test]
    fn validation_passes_once_interior_registered() {
        let mut desc = Descriptor::new(1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1);
        desc.set_continuous_equation(0, 0, Box::new(|l, _g| l.field(0)));
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn continuous_equation_falls_back_to_region_zero() {
        let mut desc = Descriptor::new(1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3);
        desc.set_continuous_equation(0, 0, Box::new(|_l, _g| 1.0));
        assert!(desc.continuous_equation(0, 2).is_some());
        assert!(desc.continuous_equation(0, 0).is_some());
    }
}
