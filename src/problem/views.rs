//! Value views: the restricted read surface exposed to callbacks at each
//! evaluation phase, per SPEC_FULL.md §4.4's table. Named after, but not
//! structurally copied from, `Problem/LocalValues*.h` / `GlobalValues*.h` —
//! the field layout here follows the phase-dependency table rather than the
//! original's view-class hierarchy.
//!
//! Views own their per-point data rather than borrowing it: the runtime's
//! storage is organized per-expression (`local_pies[idx][point]`), so
//! producing a contiguous "all expressions at this point" slice requires a
//! gather. Owning a small `Vec<f64>` per callback invocation is cheaper and
//! simpler than threading lifetimes through a gathered borrow.

/// View exposed to local parameter-independent-expression callbacks.
pub struct LocalsForPie {
    pub point: usize,
    pub coords: Vec<f64>,
    /// Already-computed local PIEs at this point (indices `0..i`).
    pub pies: Vec<f64>,
}

/// View exposed to global parameter-independent-expression callbacks.
pub struct GlobalsForPie {
    /// Already-computed global PIEs (indices `0..i`).
    pub global_pies: Vec<f64>,
}

/// View exposed to local variable-independent-expression callbacks.
pub struct LocalsForVie {
    pub point: usize,
    pub coords: Vec<f64>,
    pub pies: Vec<f64>,
    /// Already-computed local VIEs at this point (indices `0..i`).
    pub vies: Vec<f64>,
}

/// View exposed to global variable-independent-expression callbacks.
pub struct GlobalsForVie {
    pub pies: Vec<f64>,
    pub parameters: Vec<f64>,
    /// Already-computed global VIEs (indices `0..i`).
    pub global_vies: Vec<f64>,
    /// Present for transient problems only.
    pub time: Option<f64>,
}

/// Full local view: used for local VDE evaluation, reductions and
/// continuous-equation evaluation alike (`LocalsForVDE` == `Locals`).
pub struct Locals {
    pub point: usize,
    pub region: usize,
    pub coords: Vec<f64>,
    pub pies: Vec<f64>,
    pub vies: Vec<f64>,
    /// Already-computed local VDEs at this point (full during equation/
    /// reduction evaluation, prefix `0..i` during VDE evaluation itself).
    pub vdes: Vec<f64>,
    /// Field values at this point, one per continuous field.
    pub field_values: Vec<f64>,
    /// `field_derivatives[field]` holds the value at this point of each of
    /// that field's declared operators, in declaration order (operator
    /// index `0` is the field value itself, exposed separately above).
    pub field_derivatives: Vec<Vec<f64>>,
    pub integration_weight: f64,
}

impl Locals {
    pub fn field(&self, field: usize) -> f64 {
        self.field_values[field]
    }

    /// Value of `field`'s `local_op_idx`-th declared derivative operator
    /// (1-based among declared operators; `0` is the field value itself).
    pub fn derivative(&self, field: usize, local_op_idx: usize) -> f64 {
        self.field_derivatives[field][local_op_idx - 1]
    }
}

/// Full global view.
pub struct Globals {
    pub pies: Vec<f64>,
    pub parameters: Vec<f64>,
    pub vies: Vec<f64>,
    pub discrete_variables: Vec<f64>,
    /// Already-computed global VDEs (full during equation/reduction
    /// evaluation, prefix `0..i` during global-VDE evaluation itself).
    pub global_vdes: Vec<f64>,
    pub reductions: Vec<f64>,
}

/// Locals view extended with the per-point Jacobian partials of every
/// local VDE with respect to the dependency currently being assembled,
/// per SPEC_FULL §4.5's "order of evaluation mirrors value evaluation:
/// VDE Jacobians -> reduction Jacobians -> equation Jacobian".
pub struct LocalsForJacobian<'a> {
    pub locals: &'a Locals,
    pub vde_partials: &'a [f64],
}

impl<'a> std::ops::Deref for LocalsForJacobian<'a> {
    type Target = Locals;
    fn deref(&self) -> &Self::Target {
        self.locals
    }
}

/// Globals view extended with the accumulated reduction Jacobian partials
/// with respect to the dependency currently being assembled.
pub struct GlobalsForJacobian<'a> {
    pub globals: &'a Globals,
    pub reduction_partials: &'a [f64],
    /// Partials of each global VDE with respect to the dependency
    /// currently being assembled. Global VDEs never depend on per-point
    /// field data, so this is populated only when that dependency is a
    /// discrete variable.
    pub global_vde_partials: &'a [f64],
}

impl<'a> std::ops::Deref for GlobalsForJacobian<'a> {
    type Target = Globals;
    fn deref(&self) -> &Self::Target {
        self.globals
    }
}
