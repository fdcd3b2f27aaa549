//! Crate-wide error type.
//!
//! Modelled on the teacher's `errors::PSError`: one variant per failure kind
//! from the failure taxonomy, each carrying the context needed to diagnose
//! it rather than a bare string.

use thiserror::Error;

/// Errors raised by construction and solve entry points across the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CesdsolError {
    #[error("axis {axis} has {got} points, need at least 1")]
    EmptyAxis { axis: usize },

    #[error("axis {axis} period must be positive, got {period}")]
    NonPositivePeriod { axis: usize, period: f64 },

    #[error("axis {axis} points are not strictly increasing at index {index}")]
    NonMonotonicAxis { axis: usize, index: usize },

    #[error("stencil size {stencil} exceeds axis {axis} size {axis_size}")]
    StencilTooLarge {
        axis: usize,
        stencil: usize,
        axis_size: usize,
    },

    #[error("derivative operator has length {got}, expected {expected} (grid dimension)")]
    OperatorDimensionMismatch { got: usize, expected: usize },

    #[error("continuous equation {eq} is missing a callback for the interior region (0)")]
    MissingInteriorCallback { eq: usize },

    #[error("discrete equation {var} has no registered callback")]
    MissingDiscreteCallback { var: usize },

    #[error("expression slot {kind} index {index} has no registered callback")]
    MissingExpressionCallback { kind: &'static str, index: usize },

    #[error("reduction {index} has no registered internal function")]
    MissingReductionCallback { index: usize },

    #[error(
        "descriptor region count {descriptor_regions} does not match grid region count {grid_regions}"
    )]
    RegionCountMismatch {
        descriptor_regions: usize,
        grid_regions: usize,
    },

    #[error("parameter index {index} out of range (parameter count {count})")]
    ParameterIndexOutOfRange { index: usize, count: usize },

    #[error("field index {index} out of range (field count {count})")]
    FieldIndexOutOfRange { index: usize, count: usize },

    #[error("vector length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("linear solver failed to solve the system")]
    LinearSolverFailure,

    #[error("line search failed after {iterations} iterations")]
    LineSearchFailure { iterations: usize },

    #[error("modified Newton solver failed to converge after {iterations} iterations, final merit {merit}")]
    NewtonDivergence { iterations: usize, merit: f64 },

    #[error("Runge-Kutta integration stopped: {reason}")]
    IntegrationStopped { reason: String },

    #[error("{e}")]
    Other { e: String },
}

pub type Result<T> = std::result::Result<T, CesdsolError>;
