//! Linear algebra primitives: dense vector ops, sparse vectors, CSR matrices
//! and ragged multi-level arrays.

pub mod csr;
pub mod mla;
pub mod sparse_vector;
pub mod vector_ops;

pub use csr::Csr;
pub use mla::MultiLevelArray;
pub use sparse_vector::SparseVec;

/// Dense vector type used throughout the crate.
pub type Vector = nalgebra::DVector<f64>;
/// Dense matrix type used throughout the crate.
pub type Matrix = nalgebra::DMatrix<f64>;
