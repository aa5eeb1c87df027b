//! 2-D structural topology optimization core (SIMP method).
//!
//! This crate owns the numerical heart of a density-based topology
//! optimization: mesh and DOF bookkeeping on a structured quad grid, the
//! fixed 8-DOF element stiffness stencil, sparse assembly with a one-time
//! sparsity pattern, a sparse Cholesky equilibrium solve, the radius-based
//! density filter (forward and adjoint), SIMP material interpolation and
//! compliance sensitivities. Loading initial densities from disk and the
//! design update that consumes the sensitivities live in the sibling
//! `topo2d-io` and `topo2d-cli` crates.

pub mod assembly;
pub mod backend;
pub mod element;
pub mod error;
pub mod filter;
pub mod materials;
pub mod mesh;
pub mod problem;
pub mod sensitivity;

pub use backend::{default_backend, CholeskyBackend, LinearSolver, LinearSystem, SolveInfo};
pub use element::ElementStencil;
pub use error::{Result, SolverError};
pub use filter::DensityFilter;
pub use materials::Simp;
pub use mesh::{Mesh, DOFS_PER_NODE};
pub use problem::{
    OptimizationConfig, Passivity, Problem, StageTimings, StepOutput, POISSON_RATIO,
};
