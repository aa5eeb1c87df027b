//! Solver backend abstraction.
//!
//! The assembly layer produces COO triplets restricted to the free DOFs;
//! a [`LinearSolver`] backend factorizes and solves the resulting symmetric
//! positive-definite system. Keeping the seam trait-shaped leaves room for
//! an external direct or iterative solver without touching assembly.

pub mod native;
pub mod traits;

pub use native::CholeskyBackend;
pub use traits::{LinearSolver, LinearSystem, SolveInfo, SparseTriplets};

/// Returns the default solver backend.
pub fn default_backend() -> Box<dyn LinearSolver> {
    Box::new(CholeskyBackend)
}
