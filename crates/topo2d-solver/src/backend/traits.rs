//! Backend trait definitions for the equilibrium solve.
//!
//! The assembly layer produces backend-agnostic COO triplets; a backend
//! turns them into a factorized sparse system and solves it. Element-level
//! computations stay in dense nalgebra (small fixed-size matrices).

use crate::error::{Result, SolverError};
use nalgebra::DVector;
use serde::Serialize;

/// Sparse matrix in COO (coordinate/triplet) format.
///
/// Interchange format between the assembly layer and any solver backend.
/// Duplicate `(row, col)` pairs are legal and must be summed by the
/// consumer.
#[derive(Debug, Clone)]
pub struct SparseTriplets {
    /// Matrix dimension (the matrix is square).
    pub dim: usize,
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseTriplets {
    pub fn with_capacity(dim: usize, capacity: usize) -> Self {
        Self {
            dim,
            rows: Vec::with_capacity(capacity),
            cols: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    /// Number of stored (pre-summation) entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Reject non-finite values and out-of-range indices before they reach
    /// a factorization.
    pub fn validate(&self) -> Result<()> {
        for (&row, &col) in self.rows.iter().zip(self.cols.iter()) {
            if row >= self.dim || col >= self.dim {
                return Err(SolverError::InvalidInput(format!(
                    "triplet index ({}, {}) outside {}-dim system",
                    row, col, self.dim
                )));
            }
        }
        if let Some(position) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(SolverError::InvalidInput(format!(
                "non-finite stiffness value at triplet {}",
                position
            )));
        }
        Ok(())
    }
}

/// A symmetric positive-definite linear system `K u = f`, restricted to the
/// free DOFs, ready for factorization.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    pub stiffness: SparseTriplets,
    pub rhs: DVector<f64>,
}

/// Solver diagnostics reported alongside the solution.
#[derive(Debug, Clone, Serialize)]
pub struct SolveInfo {
    /// Iteration count (1 for direct factorizations).
    pub iterations: usize,
    /// Non-zero count of the assembled matrix.
    pub matrix_nnz: usize,
    /// Human-readable backend name.
    pub solver_name: &'static str,
}

/// A backend that solves the assembled free-DOF system.
pub trait LinearSolver: Send + Sync {
    /// Solve `K u = f`. Failures are fatal to the current step and carry
    /// one of the numerical-failure kinds of [`SolverError`].
    fn solve_linear(&self, system: &LinearSystem) -> Result<(DVector<f64>, SolveInfo)>;
}
