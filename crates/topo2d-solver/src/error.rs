//! Error types for the topology optimization solver.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

/// Errors raised by problem construction and by the equilibrium solver.
///
/// Configuration errors are rejected at initialization, before any solve is
/// attempted. The three numerical kinds mirror the status codes a sparse
/// factorization backend can report; they are fatal to the current solve and
/// always propagate to the caller.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("invalid mesh dimensions: {0} x {1} elements")]
    InvalidMesh(usize, usize),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("numerical issue: {0}")]
    NumericalIssue(String),

    #[error("no convergence: {0}")]
    NoConvergence(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SolverError {
    /// True for the numerical-failure kinds (as opposed to configuration
    /// errors caught at initialization).
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            SolverError::NumericalIssue(_)
                | SolverError::NoConvergence(_)
                | SolverError::InvalidInput(_)
        )
    }
}
