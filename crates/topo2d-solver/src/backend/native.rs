//! Native backend using nalgebra-sparse.
//!
//! Converts the assembled COO triplets to CSC and runs a sparse Cholesky
//! factorization. The assembled matrix is symmetric positive definite as
//! long as every element keeps the SIMP modulus floor, so a failed
//! factorization indicates a genuinely singular or ill-conditioned system
//! and is reported, never papered over.

use super::traits::{LinearSolver, LinearSystem, SolveInfo};
use crate::error::{Result, SolverError};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Sparse Cholesky solver backend.
#[derive(Debug, Default)]
pub struct CholeskyBackend;

impl LinearSolver for CholeskyBackend {
    fn solve_linear(&self, system: &LinearSystem) -> Result<(DVector<f64>, SolveInfo)> {
        let n = system.stiffness.dim;
        if system.rhs.len() != n {
            return Err(SolverError::InvalidInput(format!(
                "right-hand side has {} entries for a {}-dim system",
                system.rhs.len(),
                n
            )));
        }
        system.stiffness.validate()?;
        if system.rhs.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::InvalidInput(
                "non-finite entry in force vector".into(),
            ));
        }

        let coo = CooMatrix::try_from_triplets(
            n,
            n,
            system.stiffness.rows.clone(),
            system.stiffness.cols.clone(),
            system.stiffness.values.clone(),
        )
        .map_err(|err| SolverError::InvalidInput(format!("malformed triplets: {}", err)))?;
        // Duplicate triplets from elements sharing a DOF are summed here.
        let csc = CscMatrix::from(&coo);
        let matrix_nnz = csc.nnz();

        let factorization = CscCholesky::factor(&csc)
            .map_err(|err| SolverError::NumericalIssue(format!("factorization failed: {:?}", err)))?;

        let rhs = DMatrix::from_iterator(n, 1, system.rhs.iter().copied());
        let solution = factorization.solve(&rhs);
        let u: DVector<f64> = solution.column(0).into_owned();
        if u.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NumericalIssue(
                "non-finite entry in solution vector".into(),
            ));
        }

        Ok((
            u,
            SolveInfo {
                iterations: 1,
                matrix_nnz,
                solver_name: "nalgebra-sparse CscCholesky",
            },
        ))
    }
}
