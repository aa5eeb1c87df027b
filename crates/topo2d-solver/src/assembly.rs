//! Sparse assembly of the global stiffness system.
//!
//! The sparsity pattern is fixed for the life of the problem; each
//! optimization step only re-populates numeric values. Per-element values
//! are the outer product of the 36-entry unit stencil with the per-element
//! Young's moduli, flattened element-major in the same order as the mesh's
//! stiffness pattern. Triplets touching a fixed DOF are dropped, the rest
//! are re-indexed into free-DOF space; duplicate pairs from elements sharing
//! a DOF are summed downstream by the CSC conversion.

use crate::backend::SparseTriplets;
use crate::element::ElementStencil;
use crate::mesh::Mesh;
use nalgebra::DVector;
use rayon::prelude::*;

/// Expand the unit stencil against the per-element moduli.
///
/// Output length is `36 * num_elements`, element-major, matching
/// `mesh.stiffness_pattern` entry for entry.
pub fn scaled_element_values(stencil: &ElementStencil, young_moduli: &DVector<f64>) -> Vec<f64> {
    young_moduli
        .as_slice()
        .par_iter()
        .flat_map_iter(|&modulus| stencil.values.iter().map(move |&value| modulus * value))
        .collect()
}

/// Build the free-DOF COO triplets from the canonical half-pattern.
///
/// The pattern stores one symmetric half (`row >= col`); off-diagonal
/// entries are mirrored here so the backend receives the full symmetric
/// matrix regardless of which triangle its factorization reads.
pub fn assemble_free_system(mesh: &Mesh, values: &[f64]) -> SparseTriplets {
    debug_assert_eq!(values.len(), mesh.stiffness_pattern.len());

    let dim = mesh.free_dofs.len();
    let mut triplets = SparseTriplets::with_capacity(dim, 2 * values.len());
    for (&(row, col), &value) in mesh.stiffness_pattern.iter().zip(values.iter()) {
        let (Some(free_row), Some(free_col)) = (mesh.dof_to_free[row], mesh.dof_to_free[col])
        else {
            continue;
        };
        triplets.push(free_row, free_col, value);
        if free_row != free_col {
            triplets.push(free_col, free_row, value);
        }
    }
    triplets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_values_follow_pattern_order() {
        let stencil = ElementStencil::new(0.3);
        let moduli = DVector::from_column_slice(&[2.0, 0.5]);
        let values = scaled_element_values(&stencil, &moduli);
        assert_eq!(values.len(), 72);
        for k in 0..36 {
            assert_eq!(values[k], 2.0 * stencil.values[k]);
            assert_eq!(values[36 + k], 0.5 * stencil.values[k]);
        }
    }

    #[test]
    fn fixed_dofs_are_dropped() {
        let mesh = Mesh::new(2, 1).unwrap();
        let stencil = ElementStencil::new(0.3);
        let moduli = DVector::from_element(mesh.num_elements, 1.0);
        let values = scaled_element_values(&stencil, &moduli);
        let triplets = assemble_free_system(&mesh, &values);

        assert_eq!(triplets.dim, mesh.free_dofs.len());
        for (&row, &col) in triplets.rows.iter().zip(triplets.cols.iter()) {
            assert!(row < triplets.dim);
            assert!(col < triplets.dim);
        }
    }

    #[test]
    fn assembled_matrix_is_symmetric() {
        use std::collections::HashMap;

        let mesh = Mesh::new(3, 2).unwrap();
        let stencil = ElementStencil::new(0.3);
        let moduli = DVector::from_element(mesh.num_elements, 1.0);
        let triplets = assemble_free_system(&mesh, &scaled_element_values(&stencil, &moduli));

        let mut dense: HashMap<(usize, usize), f64> = HashMap::new();
        for k in 0..triplets.nnz() {
            *dense.entry((triplets.rows[k], triplets.cols[k])).or_insert(0.0) +=
                triplets.values[k];
        }
        for (&(row, col), &value) in &dense {
            let mirrored = dense.get(&(col, row)).copied().unwrap_or(0.0);
            assert!(
                (value - mirrored).abs() < 1e-14,
                "asymmetry at ({}, {})",
                row,
                col
            );
        }
    }

    #[test]
    fn diagonal_accumulates_shared_dofs() {
        use std::collections::HashMap;

        // The two elements of a 2x1 grid share the middle node column; the
        // summed diagonal there must exceed a single element's diagonal.
        let mesh = Mesh::new(2, 1).unwrap();
        let stencil = ElementStencil::new(0.3);
        let moduli = DVector::from_element(2, 1.0);
        let triplets = assemble_free_system(&mesh, &scaled_element_values(&stencil, &moduli));

        let mut diag: HashMap<usize, f64> = HashMap::new();
        for k in 0..triplets.nnz() {
            if triplets.rows[k] == triplets.cols[k] {
                *diag.entry(triplets.rows[k]).or_insert(0.0) += triplets.values[k];
            }
        }
        // DOF 5 (y of the shared top-middle node) belongs to both elements.
        let shared = mesh.dof_to_free[5].unwrap();
        let single = stencil.matrix[(0, 0)];
        assert!(diag[&shared] > 1.5 * single);
    }
}
