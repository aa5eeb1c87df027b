//! Compliance sensitivity analysis.
//!
//! Each element's contribution to compliance is `E_e * (u_e^T K0 u_e)` with
//! `K0` the unit-modulus element stencil and `u_e` the element's 8 nodal
//! displacement components. The derivative of compliance with respect to an
//! element's density is `-dE/drho * (u_e^T K0 u_e)`; the adjoint filter pass
//! that turns these into derivatives with respect to the raw design
//! variables lives in the filter module and is applied by the caller.

use crate::element::ElementStencil;
use crate::materials::Simp;
use crate::mesh::Mesh;
use nalgebra::{DVector, SVector};
use rayon::prelude::*;

/// Per-element strain-energy quadratic forms `u_e^T K0 u_e` at unit modulus.
pub fn element_strain_energies(
    mesh: &Mesh,
    stencil: &ElementStencil,
    displacements: &DVector<f64>,
) -> Vec<f64> {
    mesh.connectivity
        .par_iter()
        .map(|dofs| {
            let u = SVector::<f64, 8>::from_fn(|i, _| displacements[dofs[i]]);
            u.dot(&(stencil.matrix * u))
        })
        .collect()
}

/// Total compliance `sum_e E_e * (u_e^T K0 u_e)`.
pub fn compliance(young_moduli: &DVector<f64>, strain_energies: &[f64]) -> f64 {
    young_moduli
        .iter()
        .zip(strain_energies.iter())
        .map(|(modulus, energy)| modulus * energy)
        .sum()
}

/// Raw compliance derivative per element, `-dE/drho * (u_e^T K0 u_e)`.
///
/// Compliance is minimized, so the derivative is non-positive wherever the
/// strain energy is non-negative and feeds a descent-style update directly.
pub fn compliance_derivative(
    physical_densities: &DVector<f64>,
    strain_energies: &[f64],
    simp: &Simp,
    out: &mut DVector<f64>,
) {
    out.as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(e, value)| {
            *value = -simp.modulus_derivative(physical_densities[e]) * strain_energies[e];
        });
}
