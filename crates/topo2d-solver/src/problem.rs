//! Problem state and the optimization-step pipeline.
//!
//! A [`Problem`] owns everything the optimization needs: mesh topology and
//! sparsity pattern, the element stencil, filter kernel, SIMP parameters,
//! and every per-element/per-DOF field. It is built once; each optimization
//! step overwrites fields in place (filter -> interpolation -> equilibrium
//! -> sensitivity -> adjoint filter) and nothing is reallocated after
//! construction except solver scratch. The design update that consumes the
//! filtered derivatives is the caller's business, not this crate's.

use crate::assembly::{assemble_free_system, scaled_element_values};
use crate::backend::{default_backend, LinearSolver, LinearSystem, SolveInfo};
use crate::element::ElementStencil;
use crate::error::{Result, SolverError};
use crate::filter::DensityFilter;
use crate::materials::Simp;
use crate::mesh::Mesh;
use crate::sensitivity;
use nalgebra::DVector;
use serde::Serialize;
use std::time::Instant;

/// Poisson's ratio of the (single) material.
pub const POISSON_RATIO: f64 = 0.3;

/// Optimization configuration fixed at construction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OptimizationConfig {
    pub volume_fraction: f64,
    pub penalization: f64,
    pub radius_min: f64,
    /// Move limit for the external design update.
    pub move_limit: f64,
}

/// Role of an element in the optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Passivity {
    /// Density is a design variable.
    #[default]
    Active,
    /// Density pinned at 1, excluded from updates.
    Solid,
    /// Density pinned at 0, excluded from updates.
    Void,
}

/// Wall-clock seconds spent in each stage of one optimization step.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageTimings {
    pub filter_s: f64,
    pub interpolation_s: f64,
    pub solve_s: f64,
    pub sensitivity_s: f64,
}

/// Results of one optimization step. The filtered derivative fields stay in
/// the problem state (`stiffness_derivative`, `volume_derivative`).
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Total compliance of the current design.
    pub compliance: f64,
    /// `|rho_physical - rho_physical_prev|_2 / sqrt(num_elements)`, the
    /// convergence signal for the external driver.
    pub change: f64,
    pub timings: StageTimings,
    pub solve_info: SolveInfo,
}

/// Owned state of one topology-optimization problem instance.
pub struct Problem {
    pub mesh: Mesh,
    pub stencil: ElementStencil,
    pub filter: DensityFilter,
    pub simp: Simp,
    pub config: OptimizationConfig,
    /// Effective modulus per element, recomputed every step.
    pub young_moduli: DVector<f64>,
    /// External load restricted to the free DOFs.
    pub forces: DVector<f64>,
    /// Full-length displacement field, zero on fixed DOFs.
    pub displacements: DVector<f64>,
    /// Raw design variables, one per element, in [0, 1].
    pub design_variables: DVector<f64>,
    /// Filtered densities actually driving material stiffness.
    pub design_variables_physical: DVector<f64>,
    /// Physical densities of the previous step, for the change metric.
    pub design_variables_old: DVector<f64>,
    pub passivity: Vec<Passivity>,
    /// Filtered derivative of compliance w.r.t. each raw design variable.
    pub stiffness_derivative: DVector<f64>,
    /// Filtered derivative of the volume constraint.
    pub volume_derivative: DVector<f64>,
    backend: Box<dyn LinearSolver>,
    scratch: DVector<f64>,
}

impl Problem {
    /// Build a problem on an `nx` x `ny` element grid.
    ///
    /// Fails on degenerate dimensions or out-of-range configuration, before
    /// any numeric work happens.
    pub fn new(
        num_elements_x: usize,
        num_elements_y: usize,
        volume_fraction: f64,
        penalization: f64,
        radius_min: f64,
        move_limit: f64,
    ) -> Result<Self> {
        let mesh = Mesh::new(num_elements_x, num_elements_y)?;
        if !(volume_fraction > 0.0 && volume_fraction <= 1.0) {
            return Err(SolverError::Config(format!(
                "volume fraction {} outside (0, 1]",
                volume_fraction
            )));
        }
        if !(penalization >= 1.0) {
            return Err(SolverError::Config(format!(
                "penalization {} below 1",
                penalization
            )));
        }
        if !(move_limit > 0.0 && move_limit <= 1.0) {
            return Err(SolverError::Config(format!(
                "move limit {} outside (0, 1]",
                move_limit
            )));
        }

        let num_elements = mesh.num_elements;
        let filter = DensityFilter::new(num_elements_x, num_elements_y, radius_min)?;
        let simp = Simp::new(penalization);

        let mut forces = DVector::zeros(mesh.free_dofs.len());
        if let Some(position) = mesh.dof_to_free[mesh.load_dof()] {
            forces[position] = -1.0;
        }

        // A uniform field passes through the filter unchanged, so the
        // physical densities start equal to the raw ones.
        let design_variables = DVector::from_element(num_elements, volume_fraction);
        let design_variables_physical = design_variables.clone();
        let design_variables_old = design_variables.clone();

        Ok(Self {
            young_moduli: DVector::from_element(num_elements, simp.youngs_modulus(1.0)),
            displacements: DVector::zeros(mesh.num_dofs),
            stiffness_derivative: DVector::zeros(num_elements),
            volume_derivative: DVector::zeros(num_elements),
            scratch: DVector::zeros(num_elements),
            passivity: vec![Passivity::Active; num_elements],
            design_variables,
            design_variables_physical,
            design_variables_old,
            forces,
            backend: default_backend(),
            mesh,
            stencil: ElementStencil::new(POISSON_RATIO),
            filter,
            simp,
            config: OptimizationConfig {
                volume_fraction,
                penalization,
                radius_min,
                move_limit,
            },
        })
    }

    /// Declare passive element sets. The sets must be disjoint and inside
    /// the element range; physical densities are pinned immediately and
    /// re-pinned on every subsequent step.
    pub fn set_passive(&mut self, solid: &[usize], void: &[usize]) -> Result<()> {
        let mut roles = vec![Passivity::Active; self.mesh.num_elements];
        for (&element, role) in solid
            .iter()
            .map(|e| (e, Passivity::Solid))
            .chain(void.iter().map(|e| (e, Passivity::Void)))
        {
            if element >= self.mesh.num_elements {
                return Err(SolverError::Config(format!(
                    "passive element {} outside mesh with {} elements",
                    element, self.mesh.num_elements
                )));
            }
            if roles[element] != Passivity::Active {
                return Err(SolverError::Config(format!(
                    "passive element {} listed in both sets",
                    element
                )));
            }
            roles[element] = role;
        }
        self.passivity = roles;
        self.pin_passive();
        Ok(())
    }

    /// Install an initial raw design field (one value per element, in the
    /// mesh's column-major element order) and refresh the physical field.
    pub fn load_densities(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.mesh.num_elements {
            return Err(SolverError::Config(format!(
                "density field has {} values for {} elements",
                values.len(),
                self.mesh.num_elements
            )));
        }
        if let Some(position) = values.iter().position(|v| !(0.0..=1.0).contains(v)) {
            return Err(SolverError::Config(format!(
                "density {} at element {} outside [0, 1]",
                values[position], position
            )));
        }
        self.design_variables.copy_from_slice(values);
        self.forward_filter();
        self.design_variables_old
            .copy_from(&self.design_variables_physical);
        Ok(())
    }

    /// Equilibrium-only entry point: solve at a fully solid design.
    pub fn solve(&mut self) -> Result<SolveInfo> {
        self.young_moduli.fill(self.simp.youngs_modulus(1.0));
        self.solve_equilibrium()
    }

    /// One optimization step: forward filter, SIMP interpolation,
    /// equilibrium solve, sensitivity analysis, adjoint filter.
    pub fn optimization_step(&mut self) -> Result<StepOutput> {
        let mut timings = StageTimings::default();

        let started = Instant::now();
        self.forward_filter();
        let change = self.density_change();
        self.design_variables_old
            .copy_from(&self.design_variables_physical);
        timings.filter_s = started.elapsed().as_secs_f64();

        let started = Instant::now();
        for e in 0..self.mesh.num_elements {
            self.young_moduli[e] = self
                .simp
                .youngs_modulus(self.design_variables_physical[e]);
        }
        timings.interpolation_s = started.elapsed().as_secs_f64();

        let started = Instant::now();
        let solve_info = self.solve_equilibrium()?;
        timings.solve_s = started.elapsed().as_secs_f64();

        let started = Instant::now();
        let energies =
            sensitivity::element_strain_energies(&self.mesh, &self.stencil, &self.displacements);
        let compliance = sensitivity::compliance(&self.young_moduli, &energies);

        sensitivity::compliance_derivative(
            &self.design_variables_physical,
            &energies,
            &self.simp,
            &mut self.scratch,
        );
        self.filter
            .apply_adjoint(&self.scratch, &mut self.stiffness_derivative);

        let volume_sensitivity =
            1.0 / (self.mesh.num_elements as f64 * self.config.volume_fraction);
        for (e, value) in self.scratch.iter_mut().enumerate() {
            *value = match self.passivity[e] {
                Passivity::Active => volume_sensitivity,
                Passivity::Solid | Passivity::Void => 0.0,
            };
        }
        self.filter
            .apply_adjoint(&self.scratch, &mut self.volume_derivative);
        timings.sensitivity_s = started.elapsed().as_secs_f64();

        Ok(StepOutput {
            compliance,
            change,
            timings,
            solve_info,
        })
    }

    /// Assemble the free-DOF system at the current moduli, factorize, solve
    /// and scatter into the full displacement field.
    fn solve_equilibrium(&mut self) -> Result<SolveInfo> {
        let values = scaled_element_values(&self.stencil, &self.young_moduli);
        let stiffness = assemble_free_system(&self.mesh, &values);
        let system = LinearSystem {
            stiffness,
            rhs: self.forces.clone(),
        };
        let (free_displacements, info) = self.backend.solve_linear(&system)?;

        self.displacements.fill(0.0);
        for (position, &dof) in self.mesh.free_dofs.iter().enumerate() {
            self.displacements[dof] = free_displacements[position];
        }
        Ok(info)
    }

    /// Raw -> physical densities; passive elements keep their pinned value
    /// instead of the filtered one.
    fn forward_filter(&mut self) {
        self.filter.apply(&self.design_variables, &mut self.scratch);
        for e in 0..self.mesh.num_elements {
            self.design_variables_physical[e] = match self.passivity[e] {
                Passivity::Active => self.scratch[e],
                Passivity::Solid => 1.0,
                Passivity::Void => 0.0,
            };
        }
    }

    fn pin_passive(&mut self) {
        for e in 0..self.mesh.num_elements {
            match self.passivity[e] {
                Passivity::Active => {}
                Passivity::Solid => self.design_variables_physical[e] = 1.0,
                Passivity::Void => self.design_variables_physical[e] = 0.0,
            }
        }
    }

    fn density_change(&self) -> f64 {
        let sum_squared: f64 = self
            .design_variables_physical
            .iter()
            .zip(self.design_variables_old.iter())
            .map(|(new, old)| (new - old) * (new - old))
            .sum();
        (sum_squared / self.mesh.num_elements as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            Problem::new(0, 4, 0.5, 3.0, 1.5, 0.2),
            Err(SolverError::InvalidMesh(0, 4))
        ));
        assert!(matches!(
            Problem::new(4, 4, 0.0, 3.0, 1.5, 0.2),
            Err(SolverError::Config(_))
        ));
        assert!(matches!(
            Problem::new(4, 4, 0.5, 0.5, 1.5, 0.2),
            Err(SolverError::Config(_))
        ));
        assert!(matches!(
            Problem::new(4, 4, 0.5, 3.0, -1.0, 0.2),
            Err(SolverError::Config(_))
        ));
        assert!(matches!(
            Problem::new(4, 4, 0.5, 3.0, 1.5, 0.0),
            Err(SolverError::Config(_))
        ));
    }

    #[test]
    fn solve_zeroes_fixed_dofs() {
        let mut problem = Problem::new(4, 3, 0.5, 3.0, 1.5, 0.2).unwrap();
        problem.solve().unwrap();
        for dof in 0..problem.mesh.num_dofs {
            if problem.mesh.dof_to_free[dof].is_none() {
                assert_eq!(problem.displacements[dof], 0.0, "fixed DOF {}", dof);
            }
        }
        // The load pushes the tip down.
        assert!(problem.displacements[problem.mesh.load_dof()] < 0.0);
    }

    #[test]
    fn passive_sets_must_be_disjoint_and_in_range() {
        let mut problem = Problem::new(3, 3, 0.5, 3.0, 1.5, 0.2).unwrap();
        assert!(matches!(
            problem.set_passive(&[2], &[2]),
            Err(SolverError::Config(_))
        ));
        assert!(matches!(
            problem.set_passive(&[9], &[]),
            Err(SolverError::Config(_))
        ));
        problem.set_passive(&[0], &[8]).unwrap();
        assert_eq!(problem.design_variables_physical[0], 1.0);
        assert_eq!(problem.design_variables_physical[8], 0.0);
    }

    #[test]
    fn passive_elements_stay_pinned_through_steps() {
        let mut problem = Problem::new(4, 4, 0.5, 3.0, 1.5, 0.2).unwrap();
        problem.set_passive(&[3], &[12]).unwrap();
        problem.optimization_step().unwrap();
        assert_eq!(problem.design_variables_physical[3], 1.0);
        assert_eq!(problem.design_variables_physical[12], 0.0);
    }

    #[test]
    fn load_densities_validates_shape_and_range() {
        let mut problem = Problem::new(2, 2, 0.5, 3.0, 1.5, 0.2).unwrap();
        assert!(matches!(
            problem.load_densities(&[0.5; 3]),
            Err(SolverError::Config(_))
        ));
        assert!(matches!(
            problem.load_densities(&[0.5, 0.5, 1.5, 0.5]),
            Err(SolverError::Config(_))
        ));
        problem.load_densities(&[0.1, 0.9, 0.4, 0.6]).unwrap();
        assert_eq!(problem.design_variables[1], 0.9);
    }

    #[test]
    fn derivatives_have_descent_sign() {
        let mut problem = Problem::new(6, 4, 0.4, 3.0, 1.5, 0.2).unwrap();
        problem.optimization_step().unwrap();
        for e in 0..problem.mesh.num_elements {
            assert!(
                problem.stiffness_derivative[e] <= 0.0,
                "element {} derivative {}",
                e,
                problem.stiffness_derivative[e]
            );
            assert!(problem.volume_derivative[e] > 0.0);
        }
    }
}
