//! Density filter over the element grid.
//!
//! A radius-based spatial convolution used in two directions with the same
//! kernel and the same normalization array:
//!
//! - forward, turning raw design variables into physical densities
//!   (convolve, then divide by the per-element weight);
//! - adjoint, turning raw sensitivities into filtered sensitivities
//!   (divide by the per-element weight, then convolve).
//!
//! Using the identical kernel both ways makes the filtered sensitivity the
//! exact derivative of compliance with respect to the raw design variable.
//! The convolution truncates at grid boundaries: kernel taps falling outside
//! the grid are dropped from the sum, and the weights array (the kernel
//! convolved once with an all-ones field) renormalizes accordingly.

use crate::error::{Result, SolverError};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// Precomputed convolution kernel and boundary-aware normalization.
#[derive(Debug, Clone)]
pub struct DensityFilter {
    num_elements_x: usize,
    num_elements_y: usize,
    /// Half-width of the kernel footprint in cells.
    reach: usize,
    /// Square kernel of side `2*ceil(radius) - 1`, radially decaying.
    kernel: DMatrix<f64>,
    /// Kernel convolved with an all-ones field, one entry per element.
    weights: DVector<f64>,
}

impl DensityFilter {
    /// Build the kernel and weights for a filter radius in element units.
    /// The radius must be positive and finite.
    pub fn new(num_elements_x: usize, num_elements_y: usize, radius: f64) -> Result<Self> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SolverError::Config(format!(
                "filter radius {} not positive",
                radius
            )));
        }
        let reach = radius.ceil() as usize - 1;
        let side = 2 * reach + 1;
        let kernel = DMatrix::from_fn(side, side, |i, j| {
            let di = i as f64 - reach as f64;
            let dj = j as f64 - reach as f64;
            (radius - (di * di + dj * dj).sqrt()).max(0.0)
        });

        let mut filter = Self {
            num_elements_x,
            num_elements_y,
            reach,
            kernel,
            weights: DVector::zeros(num_elements_x * num_elements_y),
        };
        let ones = DVector::from_element(num_elements_x * num_elements_y, 1.0);
        let mut weights = DVector::zeros(num_elements_x * num_elements_y);
        filter.convolve(&ones, &mut weights);
        filter.weights = weights;
        Ok(filter)
    }

    /// Boundary-truncated convolution of a density-grid field with the
    /// kernel. Fields are element-major (column-major over the `ny x nx`
    /// grid). Each output cell is independent, so the loop parallelizes
    /// without changing summation order.
    fn convolve(&self, input: &DVector<f64>, output: &mut DVector<f64>) {
        let (nx, ny) = (self.num_elements_x, self.num_elements_y);
        let reach = self.reach as isize;
        let input = input.as_slice();

        output
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(e, out)| {
                let ex = (e / ny) as isize;
                let ey = (e % ny) as isize;
                let mut sum = 0.0;
                for dj in -reach..=reach {
                    let jx = ex + dj;
                    if jx < 0 || jx >= nx as isize {
                        continue;
                    }
                    for di in -reach..=reach {
                        let jy = ey + di;
                        if jy < 0 || jy >= ny as isize {
                            continue;
                        }
                        let tap = self.kernel[((di + reach) as usize, (dj + reach) as usize)];
                        sum += tap * input[jx as usize * ny + jy as usize];
                    }
                }
                *out = sum;
            });
    }

    /// Forward filter: raw design variables to physical densities.
    pub fn apply(&self, raw: &DVector<f64>, physical: &mut DVector<f64>) {
        self.convolve(raw, physical);
        physical.component_div_assign(&self.weights);
    }

    /// Adjoint filter: raw per-element sensitivities to sensitivities with
    /// respect to the raw design variables.
    pub fn apply_adjoint(&self, raw: &DVector<f64>, filtered: &mut DVector<f64>) {
        let scaled = raw.component_div(&self.weights);
        self.convolve(&scaled, filtered);
    }

    /// Per-element normalization array.
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }
}
