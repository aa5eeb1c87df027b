//! Stiffness stencil for the bilinear plane-stress quadrilateral element.
//!
//! The element matrix of a unit-square Q4 element with unit Young's modulus
//! is mesh-independent, so its 36 distinct entries (one symmetric half of the
//! 8x8 matrix) are built once from two closed-form coefficient tables and a
//! Poisson's ratio. Everything downstream works either with the flat 36-entry
//! form (sparse assembly) or with the expanded 8x8 matrix (sensitivity
//! analysis).

use nalgebra::SMatrix;

/// Row index of the k-th entry in the symmetric half of an 8x8 matrix,
/// enumerated column by column, diagonal included.
pub const TRIANGLE_ROWS: [usize; 36] = [
    0, 1, 2, 3, 4, 5, 6, 7, 1, 2, 3, 4, 5, 6, 7, 2, 3, 4, 5, 6, 7, 3, 4, 5, 6, 7, 4, 5, 6, 7, 5,
    6, 7, 6, 7, 7,
];

/// Column index matching [`TRIANGLE_ROWS`].
pub const TRIANGLE_COLS: [usize; 36] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 4, 4, 4, 4, 5,
    5, 5, 6, 6, 7,
];

/// Poisson-independent part of the stencil coefficients.
const COEFFICIENTS_1: [f64; 36] = [
    12.0, 3.0, -6.0, -3.0, -6.0, -3.0, 0.0, 3.0, 12.0, 3.0, 0.0, -3.0, -6.0, -3.0, -6.0, 12.0,
    -3.0, 0.0, -3.0, -6.0, 3.0, 12.0, 3.0, -6.0, 3.0, -6.0, 12.0, 3.0, -6.0, -3.0, 12.0, 3.0, 0.0,
    12.0, -3.0, 12.0,
];

/// Part of the stencil coefficients scaled by Poisson's ratio.
const COEFFICIENTS_2: [f64; 36] = [
    -4.0, 3.0, -2.0, 9.0, 2.0, -3.0, 4.0, -9.0, -4.0, -9.0, 4.0, -3.0, 2.0, 9.0, -2.0, -4.0, -3.0,
    4.0, 9.0, 2.0, 3.0, -4.0, -9.0, -2.0, 3.0, 2.0, -4.0, 3.0, -2.0, 9.0, -4.0, -9.0, 4.0, -4.0,
    -3.0, -4.0,
];

/// Unit-modulus stiffness stencil of the Q4 plane-stress element.
#[derive(Debug, Clone)]
pub struct ElementStencil {
    /// The 36 entries of the symmetric half, in [`TRIANGLE_ROWS`] /
    /// [`TRIANGLE_COLS`] order.
    pub values: [f64; 36],
    /// The symmetric 8x8 expansion of `values`.
    pub matrix: SMatrix<f64, 8, 8>,
}

impl ElementStencil {
    /// Build the stencil for a given Poisson's ratio.
    pub fn new(poisson_ratio: f64) -> Self {
        let scale = 1.0 / (24.0 * (1.0 - poisson_ratio * poisson_ratio));
        let mut values = [0.0; 36];
        for k in 0..36 {
            values[k] = scale * (COEFFICIENTS_1[k] + poisson_ratio * COEFFICIENTS_2[k]);
        }

        let mut matrix = SMatrix::<f64, 8, 8>::zeros();
        for k in 0..36 {
            let (i, j) = (TRIANGLE_ROWS[k], TRIANGLE_COLS[k]);
            matrix[(i, j)] = values[k];
            matrix[(j, i)] = values[k];
        }

        Self { values, matrix }
    }
}
