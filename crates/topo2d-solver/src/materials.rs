//! SIMP material interpolation.
//!
//! Maps a physical density in [0, 1] to an effective Young's modulus via
//! power-law penalization. The small modulus floor keeps the assembled
//! stiffness matrix positive definite when elements approach zero density.

use serde::Serialize;

/// Power-law material interpolation parameters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Simp {
    /// Modulus floor for void material.
    pub modulus_min: f64,
    /// Modulus of fully solid material.
    pub modulus_max: f64,
    /// Penalization exponent.
    pub penalization: f64,
}

impl Simp {
    pub fn new(penalization: f64) -> Self {
        Self {
            modulus_min: 1e-9,
            modulus_max: 1.0,
            penalization,
        }
    }

    /// Effective Young's modulus at physical density `rho`.
    pub fn youngs_modulus(&self, rho: f64) -> f64 {
        self.modulus_min + rho.powf(self.penalization) * (self.modulus_max - self.modulus_min)
    }

    /// Derivative of the effective modulus with respect to density.
    pub fn modulus_derivative(&self, rho: f64) -> f64 {
        self.penalization
            * rho.powf(self.penalization - 1.0)
            * (self.modulus_max - self.modulus_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        let simp = Simp::new(3.0);
        assert_eq!(simp.youngs_modulus(1.0), simp.modulus_max);
        assert_eq!(simp.youngs_modulus(0.0), simp.modulus_min);
    }

    #[test]
    fn penalization_is_monotonic_below_one() {
        // Raising the exponent strictly lowers the modulus for rho < 1.
        for rho in [0.2, 0.5, 0.9] {
            let soft = Simp::new(2.0).youngs_modulus(rho);
            let hard = Simp::new(3.0).youngs_modulus(rho);
            let harder = Simp::new(4.0).youngs_modulus(rho);
            assert!(hard < soft, "rho {}", rho);
            assert!(harder < hard, "rho {}", rho);
        }
        // At rho = 1 the exponent is irrelevant.
        assert_eq!(
            Simp::new(2.0).youngs_modulus(1.0),
            Simp::new(5.0).youngs_modulus(1.0)
        );
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let simp = Simp::new(3.0);
        let rho = 0.6;
        let h = 1e-7;
        let numeric = (simp.youngs_modulus(rho + h) - simp.youngs_modulus(rho - h)) / (2.0 * h);
        assert!((simp.modulus_derivative(rho) - numeric).abs() < 1e-6);
    }
}
