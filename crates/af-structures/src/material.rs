//! Isotropic linear-elastic material.

use crate::error::{StructureError, StructureResult};
use af_core::units::{Density, Pressure, kgpm3, pa};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotropicMaterial {
    /// Young's modulus
    pub e: Pressure,
    /// Poisson's ratio
    pub nu: f64,
    pub rho: Density,
}

impl Default for IsotropicMaterial {
    fn default() -> Self {
        Self::aluminium()
    }
}

impl IsotropicMaterial {
    pub fn new(e: Pressure, nu: f64, rho: Density) -> StructureResult<Self> {
        let invalid = |what: String| Err(StructureError::InvalidMaterial { what });
        if !(e.value.is_finite() && e.value > 0.0) {
            return invalid(format!("Young's modulus must be positive, got {} Pa", e.value));
        }
        if !(nu > -1.0 && nu < 0.5) {
            return invalid(format!("Poisson's ratio must lie in (-1, 0.5), got {nu}"));
        }
        if !(rho.value.is_finite() && rho.value > 0.0) {
            return invalid(format!("density must be positive, got {} kg/m^3", rho.value));
        }
        Ok(Self { e, nu, rho })
    }

    /// 2024-T3-like aluminium.
    pub fn aluminium() -> Self {
        Self {
            e: pa(72.0e9),
            nu: 0.33,
            rho: kgpm3(2.8e3),
        }
    }

    /// `E / (2 (1 + ν))`
    pub fn shear_modulus(&self) -> Pressure {
        self.e / (2.0 * (1.0 + self.nu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(IsotropicMaterial::new(pa(72e9), 0.33, kgpm3(2800.0)).is_ok());
        assert!(IsotropicMaterial::new(pa(0.0), 0.33, kgpm3(2800.0)).is_err());
        assert!(IsotropicMaterial::new(pa(72e9), 0.5, kgpm3(2800.0)).is_err());
        assert!(IsotropicMaterial::new(pa(72e9), 0.3, kgpm3(-1.0)).is_err());
    }

    #[test]
    fn shear_modulus_of_aluminium() {
        let g = IsotropicMaterial::aluminium().shear_modulus();
        assert!((g.value - 72e9 / 2.66).abs() < 1.0);
    }
}
