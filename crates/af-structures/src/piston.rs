//! Piston-theory aerodynamics for a surface in supersonic flow along `+x`.
//!
//! Surface pressure, linearized about the mean flow:
//!
//! ```text
//! p = ρ∞ V² / M · f · (∂w/∂x + (1/V) ∂w/∂t)
//! ```
//!
//! with `f = 1` for first order and `f = 1 + (γ + 1)/2 · M · α` for second
//! order theory linearized about a mean incidence `α`. Integrated over a
//! strip of width `b` this adds `b · q · Ĝ` to the stiffness and
//! `b · c · M̂` to the damping, where `q = ρ∞ V² f / M` and `c = q / V`.

use crate::error::{StructureError, StructureResult};
use af_core::units::{Density, kgpm3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PistonOrder {
    #[default]
    First,
    Second,
}

/// Flow quantities a piston-theory operator depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowQuantity {
    Velocity,
    Mach,
    Density,
    Gamma,
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PistonTheory {
    pub order: PistonOrder,
    pub mach: f64,
    pub rho_air: Density,
    /// Ratio of specific heats
    pub gamma: f64,
    /// Mean incidence (rad)
    pub alpha: f64,
}

impl Default for PistonTheory {
    fn default() -> Self {
        Self {
            order: PistonOrder::First,
            mach: 3.0,
            rho_air: kgpm3(1.05),
            gamma: 1.4,
            alpha: 0.0,
        }
    }
}

impl PistonTheory {
    pub fn new(
        order: PistonOrder,
        mach: f64,
        rho_air: Density,
        gamma: f64,
        alpha: f64,
    ) -> StructureResult<Self> {
        let invalid = |what: String| Err(StructureError::InvalidFlow { what });
        if !(mach.is_finite() && mach > 1.0) {
            return invalid(format!("piston theory needs supersonic flow, got M = {mach}"));
        }
        if !(rho_air.value.is_finite() && rho_air.value > 0.0) {
            return invalid(format!("air density must be positive, got {}", rho_air.value));
        }
        if !(gamma.is_finite() && gamma > 1.0) {
            return invalid(format!("gamma must exceed 1, got {gamma}"));
        }
        if !alpha.is_finite() {
            return invalid("mean incidence must be finite".to_string());
        }
        Ok(Self {
            order,
            mach,
            rho_air,
            gamma,
            alpha,
        })
    }

    /// `f / M`
    fn shape_factor(&self) -> f64 {
        match self.order {
            PistonOrder::First => 1.0 / self.mach,
            PistonOrder::Second => 1.0 / self.mach + 0.5 * (self.gamma + 1.0) * self.alpha,
        }
    }

    /// `∂(f / M) / ∂quantity`; velocity and density do not enter.
    fn d_shape_factor(&self, quantity: FlowQuantity) -> f64 {
        match (quantity, self.order) {
            (FlowQuantity::Mach, _) => -1.0 / (self.mach * self.mach),
            (FlowQuantity::Gamma, PistonOrder::Second) => 0.5 * self.alpha,
            (FlowQuantity::Alpha, PistonOrder::Second) => 0.5 * (self.gamma + 1.0),
            _ => 0.0,
        }
    }

    /// Stiffness gain `q = ρ∞ V² f / M` (Pa per unit slope).
    pub fn stiffness_gain(&self, velocity: f64) -> f64 {
        self.rho_air.value * velocity * velocity * self.shape_factor()
    }

    /// Damping gain `c = ρ∞ V f / M`.
    pub fn damping_gain(&self, velocity: f64) -> f64 {
        self.rho_air.value * velocity * self.shape_factor()
    }

    /// `(∂q/∂s, ∂c/∂s)` for a flow quantity `s`.
    pub fn gain_derivatives(&self, quantity: FlowQuantity, velocity: f64) -> (f64, f64) {
        let rho = self.rho_air.value;
        let g = self.shape_factor();
        match quantity {
            FlowQuantity::Velocity => (2.0 * rho * velocity * g, rho * g),
            FlowQuantity::Density => (velocity * velocity * g, velocity * g),
            other => {
                let dg = self.d_shape_factor(other);
                (rho * velocity * velocity * dg, rho * velocity * dg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn second_order() -> PistonTheory {
        PistonTheory::new(PistonOrder::Second, 2.5, kgpm3(0.9), 1.4, 0.02).unwrap()
    }

    #[test]
    fn first_order_gains() {
        let p = PistonTheory::default();
        assert!((p.stiffness_gain(1000.0) - 1.05 * 1e6 / 3.0).abs() < 1e-6);
        assert!((p.damping_gain(1000.0) - 1.05 * 1e3 / 3.0).abs() < 1e-9);
        assert_eq!(p.gain_derivatives(FlowQuantity::Gamma, 1000.0), (0.0, 0.0));
    }

    #[test]
    fn validation() {
        assert!(PistonTheory::new(PistonOrder::First, 0.8, kgpm3(1.0), 1.4, 0.0).is_err());
        assert!(PistonTheory::new(PistonOrder::First, 2.0, kgpm3(0.0), 1.4, 0.0).is_err());
        assert!(PistonTheory::new(PistonOrder::First, 2.0, kgpm3(1.0), 1.0, 0.0).is_err());
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let base = second_order();
        let v = 800.0;
        let h = 1e-6;

        let perturbed = |q: FlowQuantity, d: f64| {
            let mut p = base;
            let mut vel = v;
            match q {
                FlowQuantity::Velocity => vel += d,
                FlowQuantity::Mach => p.mach += d,
                FlowQuantity::Density => p.rho_air = kgpm3(p.rho_air.value + d),
                FlowQuantity::Gamma => p.gamma += d,
                FlowQuantity::Alpha => p.alpha += d,
            }
            (p.stiffness_gain(vel), p.damping_gain(vel))
        };

        for q in [
            FlowQuantity::Velocity,
            FlowQuantity::Mach,
            FlowQuantity::Density,
            FlowQuantity::Gamma,
            FlowQuantity::Alpha,
        ] {
            let (kp, cp) = perturbed(q, h);
            let (km, cm) = perturbed(q, -h);
            let (dk, dc) = base.gain_derivatives(q, v);
            let fd_k = (kp - km) / (2.0 * h);
            let fd_c = (cp - cm) / (2.0 * h);
            assert!((fd_k - dk).abs() <= 1e-5 * dk.abs().max(1.0), "{q:?}: {fd_k} vs {dk}");
            assert!((fd_c - dc).abs() <= 1e-5 * dc.abs().max(1.0), "{q:?}: {fd_c} vs {dc}");
        }
    }
}
