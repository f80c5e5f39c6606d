//! Solid rectangular beam section.

use crate::error::{StructureError, StructureResult};
use af_core::units::{Length, m};

/// Rectangular section: `thy` is the thickness in the bending plane, `thz`
/// the width exposed to the flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangularSection {
    pub thy: Length,
    pub thz: Length,
}

impl Default for RectangularSection {
    fn default() -> Self {
        Self::thin_strip()
    }
}

impl RectangularSection {
    pub fn new(thy: Length, thz: Length) -> StructureResult<Self> {
        for (name, v) in [("thy", thy.value), ("thz", thz.value)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(StructureError::InvalidGeometry {
                    what: format!("section dimension {name} must be positive, got {v} m"),
                });
            }
        }
        Ok(Self { thy, thz })
    }

    pub fn thin_strip() -> Self {
        Self {
            thy: m(0.06),
            thz: m(1.0),
        }
    }

    /// `A = thy · thz` (m²)
    pub fn area(&self) -> f64 {
        self.thy.value * self.thz.value
    }

    /// `I = thz · thy³ / 12` (m⁴)
    pub fn inertia(&self) -> f64 {
        self.thz.value * self.thy.value.powi(3) / 12.0
    }

    pub fn d_area_d_thy(&self) -> f64 {
        self.thz.value
    }

    pub fn d_area_d_thz(&self) -> f64 {
        self.thy.value
    }

    pub fn d_inertia_d_thy(&self) -> f64 {
        self.thz.value * self.thy.value.powi(2) / 4.0
    }

    pub fn d_inertia_d_thz(&self) -> f64 {
        self.thy.value.powi(3) / 12.0
    }
}
