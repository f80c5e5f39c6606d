//! SI quantity aliases and constructors.

use uom::si::f64::{
    AngularVelocity as UomAngularVelocity, Frequency as UomFrequency, Length as UomLength,
    MassDensity as UomMassDensity, Pressure as UomPressure,
};

// Public canonical unit types (SI, f64)
pub type AngularVelocity = UomAngularVelocity;
pub type Density = UomMassDensity;
pub type Frequency = UomFrequency;
pub type Length = UomLength;
pub type Pressure = UomPressure;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn kgpm3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn radps(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::radian_per_second;
    AngularVelocity::new::<radian_per_second>(v)
}

/// Cyclic frequency in Hz for an angular frequency.
#[inline]
pub fn to_hz(omega: AngularVelocity) -> Frequency {
    use uom::si::frequency::hertz;
    use uom::si::angular_velocity::radian_per_second;
    Frequency::new::<hertz>(omega.get::<radian_per_second>() / (2.0 * core::f64::consts::PI))
}
