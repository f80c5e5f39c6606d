//! Eigenvalue and flutter-velocity sensitivities.
//!
//! For `A x = λ B x` with left eigenvector `y`:
//!
//! ```text
//! dλ/dp  = yᵀ (dA/dp − λ dB/dp) x / yᵀ B x
//! dV*/dp = −(∂ real λ / ∂p) / (∂ real λ / ∂V)
//! ```
//!
//! The modal basis is held fixed.

use crate::error::{FlutterError, FlutterResult};
use crate::operators::{OperatorAssembler, ReducedOperatorBuilder, ReducedOperatorPair};
use crate::roots::{C64, EigenPair, FlutterRoot, RootSensitivity, SlopeSource, complexify};
use af_core::ParamId;
use nalgebra::DMatrix;
use tracing::debug;

/// `dλ/dp` for one eigenpair given projected operator derivatives.
pub fn eigenvalue_sensitivity(
    pair: &EigenPair,
    b: &DMatrix<f64>,
    derivative: &ReducedOperatorPair,
) -> FlutterResult<C64> {
    let left = pair.left.as_ref().ok_or_else(|| FlutterError::StaleRoot {
        what: "root has no left eigenvector".to_string(),
    })?;
    let n = pair.right.len();
    if derivative.a.shape() != (n, n) || derivative.b.shape() != (n, n) || b.shape() != (n, n) {
        return Err(FlutterError::DimensionMismatch {
            what: "operator derivative size",
            expected: n,
            found: derivative.a.nrows(),
        });
    }

    let x = &pair.right;
    let da = complexify(&derivative.a);
    let db = complexify(&derivative.b);
    let numerator = left.dot(&(da * x - (db * x) * pair.value));
    let denominator = left.dot(&(complexify(b) * x));
    if denominator.norm() <= f64::EPSILON {
        return Err(FlutterError::Numeric {
            what: "left and right eigenvectors are B-orthogonal".to_string(),
        });
    }
    Ok(numerator / denominator)
}

/// Implicit differentiation of `real λ(V*, p) = 0`.
pub fn velocity_sensitivity(eigenvalue_derivative: C64, growth_slope: f64) -> FlutterResult<f64> {
    if !(growth_slope.is_finite() && growth_slope.abs() > f64::EPSILON) {
        return Err(FlutterError::Numeric {
            what: format!("growth rate slope {growth_slope} is not usable for implicit differentiation"),
        });
    }
    let dv = -eigenvalue_derivative.re / growth_slope;
    if dv.is_finite() {
        Ok(dv)
    } else {
        Err(FlutterError::Numeric {
            what: "flutter velocity sensitivity is not finite".to_string(),
        })
    }
}

/// Sensitivities of a converged root through the reduced-operator builder.
///
/// Deterministic: no iteration, only derivative assembly and projection at
/// `V*`.
pub struct SensitivityEngine<'b, 'a, A: OperatorAssembler + ?Sized> {
    builder: &'b ReducedOperatorBuilder<'a, A>,
}

impl<'b, 'a, A: OperatorAssembler + ?Sized> SensitivityEngine<'b, 'a, A> {
    pub fn new(builder: &'b ReducedOperatorBuilder<'a, A>) -> Self {
        Self { builder }
    }

    /// `∂ real λ / ∂V` at the root: analytic when the assembler supplies
    /// velocity derivatives, otherwise the bisection finite difference.
    pub fn growth_slope(&self, root: &FlutterRoot) -> FlutterResult<(f64, SlopeSource)> {
        if let Some(d) = self.builder.build_velocity_sensitivity(root.velocity)? {
            let slope = eigenvalue_sensitivity(&root.pair, &root.b, &d)?.re;
            return Ok((slope, SlopeSource::Analytic));
        }
        root.growth_slope
            .map(|s| (s, SlopeSource::FiniteDifference))
            .ok_or_else(|| FlutterError::Numeric {
                what: "no velocity slope available for the root".to_string(),
            })
    }

    /// `dλ/dp` and `dV*/dp` for `param`.
    pub fn sensitivity(
        &self,
        root: &FlutterRoot,
        param: ParamId,
        name: &str,
    ) -> FlutterResult<RootSensitivity> {
        if !root.converged {
            return Err(FlutterError::StaleRoot {
                what: format!("root at V = {} did not converge", root.velocity),
            });
        }
        if param == root.velocity_param {
            return Err(FlutterError::StaleRoot {
                what: format!("'{name}' is the search velocity"),
            });
        }

        let derivative = self.builder.build_sensitivity(param, root.velocity)?;
        let eigenvalue = eigenvalue_sensitivity(&root.pair, &root.b, &derivative)?;
        let (growth_slope, slope_source) = self.growth_slope(root)?;
        let velocity = velocity_sensitivity(eigenvalue, growth_slope)?;

        debug!(
            param = name,
            d_lambda_re = eigenvalue.re,
            d_lambda_im = eigenvalue.im,
            growth_slope,
            ?slope_source,
            "root sensitivity"
        );

        Ok(RootSensitivity {
            param,
            name: name.to_string(),
            eigenvalue,
            growth_slope,
            slope_source,
            velocity,
        })
    }
}
