//! Structural modal basis.

use crate::error::{FlutterError, FlutterResult};
use crate::roots::{C64, complexify};
use nalgebra::{DMatrix, DVector};

/// Ordered set of structural mode shapes, one column per retained mode.
///
/// Immutable once captured; every mode has the full structural dof count.
#[derive(Debug, Clone)]
pub struct ModalBasis {
    shapes: DMatrix<f64>,
}

impl ModalBasis {
    /// Build a basis from individual mode vectors.
    pub fn new(modes: Vec<DVector<f64>>) -> FlutterResult<Self> {
        let first = modes
            .first()
            .ok_or_else(|| FlutterError::invalid("modal basis must contain at least one mode"))?;
        let ndofs = first.len();
        if ndofs == 0 {
            return Err(FlutterError::invalid("mode shapes must not be empty"));
        }

        for mode in &modes {
            if mode.len() != ndofs {
                return Err(FlutterError::DimensionMismatch {
                    what: "mode shape length",
                    expected: ndofs,
                    found: mode.len(),
                });
            }
            if mode.iter().any(|v| !v.is_finite()) {
                return Err(FlutterError::Numeric {
                    what: "mode shape contains a non-finite entry".to_string(),
                });
            }
        }

        Ok(Self {
            shapes: DMatrix::from_columns(&modes),
        })
    }

    /// Build a basis from a matrix whose columns are the mode shapes.
    pub fn from_columns(shapes: DMatrix<f64>) -> FlutterResult<Self> {
        let modes = shapes.column_iter().map(|c| c.into_owned()).collect();
        Self::new(modes)
    }

    /// Number of retained modes.
    pub fn len(&self) -> usize {
        self.shapes.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.ncols() == 0
    }

    /// Full-order structural dof count.
    pub fn ndofs(&self) -> usize {
        self.shapes.nrows()
    }

    pub fn mode(&self, index: usize) -> Option<DVector<f64>> {
        (index < self.len()).then(|| self.shapes.column(index).into_owned())
    }

    pub fn shapes(&self) -> &DMatrix<f64> {
        &self.shapes
    }

    /// Galerkin projection `Φᵀ K Φ`, i.e. `K_r[i][j] = φ_iᵀ K φ_j`.
    pub fn project(&self, full: &DMatrix<f64>) -> FlutterResult<DMatrix<f64>> {
        let n = self.ndofs();
        if full.nrows() != n || full.ncols() != n {
            return Err(FlutterError::DimensionMismatch {
                what: "full-order operator size",
                expected: n,
                found: if full.nrows() != n {
                    full.nrows()
                } else {
                    full.ncols()
                },
            });
        }
        Ok(self.shapes.transpose() * full * &self.shapes)
    }

    /// Map complex modal amplitudes back to full-order dofs, `Φ q`.
    pub fn expand(&self, reduced: &DVector<C64>) -> FlutterResult<DVector<C64>> {
        if reduced.len() != self.len() {
            return Err(FlutterError::DimensionMismatch {
                what: "reduced vector length",
                expected: self.len(),
                found: reduced.len(),
            });
        }
        Ok(complexify(&self.shapes) * reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_matches_entrywise_definition() {
        let phi0 = DVector::from_vec(vec![1.0, 0.0, 2.0]);
        let phi1 = DVector::from_vec(vec![0.0, 1.0, -1.0]);
        let basis = ModalBasis::new(vec![phi0.clone(), phi1.clone()]).unwrap();

        let k = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0]);
        let kr = basis.project(&k).unwrap();

        assert_eq!(kr.shape(), (2, 2));
        let expected01 = phi0.dot(&(&k * &phi1));
        assert!((kr[(0, 1)] - expected01).abs() < 1e-12);
        let expected11 = phi1.dot(&(&k * &phi1));
        assert!((kr[(1, 1)] - expected11).abs() < 1e-12);
    }

    #[test]
    fn rejects_ragged_modes() {
        let err = ModalBasis::new(vec![DVector::zeros(3), DVector::zeros(4)]).unwrap_err();
        assert!(matches!(err, FlutterError::DimensionMismatch { .. }));
    }

    #[test]
    fn rejects_empty_basis() {
        assert!(ModalBasis::new(Vec::new()).is_err());
    }

    #[test]
    fn expansion_matches_hand_superposition() {
        let basis = ModalBasis::new(vec![
            DVector::from_vec(vec![1.0, 0.0, 2.0]),
            DVector::from_vec(vec![0.0, 1.0, -1.0]),
        ])
        .unwrap();
        let q = DVector::from_vec(vec![C64::new(0.5, 1.0), C64::new(-2.0, 0.25)]);
        let full = basis.expand(&q).unwrap();

        // 0.5+1i times phi0 plus -2+0.25i times phi1
        let expected = [
            C64::new(0.5, 1.0),
            C64::new(-2.0, 0.25),
            C64::new(3.0, 1.75),
        ];
        assert_eq!(full.len(), 3);
        for (got, want) in full.iter().zip(expected) {
            assert!((got - want).norm() < 1e-14, "{got} != {want}");
        }
        assert!(basis.expand(&DVector::zeros(3)).is_err());
    }

    #[test]
    fn project_checks_operator_size() {
        let basis = ModalBasis::from_columns(DMatrix::identity(3, 2)).unwrap();
        assert!(basis.project(&DMatrix::identity(4, 4)).is_err());
    }
}
