//! Euler-Bernoulli beam finite elements.
//!
//! Hermite cubic elements with two dofs per node (transverse displacement
//! `w` and rotation `θ`). Element integrals are evaluated by 4-point Gauss
//! quadrature, exact for every product of shape functions used here.
//!
//! ## Element DOF ordering
//! ```text
//! Node 1: [w1, θ1]
//! Node 2: [w2, θ2]
//! Element DOFs: [w1, θ1, w2, θ2]
//! ```
//!
//! Material and section properties enter as scalar multipliers, so the mesh
//! keeps only "unit" matrices:
//! `K = E I · K̂`, `M = ρ A · M̂`, and the convection operator `Ĝ = ∫ Nᵀ N' dx`
//! used by the aerodynamic model.

use crate::error::{StructureError, StructureResult};
use af_core::units::Length;
use nalgebra::{DMatrix, SMatrix};

/// DOFs per node (transverse displacement + rotation).
pub const DOF_PER_NODE: usize = 2;

/// DOFs per element (2 nodes × 2 DOF/node).
pub const DOF_PER_ELEMENT: usize = 4;

type ElementMatrix = SMatrix<f64, DOF_PER_ELEMENT, DOF_PER_ELEMENT>;

const GAUSS_POINTS: [f64; 4] = [
    -0.861_136_311_594_052_6,
    -0.339_981_043_584_856_3,
    0.339_981_043_584_856_3,
    0.861_136_311_594_052_6,
];
const GAUSS_WEIGHTS: [f64; 4] = [
    0.347_854_845_137_453_8,
    0.652_145_154_862_546_1,
    0.652_145_154_862_546_1,
    0.347_854_845_137_453_8,
];

/// End condition of the beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// `w = 0`, `θ = 0`
    Clamped,
    /// `w = 0`
    Pinned,
    Free,
}

impl Support {
    fn constrained(self) -> &'static [usize] {
        match self {
            Self::Clamped => &[0, 1],
            Self::Pinned => &[0],
            Self::Free => &[],
        }
    }
}

/// Hermite shape functions and their first and second `x` derivatives at
/// local coordinate `xi ∈ [0, 1]`.
fn shape_functions(xi: f64, le: f64) -> ([f64; 4], [f64; 4], [f64; 4]) {
    let xi2 = xi * xi;
    let xi3 = xi2 * xi;
    let n = [
        1.0 - 3.0 * xi2 + 2.0 * xi3,
        le * (xi - 2.0 * xi2 + xi3),
        3.0 * xi2 - 2.0 * xi3,
        le * (-xi2 + xi3),
    ];
    let dn = [
        (-6.0 * xi + 6.0 * xi2) / le,
        1.0 - 4.0 * xi + 3.0 * xi2,
        (6.0 * xi - 6.0 * xi2) / le,
        -2.0 * xi + 3.0 * xi2,
    ];
    let d2n = [
        (-6.0 + 12.0 * xi) / (le * le),
        (-4.0 + 6.0 * xi) / le,
        (6.0 - 12.0 * xi) / (le * le),
        (-2.0 + 6.0 * xi) / le,
    ];
    (n, dn, d2n)
}

/// Unit element matrices `(K̂, M̂, Ĝ)` for an element of length `le`.
pub fn element_matrices(le: f64) -> (ElementMatrix, ElementMatrix, ElementMatrix) {
    let mut k = ElementMatrix::zeros();
    let mut m = ElementMatrix::zeros();
    let mut g = ElementMatrix::zeros();

    for (t, w) in GAUSS_POINTS.iter().zip(GAUSS_WEIGHTS) {
        let xi = 0.5 * (1.0 + t);
        let jw = 0.5 * w * le;
        let (n, dn, d2n) = shape_functions(xi, le);
        for i in 0..DOF_PER_ELEMENT {
            for j in 0..DOF_PER_ELEMENT {
                k[(i, j)] += jw * d2n[i] * d2n[j];
                m[(i, j)] += jw * n[i] * n[j];
                g[(i, j)] += jw * n[i] * dn[j];
            }
        }
    }
    (k, m, g)
}

/// Unit operators on the unconstrained dofs.
#[derive(Debug, Clone)]
pub struct UnitMatrices {
    /// `∫ N''ᵀ N'' dx`
    pub stiffness: DMatrix<f64>,
    /// `∫ Nᵀ N dx`
    pub mass: DMatrix<f64>,
    /// `∫ Nᵀ N' dx`
    pub convection: DMatrix<f64>,
}

/// Uniform line mesh of beam elements.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamMesh {
    length: Length,
    elements: usize,
    left: Support,
    right: Support,
}

impl BeamMesh {
    pub fn new(length: Length, elements: usize, left: Support, right: Support) -> StructureResult<Self> {
        if !(length.value.is_finite() && length.value > 0.0) {
            return Err(StructureError::InvalidGeometry {
                what: format!("beam length must be positive, got {} m", length.value),
            });
        }
        if elements == 0 {
            return Err(StructureError::InvalidGeometry {
                what: "beam mesh needs at least one element".to_string(),
            });
        }
        Ok(Self {
            length,
            elements,
            left,
            right,
        })
    }

    pub fn length(&self) -> Length {
        self.length
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn supports(&self) -> (Support, Support) {
        (self.left, self.right)
    }

    pub fn element_length(&self) -> f64 {
        self.length.value / self.elements as f64
    }

    pub fn node_count(&self) -> usize {
        self.elements + 1
    }

    /// All dofs before boundary conditions.
    pub fn total_dofs(&self) -> usize {
        self.node_count() * DOF_PER_NODE
    }

    /// Dofs left after removing the constrained ones, in global order.
    pub fn free_dofs(&self) -> Vec<usize> {
        let last = (self.node_count() - 1) * DOF_PER_NODE;
        let mut constrained: Vec<usize> = self.left.constrained().to_vec();
        constrained.extend(self.right.constrained().iter().map(|d| last + d));
        (0..self.total_dofs())
            .filter(|d| !constrained.contains(d))
            .collect()
    }

    /// Node coordinate (m) of every free transverse-displacement dof, with
    /// its position in the free-dof vector.
    pub fn displacement_dofs(&self) -> Vec<(usize, f64)> {
        let le = self.element_length();
        self.free_dofs()
            .iter()
            .enumerate()
            .filter(|(_, d)| *d % DOF_PER_NODE == 0)
            .map(|(i, d)| (i, (d / DOF_PER_NODE) as f64 * le))
            .collect()
    }

    /// Assemble global unit matrices and remove constrained dofs.
    pub fn unit_matrices(&self) -> StructureResult<UnitMatrices> {
        let n = self.total_dofs();
        let le = self.element_length();
        let (ke, me, ge) = element_matrices(le);

        let mut k = DMatrix::zeros(n, n);
        let mut m = DMatrix::zeros(n, n);
        let mut g = DMatrix::zeros(n, n);
        for e in 0..self.elements {
            let offset = e * DOF_PER_NODE;
            for i in 0..DOF_PER_ELEMENT {
                for j in 0..DOF_PER_ELEMENT {
                    k[(offset + i, offset + j)] += ke[(i, j)];
                    m[(offset + i, offset + j)] += me[(i, j)];
                    g[(offset + i, offset + j)] += ge[(i, j)];
                }
            }
        }

        let free = self.free_dofs();
        if free.is_empty() {
            return Err(StructureError::InvalidGeometry {
                what: "every dof is constrained".to_string(),
            });
        }
        let reduce = |full: &DMatrix<f64>| {
            DMatrix::from_fn(free.len(), free.len(), |i, j| full[(free[i], free[j])])
        };
        Ok(UnitMatrices {
            stiffness: reduce(&k),
            mass: reduce(&m),
            convection: reduce(&g),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_core::units::m;

    #[test]
    fn element_matrices_match_closed_form() {
        let le = 0.5;
        let (k, mass, g) = element_matrices(le);

        assert!((k[(0, 0)] - 12.0 / le.powi(3)).abs() < 1e-9);
        assert!((k[(0, 1)] - 6.0 / le.powi(2)).abs() < 1e-9);
        assert!((k[(1, 1)] - 4.0 / le).abs() < 1e-9);
        assert!((k[(1, 3)] - 2.0 / le).abs() < 1e-9);

        assert!((mass[(0, 0)] - 156.0 * le / 420.0).abs() < 1e-12);
        assert!((mass[(0, 2)] - 54.0 * le / 420.0).abs() < 1e-12);
        assert!((mass[(1, 1)] - 4.0 * le.powi(3) / 420.0).abs() < 1e-12);

        // ∫ N1 N1' dx = -1/2 and ∫ N1 N3' dx = 1/2
        assert!((g[(0, 0)] + 0.5).abs() < 1e-12);
        assert!((g[(0, 2)] - 0.5).abs() < 1e-12);
        assert!(k.relative_eq(&k.transpose(), 1e-12, 1e-12));
        assert!(mass.relative_eq(&mass.transpose(), 1e-12, 1e-12));
    }

    #[test]
    fn convection_is_skew_up_to_boundary_terms() {
        // G + Gᵀ = [N Nᵀ] evaluated at the element ends.
        let (_, _, g) = element_matrices(0.3);
        let s = g + g.transpose();
        assert!((s[(0, 0)] + 1.0).abs() < 1e-12);
        assert!((s[(2, 2)] - 1.0).abs() < 1e-12);
        assert!(s[(1, 1)].abs() < 1e-12);
        assert!(s[(0, 2)].abs() < 1e-12);
    }

    #[test]
    fn boundary_conditions_remove_dofs() {
        let mesh = BeamMesh::new(m(10.0), 4, Support::Clamped, Support::Pinned).unwrap();
        assert_eq!(mesh.total_dofs(), 10);
        assert_eq!(mesh.free_dofs(), vec![2, 3, 4, 5, 6, 7, 9]);

        let units = mesh.unit_matrices().unwrap();
        assert_eq!(units.stiffness.nrows(), 7);
        assert_eq!(mesh.displacement_dofs(), vec![(0, 2.5), (2, 5.0), (4, 7.5)]);
    }

    #[test]
    fn total_mass_is_recovered() {
        // Rigid translation w = 1 has θ = 0; wᵀ M̂ w equals the length.
        let mesh = BeamMesh::new(m(3.0), 6, Support::Free, Support::Free).unwrap();
        let units = mesh.unit_matrices().unwrap();
        let ones = nalgebra::DVector::from_fn(mesh.total_dofs(), |i, _| {
            if i % DOF_PER_NODE == 0 { 1.0 } else { 0.0 }
        });
        assert!(((ones.transpose() * &units.mass * &ones)[(0, 0)] - 3.0).abs() < 1e-12);
        assert!((&units.stiffness * &ones).norm() < 1e-9);
    }

    #[test]
    fn invalid_meshes() {
        assert!(BeamMesh::new(m(0.0), 4, Support::Clamped, Support::Clamped).is_err());
        assert!(BeamMesh::new(m(1.0), 0, Support::Clamped, Support::Clamped).is_err());
    }
}
