//! Structural modal solve `K φ = ω² M φ`.

use crate::error::{StructureError, StructureResult};
use af_core::units::{Frequency, radps, to_hz};
use nalgebra::{DMatrix, SymmetricEigen};
use tracing::debug;

/// Lowest modes of a structure, mass-normalized (`φᵀ M φ = 1`).
#[derive(Debug, Clone)]
pub struct ModalSolution {
    /// Angular frequencies (rad/s), ascending
    pub omega: Vec<f64>,
    /// One column per mode
    pub shapes: DMatrix<f64>,
}

impl ModalSolution {
    pub fn len(&self) -> usize {
        self.omega.len()
    }

    pub fn is_empty(&self) -> bool {
        self.omega.is_empty()
    }

    pub fn frequency(&self, mode: usize) -> Option<Frequency> {
        self.omega.get(mode).map(|w| to_hz(radps(*w)))
    }
}

/// Solve the symmetric generalized eigenproblem through a Cholesky
/// reduction of `M` and keep the `count` lowest modes.
pub fn solve_modes(
    stiffness: &DMatrix<f64>,
    mass: &DMatrix<f64>,
    count: usize,
) -> StructureResult<ModalSolution> {
    let n = stiffness.nrows();
    let fail = |what: String| StructureError::ModalFailure { what };
    if stiffness.shape() != (n, n) || mass.shape() != (n, n) {
        return Err(fail(format!(
            "operators must be square and equal in size, got {:?} and {:?}",
            stiffness.shape(),
            mass.shape()
        )));
    }
    if count == 0 || count > n {
        return Err(fail(format!("cannot extract {count} modes from {n} dofs")));
    }

    let chol = mass
        .clone()
        .cholesky()
        .ok_or_else(|| fail("mass matrix is not positive definite".to_string()))?;
    let l = chol.l();

    // K̃ = L⁻¹ K L⁻ᵀ, using the symmetry of K for the second solve.
    let x = l
        .solve_lower_triangular(stiffness)
        .ok_or_else(|| fail("triangular solve failed".to_string()))?;
    let k_tilde = l
        .solve_lower_triangular(&x.transpose())
        .ok_or_else(|| fail("triangular solve failed".to_string()))?;
    let k_sym = (&k_tilde + k_tilde.transpose()) * 0.5;

    let eig = SymmetricEigen::new(k_sym);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

    let mut omega = Vec::with_capacity(count);
    let mut shapes = DMatrix::zeros(n, count);
    for (col, &idx) in order.iter().take(count).enumerate() {
        let lambda = eig.eigenvalues[idx];
        if !lambda.is_finite() {
            return Err(fail(format!("non-finite eigenvalue for mode {col}")));
        }
        omega.push(lambda.max(0.0).sqrt());

        let v = eig.eigenvectors.column(idx).into_owned();
        let mut phi = l
            .tr_solve_lower_triangular(&v)
            .ok_or_else(|| fail("back substitution failed".to_string()))?;

        // Sign convention: largest component positive.
        let pivot = phi.iamax();
        if phi[pivot] < 0.0 {
            phi.neg_mut();
        }
        shapes.set_column(col, &phi);
    }

    debug!(dofs = n, modes = count, omega_min = omega[0], "structural modes solved");
    Ok(ModalSolution { omega, shapes })
}
