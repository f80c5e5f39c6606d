//! Generalized eigenproblem adapter.
//!
//! Solves `A x = λ B x` for real `A`, `B`: eigenvalues from the real Schur
//! form of `B⁻¹A`, eigenvectors by shifted inverse iteration on the pencil,
//! then normalized so that `xᵀ B x = 1` and `yᵀ B x = 1`.
//!
//! Eigenvalues that coincide within `cluster_tol` share an eigenspace; each
//! member's iteration is deflated against the vectors already found for the
//! cluster so the returned vectors span it.

use crate::error::{FlutterError, FlutterResult};
use crate::operators::ReducedOperatorPair;
use crate::roots::{C64, EigenPair, RootSet, complexify};
use nalgebra::{DMatrix, DVector, Dyn, LU, Schur};
use std::cmp::Ordering;

/// Ordering of eigenpairs within a root set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootOrdering {
    /// Least stable first.
    #[default]
    GrowthRateDescending,
    GrowthRateAscending,
    FrequencyAscending,
}

impl RootOrdering {
    fn compare(self, a: &EigenPair, b: &EigenPair) -> Ordering {
        let by_growth = |x: &EigenPair, y: &EigenPair| x.value.re.total_cmp(&y.value.re);
        let by_freq = |x: &EigenPair, y: &EigenPair| x.value.im.total_cmp(&y.value.im);
        match self {
            Self::GrowthRateDescending => by_growth(b, a).then_with(|| by_freq(a, b)),
            Self::GrowthRateAscending => by_growth(a, b).then_with(|| by_freq(a, b)),
            Self::FrequencyAscending => by_freq(a, b).then_with(|| by_growth(b, a)),
        }
    }
}

/// Eigen solver configuration.
#[derive(Debug, Clone)]
pub struct EigenSolverConfig {
    pub ordering: RootOrdering,
    /// Keep both members of complex-conjugate pairs.
    pub keep_conjugates: bool,
    /// Compute left eigenvectors (needed for sensitivities).
    pub compute_left: bool,
    /// Convergence threshold of the Schur iteration
    pub schur_eps: f64,
    /// Maximum Schur iterations (0 = unlimited)
    pub max_schur_iterations: usize,
    /// Inverse-iteration sweeps per eigenvector
    pub inverse_iterations: usize,
    /// Relative shift applied to each eigenvalue before factorizing
    pub shift: f64,
    /// Relative distance below which eigenvalues are treated as repeated
    pub cluster_tol: f64,
    /// Accepted residual `‖A x − λ B x‖` relative to `‖A‖ + |λ| ‖B‖`
    pub residual_tol: f64,
}

impl Default for EigenSolverConfig {
    fn default() -> Self {
        Self {
            ordering: RootOrdering::default(),
            keep_conjugates: false,
            compute_left: true,
            schur_eps: f64::EPSILON,
            max_schur_iterations: 10_000,
            inverse_iterations: 3,
            shift: 1e-10,
            cluster_tol: 1e-8,
            residual_tol: 1e-6,
        }
    }
}

/// Black-box solver for `A(V) x = λ B(V) x`.
#[derive(Debug, Clone, Default)]
pub struct GeneralizedEigenSolver {
    config: EigenSolverConfig,
}

impl GeneralizedEigenSolver {
    pub fn new(config: EigenSolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EigenSolverConfig {
        &self.config
    }

    /// Solve the pencil; failures surface as `EigensolveFailure` and are not
    /// retried here.
    pub fn solve(&self, ops: &ReducedOperatorPair) -> FlutterResult<RootSet> {
        let n = ops.a.nrows();
        if ops.a.ncols() != n {
            return Err(FlutterError::DimensionMismatch {
                what: "A columns",
                expected: n,
                found: ops.a.ncols(),
            });
        }
        if ops.b.shape() != (n, n) {
            return Err(FlutterError::DimensionMismatch {
                what: "B size",
                expected: n,
                found: ops.b.nrows(),
            });
        }

        let velocity = ops.velocity;
        let fail = |what: &str| FlutterError::EigensolveFailure {
            velocity,
            what: what.to_string(),
        };

        if n == 0 {
            return Ok(RootSet {
                velocity,
                pairs: Vec::new(),
                b: ops.b.clone(),
            });
        }

        let c = ops
            .b
            .clone()
            .lu()
            .solve(&ops.a)
            .ok_or_else(|| fail("B is singular"))?;
        let schur = Schur::try_new(
            c,
            self.config.schur_eps,
            self.config.max_schur_iterations,
        )
        .ok_or_else(|| fail("Schur iteration did not converge"))?;
        let eigenvalues = schur.complex_eigenvalues();

        if eigenvalues.iter().any(|l| !(l.re.is_finite() && l.im.is_finite())) {
            return Err(fail("non-finite eigenvalue"));
        }

        let a = complexify(&ops.a);
        let b = complexify(&ops.b);
        let (at, bt) = if self.config.compute_left {
            (Some(a.transpose()), Some(b.transpose()))
        } else {
            (None, None)
        };

        let mut pairs: Vec<EigenPair> = Vec::with_capacity(n);
        // `B x` of every accepted right vector, parallel to `pairs`.
        let mut bxs: Vec<DVector<C64>> = Vec::with_capacity(n);
        for &lambda in eigenvalues.iter() {
            if !self.config.keep_conjugates && lambda.im < 0.0 {
                continue;
            }

            let radius = self.config.cluster_tol * lambda.norm().max(1.0);
            let cluster: Vec<usize> = (0..pairs.len())
                .filter(|&k| (pairs[k].value - lambda).norm() <= radius)
                .collect();

            let previous: Vec<&DVector<C64>> = cluster.iter().map(|&k| &pairs[k].right).collect();
            let right = self
                .eigenvector(&a, &b, lambda, &|v: &mut DVector<C64>| orthogonalize(v, &previous))
                .ok_or_else(|| fail("right eigenvector iteration failed"))?;

            let bx = &b * &right;
            let xbx = right.dot(&bx);
            if xbx.norm() <= 1e-14 * right.norm() * bx.norm() {
                return Err(fail("eigenvector is B-orthogonal to itself (defective root)"));
            }
            let scale = C64::new(1.0, 0.0) / xbx.sqrt();
            let right = right * scale;
            let bx = bx * scale;

            let left = match (&at, &bt) {
                (Some(at), Some(bt)) => {
                    let partners: Vec<(&DVector<C64>, &DVector<C64>)> = cluster
                        .iter()
                        .filter_map(|&k| pairs[k].left.as_ref().map(|y| (y, &bxs[k])))
                        .collect();
                    let y = self
                        .eigenvector(at, bt, lambda, &|v: &mut DVector<C64>| {
                            biorthogonalize(v, &partners)
                        })
                        .ok_or_else(|| fail("left eigenvector iteration failed"))?;
                    let ybx = y.dot(&bx);
                    if ybx.norm() <= 1e-14 * y.norm() * bx.norm() {
                        return Err(fail("left and right eigenvectors are B-orthogonal"));
                    }
                    Some(y * (C64::new(1.0, 0.0) / ybx))
                }
                _ => None,
            };

            pairs.push(EigenPair {
                value: lambda,
                right,
                left,
            });
            bxs.push(bx);
        }

        let ordering = self.config.ordering;
        pairs.sort_by(|p, q| ordering.compare(p, q));

        Ok(RootSet {
            velocity,
            pairs,
            b: ops.b.clone(),
        })
    }

    /// Eigenvector of the pencil for `lambda` by shifted inverse iteration
    /// `(A − σB) v_{k+1} = B v_k`.
    ///
    /// Each start vector is run with `deflate` applied after every sweep;
    /// the first iterate whose residual passes `residual_tol` wins. When no
    /// deflated start passes (nearly parallel vectors close to a defective
    /// root), undeflated starts are tried and the smallest residual is kept.
    fn eigenvector(
        &self,
        a: &DMatrix<C64>,
        b: &DMatrix<C64>,
        lambda: C64,
        deflate: &dyn Fn(&mut DVector<C64>),
    ) -> Option<DVector<C64>> {
        let n = a.nrows();
        let sigma = lambda + C64::new(self.config.shift * lambda.norm().max(1.0), 0.0);
        let lu = (a - b * sigma).lu();
        let accept = self.config.residual_tol * (a.norm() + lambda.norm() * b.norm());

        let plain = |_: &mut DVector<C64>| {};
        let mut best: Option<(f64, DVector<C64>)> = None;
        for deflated in [true, false] {
            for start in start_vectors(n) {
                let hook: &dyn Fn(&mut DVector<C64>) = if deflated { deflate } else { &plain };
                let Some(v) = self.iterate(&lu, b, start, hook) else {
                    continue;
                };
                let residual = (a * &v - (b * &v) * lambda).norm();
                if residual <= accept {
                    return Some(v);
                }
                if best.as_ref().is_none_or(|(r, _)| residual < *r) {
                    best = Some((residual, v));
                }
            }
        }
        best.map(|(_, v)| v)
    }

    fn iterate(
        &self,
        lu: &LU<C64, Dyn, Dyn>,
        b: &DMatrix<C64>,
        mut v: DVector<C64>,
        deflate: &dyn Fn(&mut DVector<C64>),
    ) -> Option<DVector<C64>> {
        deflate(&mut v);
        let norm = v.norm();
        // A start lying inside the deflated span carries nothing new.
        if !(norm.is_finite() && norm > 1e-8) {
            return None;
        }
        v.unscale_mut(norm);

        for _ in 0..self.config.inverse_iterations.max(1) {
            let mut w = lu.solve(&(b * &v))?;
            deflate(&mut w);
            let norm = w.norm();
            if !(norm.is_finite() && norm > 0.0) {
                return None;
            }
            v = w.unscale(norm);
        }
        Some(v)
    }
}

/// Graded vector first (not orthogonal to any coordinate direction), then
/// the unit coordinate vectors.
fn start_vectors(n: usize) -> impl Iterator<Item = DVector<C64>> {
    let graded = DVector::from_fn(n, |i, _| C64::new(1.0 + i as f64 / n as f64, 0.0));
    std::iter::once(graded).chain((0..n).map(move |i| {
        let mut e = DVector::zeros(n);
        e[i] = C64::new(1.0, 0.0);
        e
    }))
}

/// Remove the components of `v` along `basis` (Hermitian Gram-Schmidt,
/// applied twice).
fn orthogonalize(v: &mut DVector<C64>, basis: &[&DVector<C64>]) {
    let one = C64::new(1.0, 0.0);
    for _ in 0..2 {
        for u in basis {
            let uu = u.dotc(u);
            if uu.re > 0.0 {
                let c = u.dotc(v) / uu;
                v.axpy(-c, *u, one);
            }
        }
    }
}

/// Make a left vector satisfy `yᵀ (B x_k) = 0` for earlier cluster members,
/// given their pairs `(y_k, B x_k)` with `y_kᵀ B x_k = 1`.
fn biorthogonalize(y: &mut DVector<C64>, partners: &[(&DVector<C64>, &DVector<C64>)]) {
    let one = C64::new(1.0, 0.0);
    for _ in 0..2 {
        for (yk, bxk) in partners {
            let c = y.dot(*bxk);
            y.axpy(-c, *yk, one);
        }
    }
}
