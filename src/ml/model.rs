// ============================================================
// Layer 5 - Linear Model (Ordinary Least Squares)
// ============================================================
// y ≈ X·β + b over a fixed, named feature ordering.
//
// Fitting:
//   1. Center:  Xc = X - mean(X),  yc = y - mean(y)
//   2. Scale every column of Xc to unit norm. Columns that are
//      constant up to rounding get coefficient 0.
//   3. SVD of the scaled matrix by one-sided Jacobi rotations.
//      Singular values below eps·max(n, k)·σ_max count as zero,
//      so rank-deficient X yields the least-norm β (in scaled
//      units) instead of failing.
//   4. Unscale β, then b = mean(y) - mean(X)·β
//
// The normal equations are never formed, so columns whose
// magnitudes differ by many orders still fit exactly.
//
// Once fitted the model is immutable.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::domain::error::{AqiError, Result};

const JACOBI_MAX_SWEEPS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub feature_names: Vec<String>,
    pub coefficients:  Vec<f64>,
    pub intercept:     f64,
}

impl LinearModel {
    pub fn new(feature_names: Vec<String>, coefficients: Vec<f64>, intercept: f64) -> Self {
        Self { feature_names, coefficients, intercept }
    }

    /// Fit by ordinary least squares. `x` is (rows, features).
    pub fn fit(feature_names: Vec<String>, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<Self> {
        let (rows, cols) = x.dim();
        if rows == 0 || rows != y.len() {
            return Err(AqiError::Data(format!(
                "cannot fit on {rows} feature rows and {} targets",
                y.len()
            )));
        }
        if cols != feature_names.len() {
            return Err(AqiError::Data(format!(
                "{cols} feature columns but {} feature names",
                feature_names.len()
            )));
        }

        // ── Center ────────────────────────────────────────────────────────────
        let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(cols));
        let y_mean = y.mean().unwrap_or(0.0);
        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        // ── Column scaling ────────────────────────────────────────────────────
        let mut xs     = xc.clone();
        let mut scales = Array1::<f64>::zeros(cols);
        for j in 0..cols {
            let norm     = xc.column(j).dot(&xc.column(j)).sqrt();
            let raw_norm = x.column(j).dot(&x.column(j)).sqrt();
            if norm > 0.0 && norm > f64::EPSILON * rows as f64 * raw_norm {
                scales[j] = norm;
                xs.column_mut(j).mapv_inplace(|v| v / norm);
            } else {
                xs.column_mut(j).fill(0.0);
            }
        }

        // ── Least squares via SVD ─────────────────────────────────────────────
        let (us, sigma, v) = one_sided_jacobi(xs);
        let sigma_max = sigma.iter().cloned().fold(0.0_f64, f64::max);
        let cutoff    = f64::EPSILON * rows.max(cols) as f64 * sigma_max;

        // columns of `us` are U·Σ, so β = V · diag(1/σ²) · (UΣ)ᵀ · yc
        let projected = us.t().dot(&yc);
        let weighted: Array1<f64> = projected
            .iter()
            .zip(sigma.iter())
            .map(|(&p, &s)| if s > cutoff && s > 0.0 { p / (s * s) } else { 0.0 })
            .collect();
        let beta_scaled = v.dot(&weighted);
        let beta: Array1<f64> = beta_scaled
            .iter()
            .zip(scales.iter())
            .map(|(&b, &scale)| if scale > 0.0 { b / scale } else { 0.0 })
            .collect();

        let rank = sigma.iter().filter(|&&s| s > cutoff && s > 0.0).count();
        if rank < cols {
            tracing::warn!(
                "Feature matrix is rank deficient ({} of {}); using least-norm solution",
                rank,
                cols
            );
        }

        let intercept = y_mean - x_mean.dot(&beta);
        Ok(Self::new(feature_names, beta.to_vec(), intercept))
    }

    pub fn feature_count(&self) -> usize {
        self.coefficients.len()
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&ArrayView1::from(&self.coefficients[..])) + self.intercept
    }
}

/// Mean absolute error. Empty input gives 0.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    total / n as f64
}

/// One-sided (Hestenes) Jacobi SVD of `a` (rows, cols).
/// Returns (A·V, singular values, V). The columns of A·V are
/// mutually orthogonal and their norms are the singular values.
fn one_sided_jacobi(mut a: Array2<f64>) -> (Array2<f64>, Array1<f64>, Array2<f64>) {
    let (rows, n) = a.dim();
    let mut v = Array2::<f64>::eye(n);
    let tolerance = f64::EPSILON * rows.max(1) as f64;

    for _ in 0..JACOBI_MAX_SWEEPS {
        let mut rotated = false;
        for p in 0..n {
            for q in (p + 1)..n {
                let alpha = a.column(p).dot(&a.column(p));
                let beta  = a.column(q).dot(&a.column(q));
                let gamma = a.column(p).dot(&a.column(q));
                if alpha == 0.0 || beta == 0.0 || gamma.abs() <= tolerance * (alpha * beta).sqrt() {
                    continue;
                }
                rotated = true;

                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (zeta * zeta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                rotate_columns(&mut a, p, q, c, s);
                rotate_columns(&mut v, p, q, c, s);
            }
        }
        if !rotated {
            break;
        }
    }

    let sigma = (0..n).map(|j| a.column(j).dot(&a.column(j)).sqrt()).collect();
    (a, sigma, v)
}

/// Columns p and q ← (c·p - s·q, s·p + c·q)
fn rotate_columns(m: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    for k in 0..m.nrows() {
        let mp = m[[k, p]];
        let mq = m[[k, q]];
        m[[k, p]] = c * mp - s * mq;
        m[[k, q]] = s * mp + c * mq;
    }
}
