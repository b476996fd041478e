//! Dense linear solves and multi-feature least squares.
//!
//! The multi-feature model solves ridge-stabilized normal equations. Feature
//! columns in the calibration table are often exactly collinear (calls per hour
//! is a fixed multiple of calls per asset when effort is estimated from asset
//! counts), and the small diagonal load keeps those systems solvable.

use serde::{Deserialize, Serialize};

/// Relative pivot magnitude below which a system is treated as singular.
const PIVOT_EPS: f64 = 1e-12;

/// Diagonal load on feature columns, relative to the mean feature diagonal.
pub const RIDGE_LAMBDA: f64 = 1e-8;

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// `a` is row-major and must be square with `b.len()` rows. Returns `None`
/// for mismatched shapes or a singular system.
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }
    if n == 0 {
        return Some(Vec::new());
    }

    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let tol = scale * PIVOT_EPS;

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() <= tol {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Linear model over several named features: `y = intercept + Σ coef_i x_i`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultiLinearFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl MultiLinearFit {
    /// Evaluate the model on one feature row. Missing trailing features count
    /// as zero.
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Fit a multi-feature linear model.
///
/// `rows[i]` holds the features of observation `i` (all rows must have the
/// same width). Empty input yields an empty zero model; a singular system
/// falls back to zero coefficients and `intercept = mean(targets)`.
pub fn fit_multilinear(rows: &[Vec<f64>], targets: &[f64]) -> MultiLinearFit {
    let n = rows.len().min(targets.len());
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if n == 0 {
        return MultiLinearFit {
            intercept: 0.0,
            coefficients: vec![0.0; width],
        };
    }
    let mean_target = targets[..n].iter().sum::<f64>() / n as f64;
    let flat = MultiLinearFit {
        intercept: mean_target,
        coefficients: vec![0.0; width],
    };
    if rows[..n].iter().any(|r| r.len() != width) {
        return flat;
    }

    // Augmented design [1, x_1 .. x_k]; accumulate X'X and X'y.
    let dim = width + 1;
    let mut xtx = vec![vec![0.0; dim]; dim];
    let mut xty = vec![0.0; dim];
    let mut augmented = vec![0.0; dim];
    for (row, &y) in rows[..n].iter().zip(targets) {
        augmented[0] = 1.0;
        augmented[1..].copy_from_slice(row);
        for i in 0..dim {
            xty[i] += augmented[i] * y;
            for j in 0..dim {
                xtx[i][j] += augmented[i] * augmented[j];
            }
        }
    }

    if width > 0 {
        let mean_diag = (1..dim).map(|i| xtx[i][i]).sum::<f64>() / width as f64;
        let load = RIDGE_LAMBDA * mean_diag.max(1.0);
        for (i, row) in xtx.iter_mut().enumerate().skip(1) {
            row[i] += load;
        }
    }

    match solve_linear_system(xtx, xty) {
        Some(beta) => MultiLinearFit {
            intercept: beta[0],
            coefficients: beta[1..].to_vec(),
        },
        None => flat,
    }
}
