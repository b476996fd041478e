//! Regression error metrics.
//!
//! RMSE, MAE and the coefficient of determination. R² is `1 - SS_res/SS_tot`;
//! when every observed value is identical (`SS_tot == 0`) it is 1.0 for a
//! perfect fit and 0.0 otherwise.

use serde::{Deserialize, Serialize};

/// Fit-quality metrics over a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// Compute metrics for paired observations and predictions.
///
/// Pairs beyond the shorter slice are ignored. Empty input yields all zeros.
pub fn regression_metrics(y_true: &[f64], y_pred: &[f64]) -> RegressionMetrics {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return RegressionMetrics::default();
    }
    let y_true = &y_true[..n];
    let y_pred = &y_pred[..n];
    let nf = n as f64;

    let mut ss_res = 0.0;
    let mut sum_abs = 0.0;
    for (&y, &yhat) in y_true.iter().zip(y_pred) {
        let err = yhat - y;
        ss_res += err * err;
        sum_abs += err.abs();
    }

    let ss_tot = if y_true.iter().all(|&y| y == y_true[0]) {
        // Exactly constant; the mean-based sum can pick up rounding noise.
        0.0
    } else {
        let mean = y_true.iter().sum::<f64>() / nf;
        y_true.iter().map(|&y| (y - mean) * (y - mean)).sum::<f64>()
    };

    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    RegressionMetrics {
        rmse: (ss_res / nf).sqrt(),
        mae: sum_abs / nf,
        r2,
    }
}

/// Collects held-out observations so metrics can be computed once over the
/// pooled residuals instead of averaging per-fold values.
#[derive(Debug, Clone, Default)]
pub struct ResidualPool {
    y_true: Vec<f64>,
    y_pred: Vec<f64>,
}

impl ResidualPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation/prediction pair.
    pub fn push(&mut self, y_true: f64, y_pred: f64) {
        self.y_true.push(y_true);
        self.y_pred.push(y_pred);
    }

    /// Add all pairs from two parallel slices.
    pub fn extend(&mut self, y_true: &[f64], y_pred: &[f64]) {
        for (&y, &yhat) in y_true.iter().zip(y_pred) {
            self.push(y, yhat);
        }
    }

    pub fn len(&self) -> usize {
        self.y_true.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y_true.is_empty()
    }

    /// Residuals `prediction - observation` in insertion order.
    pub fn residuals(&self) -> Vec<f64> {
        self.y_true
            .iter()
            .zip(&self.y_pred)
            .map(|(&y, &yhat)| yhat - y)
            .collect()
    }

    pub fn metrics(&self) -> RegressionMetrics {
        regression_metrics(&self.y_true, &self.y_pred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn perfect_predictions() {
        let m = regression_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn known_errors() {
        let m = regression_metrics(&[1.0, 2.0, 3.0, 4.0], &[2.0, 2.0, 2.0, 2.0]);
        // errors: 1, 0, -1, -2
        assert!(approx_eq(m.rmse, (6.0f64 / 4.0).sqrt(), 1e-12));
        assert!(approx_eq(m.mae, 1.0, 1e-12));
        // ss_tot = 5, ss_res = 6
        assert!(approx_eq(m.r2, 1.0 - 6.0 / 5.0, 1e-12));
    }

    #[test]
    fn constant_truth_perfect_fit_is_one() {
        let m = regression_metrics(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn constant_truth_with_deviation_is_zero() {
        let m = regression_metrics(&[1.0, 1.0, 1.0], &[1.0, 1.5, 1.0]);
        assert_eq!(m.r2, 0.0);
    }

    #[test]
    fn constant_fractional_truth_has_zero_ss_tot() {
        let m = regression_metrics(&[0.1, 0.1, 0.1], &[0.1, 0.1, 0.1]);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(regression_metrics(&[], &[]), RegressionMetrics::default());
    }

    #[test]
    fn pooled_differs_from_averaged() {
        let mut pool = ResidualPool::new();
        pool.extend(&[1.0, 2.0], &[1.0, 2.0]);
        pool.extend(&[10.0, 20.0], &[12.0, 18.0]);
        assert_eq!(pool.len(), 4);
        let pooled = pool.metrics();
        let fold_b = regression_metrics(&[10.0, 20.0], &[12.0, 18.0]);
        assert!(approx_eq(pooled.mae, 1.0, 1e-12));
        assert!(approx_eq(fold_b.mae, 2.0, 1e-12));
        assert_eq!(pool.residuals(), vec![0.0, 0.0, 2.0, -2.0]);
    }
}
