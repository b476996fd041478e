//! Ordinary least-squares polynomial fits for calibration curves.
//!
//! Both fitters are closed-form over power sums and never fail on degenerate
//! data. Too few points, a single repeated x, or a singular normal-equations
//! system resolve to a flat fit. A flat zero model means "not enough data",
//! not a valid calibration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An `(x, y)` observation: calls per asset against density per hectare.
pub type Point = (f64, f64);

/// Structurally invalid fitter input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("non-finite point at index {index}: ({x}, {y})")]
    NonFinite { index: usize, x: f64, y: f64 },
}

/// Degree-1 fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Evaluate the line at `x` (unclamped).
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// True for the all-zero fallback fit.
    pub fn is_flat_zero(&self) -> bool {
        self.slope == 0.0 && self.intercept == 0.0
    }
}

/// Degree-2 fit `y = a0 + a1 * x + a2 * x²`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuadraticFit {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
}

impl QuadraticFit {
    /// Evaluate the polynomial at `x` (unclamped).
    pub fn predict(&self, x: f64) -> f64 {
        self.a0 + self.a1 * x + self.a2 * x * x
    }

    /// True for the all-zero fallback fit.
    pub fn is_flat_zero(&self) -> bool {
        self.a0 == 0.0 && self.a1 == 0.0 && self.a2 == 0.0
    }
}

/// Both polynomial fits over the same point set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveFit {
    pub linear: LinearFit,
    pub quadratic: QuadraticFit,
}

impl CurveFit {
    /// Fit both models to `points`.
    pub fn fit(points: &[Point]) -> Self {
        CurveFit {
            linear: fit_linear(points),
            quadratic: fit_quadratic(points),
        }
    }
}

/// Reject NaN and infinite coordinates.
pub fn check_finite(points: &[Point]) -> Result<(), InputError> {
    for (index, &(x, y)) in points.iter().enumerate() {
        if !x.is_finite() || !y.is_finite() {
            return Err(InputError::NonFinite { index, x, y });
        }
    }
    Ok(())
}

/// Least-squares line through `points`.
///
/// - fewer than 2 points: `{slope: 0, intercept: 0}`
/// - all x equal: `{slope: 0, intercept: mean(y)}`
pub fn fit_linear(points: &[Point]) -> LinearFit {
    let n = points.len();
    if n < 2 {
        return LinearFit::default();
    }

    let nf = n as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    // Scaled per term so the mean stays finite when Σy overflows.
    let mut mean_y = 0.0;
    for &(x, y) in points {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
        mean_y += y / nf;
    }

    if !mean_y.is_finite() {
        return LinearFit::default();
    }
    let flat = LinearFit {
        slope: 0.0,
        intercept: mean_y,
    };

    // Rounding can leave a tiny non-zero denominator when every x is equal.
    if !has_distinct_x(points, 2) {
        return flat;
    }
    let denom = nf * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return flat;
    }

    let slope = (nf * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / nf;
    if !slope.is_finite() || !intercept.is_finite() {
        return flat;
    }
    LinearFit { slope, intercept }
}

/// Least-squares quadratic through `points`, solved with Cramer's rule.
///
/// Returns all-zero coefficients for fewer than 3 points, fewer than 3
/// distinct x values, or a zero determinant.
pub fn fit_quadratic(points: &[Point]) -> QuadraticFit {
    if points.len() < 3 || !has_distinct_x(points, 3) {
        return QuadraticFit::default();
    }

    let mut s = [0.0f64; 5]; // Σx^0 .. Σx^4
    let mut t = [0.0f64; 3]; // Σy, Σxy, Σx²y
    for &(x, y) in points {
        let x2 = x * x;
        s[0] += 1.0;
        s[1] += x;
        s[2] += x2;
        s[3] += x2 * x;
        s[4] += x2 * x2;
        t[0] += y;
        t[1] += x * y;
        t[2] += x2 * y;
    }

    let m = [[s[0], s[1], s[2]], [s[1], s[2], s[3]], [s[2], s[3], s[4]]];
    let det = det3(&m);
    if det == 0.0 || !det.is_finite() {
        return QuadraticFit::default();
    }

    let mut coeffs = [0.0f64; 3];
    for (col, coeff) in coeffs.iter_mut().enumerate() {
        let mut replaced = m;
        for (row, rhs) in t.iter().enumerate() {
            replaced[row][col] = *rhs;
        }
        *coeff = det3(&replaced) / det;
    }

    if coeffs.iter().any(|c| !c.is_finite()) {
        return QuadraticFit::default();
    }
    QuadraticFit {
        a0: coeffs[0],
        a1: coeffs[1],
        a2: coeffs[2],
    }
}

/// [`fit_linear`] with non-finite input reported instead of fitted.
pub fn try_fit_linear(points: &[Point]) -> Result<LinearFit, InputError> {
    check_finite(points)?;
    Ok(fit_linear(points))
}

/// [`fit_quadratic`] with non-finite input reported instead of fitted.
pub fn try_fit_quadratic(points: &[Point]) -> Result<QuadraticFit, InputError> {
    check_finite(points)?;
    Ok(fit_quadratic(points))
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Whether `points` contains at least `k` distinct x values.
fn has_distinct_x(points: &[Point], k: usize) -> bool {
    let mut seen: Vec<f64> = Vec::with_capacity(k);
    for &(x, _) in points {
        if !seen.contains(&x) {
            seen.push(x);
            if seen.len() >= k {
                return true;
            }
        }
    }
    false
}
