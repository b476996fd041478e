//! Evenly spaced evaluation of fitted curves for plotting.

use serde::{Deserialize, Serialize};

use super::fit::CurveFit;

/// One plotted x with both model predictions, floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: f64,
    pub y_linear: f64,
    pub y_quadratic: f64,
}

/// Sample `sample_count` points from `x_min` to `x_max` inclusive.
///
/// Spacing is `(x_max - x_min) / (sample_count - 1)` and the final x is
/// exactly `x_max`. A count of 1 yields a single point at `x_min`; 0 yields
/// nothing. Negative predictions are clamped to 0.
pub fn sample_curve(fit: &CurveFit, x_min: f64, x_max: f64, sample_count: usize) -> Vec<SamplePoint> {
    match sample_count {
        0 => Vec::new(),
        1 => vec![sample_at(fit, x_min)],
        n => {
            let last = n - 1;
            let step = (x_max - x_min) / last as f64;
            (0..n)
                .map(|i| {
                    let x = if i == last { x_max } else { x_min + step * i as f64 };
                    sample_at(fit, x)
                })
                .collect()
        }
    }
}

fn sample_at(fit: &CurveFit, x: f64) -> SamplePoint {
    // f64::max returns the non-NaN operand, so NaN predictions also floor to 0.
    SamplePoint {
        x,
        y_linear: fit.linear.predict(x).max(0.0),
        y_quadratic: fit.quadratic.predict(x).max(0.0),
    }
}
