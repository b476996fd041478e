//! Plotting curve over the observed call-rate range.

use birdcal_common::{CalibrationWindow, Error, Result};
use birdcal_math::{sample_curve, CurveFit, LinearFit, QuadraticFit, SamplePoint};
use serde::{Deserialize, Serialize};

use super::select_windows;
use super::summary::SamplePair;

/// x range upper bound when no window has a positive call rate.
pub const FALLBACK_X_MAX: f64 = 1.0;

/// Fitted curves, sampled for plotting, plus the points they were fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCurve {
    pub window_count: usize,
    pub rejected_windows: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub linear: LinearFit,
    pub quadratic: QuadraticFit,
    pub samples: Vec<SamplePoint>,
    pub points: Vec<SamplePair>,
}

/// Fit both curves on every usable window and sample them over
/// `[0, max calls_per_asset]`.
pub fn fitted_curve(windows: &[CalibrationWindow], min_calls: u64, sample_count: usize) -> Result<FittedCurve> {
    if sample_count == 0 {
        return Err(Error::InvalidParameter {
            name: "sample_count".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let selection = select_windows(windows, min_calls)?;
    let points = selection.points();
    let fit = CurveFit::fit(&points);

    let x_max = points
        .iter()
        .map(|p| p.0)
        .filter(|&x| x > 0.0)
        .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |m| m.max(x))))
        .unwrap_or(FALLBACK_X_MAX);

    Ok(FittedCurve {
        window_count: points.len(),
        rejected_windows: selection.rejected,
        x_min: 0.0,
        x_max,
        linear: fit.linear,
        quadratic: fit.quadratic,
        samples: sample_curve(&fit, 0.0, x_max, sample_count),
        points: points
            .iter()
            .map(|&(x, y)| SamplePair {
                x_calls_per_asset: x,
                y_density_per_ha: y,
            })
            .collect(),
    })
}
