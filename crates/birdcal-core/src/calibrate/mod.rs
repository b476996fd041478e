//! Calibration engine over paired acoustic/visual windows.
//!
//! Relates acoustic call rate (calls per recorded asset) to drone-observed
//! density (detections per hectare) with linear and quadratic least-squares
//! fits, and validates the fits with a leave-one-visual-survey-out backtest.
//!
//! # Operations
//!
//! - [`list_windows`] / [`curve_summary`]: window browsing and the median
//!   density-per-call factor
//! - [`backtest`]: grouped cross-validation with a recommended model
//! - [`train_summary`] / [`predict_density`]: full-dataset fits and point
//!   predictions with an approximate interval
//! - [`fitted_curve`]: evenly sampled curves for plotting
//!
//! Every operation is a pure function of its inputs. Windows are sorted by
//! id before any accumulation so identical input gives identical output.
//!
//! # Usage
//!
//! ```ignore
//! use birdcal_core::calibrate::{backtest, BacktestOptions};
//!
//! let report = backtest(&windows, &BacktestOptions::default())?;
//! if let Some(overall) = &report.overall {
//!     println!("recommended: {}", overall.recommended_model);
//! }
//! ```

pub mod backtest;
pub mod curve;
pub mod features;
pub mod predict;
pub mod summary;
pub mod train;

pub use backtest::*;
pub use curve::*;
pub use features::*;
pub use predict::*;
pub use summary::*;
pub use train::*;

use birdcal_common::{CalibrationWindow, Error, Result, WindowStatus};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which single-feature curve to trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedModel {
    Linear,
    Quadratic,
}

impl std::fmt::Display for RecommendedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendedModel::Linear => write!(f, "linear"),
            RecommendedModel::Quadratic => write!(f, "quadratic"),
        }
    }
}

impl RecommendedModel {
    /// Pick quadratic only when its RMSE is strictly below
    /// `linear_rmse * (1 - min_improvement)`. Ties go to linear.
    pub fn choose(linear_rmse: f64, quadratic_rmse: f64, min_improvement: f64) -> Self {
        if quadratic_rmse < linear_rmse * (1.0 - min_improvement) {
            RecommendedModel::Quadratic
        } else {
            RecommendedModel::Linear
        }
    }
}

/// Windows that survived filtering, in id order.
#[derive(Debug, Clone)]
pub struct WindowSelection<'a> {
    /// Usable windows sorted by id.
    pub windows: Vec<&'a CalibrationWindow>,
    /// Windows at or above `min_calls` that failed the upstream-data check.
    pub rejected: usize,
}

impl<'a> WindowSelection<'a> {
    /// `(calls_per_asset, density_per_hectare)` for every selected window.
    pub fn points(&self) -> Vec<birdcal_math::Point> {
        self.windows.iter().map(|w| w.point()).collect()
    }
}

/// Filter windows by call count, drop rejected ones, and sort by id.
///
/// Fails on the first structurally invalid window, whatever its call count.
pub fn select_windows(windows: &[CalibrationWindow], min_calls: u64) -> Result<WindowSelection<'_>> {
    let mut selected = Vec::with_capacity(windows.len());
    let mut rejected = 0;

    for window in windows {
        let status = window.check()?;
        if window.acoustic_call_count < min_calls {
            continue;
        }
        match status {
            WindowStatus::Usable => selected.push(window),
            WindowStatus::Rejected(reason) => {
                warn!(
                    window_id = %window.id,
                    visual_survey_id = %window.visual_survey_id,
                    reason = %reason,
                    "rejecting calibration window"
                );
                rejected += 1;
            }
        }
    }

    selected.sort_by_key(|w| w.id);
    Ok(WindowSelection {
        windows: selected,
        rejected,
    })
}

pub(crate) fn check_margin(min_improvement: f64) -> Result<()> {
    if min_improvement.is_finite() && (0.0..1.0).contains(&min_improvement) {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "quadratic_min_improvement".to_string(),
            reason: format!("must be in [0, 1), got {}", min_improvement),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::window;
    use super::*;

    #[test]
    fn test_recommendation_tie_goes_linear() {
        assert_eq!(RecommendedModel::choose(1.0, 1.0, 0.0), RecommendedModel::Linear);
        assert_eq!(RecommendedModel::choose(1.0, 0.99, 0.0), RecommendedModel::Quadratic);
        assert_eq!(RecommendedModel::choose(1.0, 0.99, 0.05), RecommendedModel::Linear);
        assert_eq!(RecommendedModel::choose(0.0, 0.0, 0.0), RecommendedModel::Linear);
    }

    #[test]
    fn test_select_sorts_and_filters() {
        let mut low = window(2, 1, 1.0, 1.0);
        low.acoustic_call_count = 0;
        let windows = vec![window(5, 1, 1.0, 1.0), low, window(3, 2, 2.0, 2.0)];
        let sel = select_windows(&windows, 1).unwrap();
        let ids: Vec<u64> = sel.windows.iter().map(|w| w.id.0).collect();
        assert_eq!(ids, vec![3, 5]);
        assert_eq!(sel.rejected, 0);
    }

    #[test]
    fn test_select_counts_rejections() {
        let mut bad = window(4, 1, 1.0, 1.0);
        bad.drone_area_hectares = 0.0;
        let windows = vec![window(1, 1, 1.0, 1.0), bad];
        let sel = select_windows(&windows, 1).unwrap();
        assert_eq!(sel.windows.len(), 1);
        assert_eq!(sel.rejected, 1);
    }

    #[test]
    fn test_select_fails_on_non_finite() {
        let mut bad = window(4, 1, 1.0, 1.0);
        bad.acoustic_calls_per_asset = f64::NAN;
        let err = select_windows(&[bad], 1).unwrap_err();
        assert_eq!(err.code(), 20);
    }

    #[test]
    fn test_margin_bounds() {
        assert!(check_margin(0.0).is_ok());
        assert!(check_margin(0.5).is_ok());
        assert!(check_margin(1.0).is_err());
        assert!(check_margin(-0.1).is_err());
        assert!(check_margin(f64::NAN).is_err());
    }
}
