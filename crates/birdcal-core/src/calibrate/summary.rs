//! Window listing and the simple density-per-call factor.

use birdcal_common::{CalibrationWindow, Result};
use birdcal_math::stats::median;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use super::select_windows;

/// Default page size for [`list_windows`].
pub const DEFAULT_LIST_LIMIT: usize = 200;
/// Maximum `(x, y)` pairs echoed in a [`CurveSummary`].
pub const MAX_SAMPLE_PAIRS: usize = 50;

/// Windows with at least `min_calls` calls, closest in time first.
///
/// Ordered by `days_apart` ascending, then newest id first, truncated to
/// `limit`.
pub fn list_windows(windows: &[CalibrationWindow], min_calls: u64, limit: usize) -> Vec<CalibrationWindow> {
    let mut rows: Vec<&CalibrationWindow> = windows
        .iter()
        .filter(|w| w.acoustic_call_count >= min_calls)
        .collect();
    rows.sort_by_key(|w| (w.days_apart, Reverse(w.id)));
    rows.into_iter().take(limit).cloned().collect()
}

/// One `(calls_per_asset, density)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePair {
    pub x_calls_per_asset: f64,
    pub y_density_per_ha: f64,
}

/// Median-ratio calibration factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSummary {
    pub window_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usable_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_factor_density_per_call_per_asset: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_pairs: Vec<SamplePair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_windows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Median of `density / calls_per_asset` over windows with a positive call rate.
pub fn curve_summary(windows: &[CalibrationWindow], min_calls: u64) -> Result<CurveSummary> {
    let selection = select_windows(windows, min_calls)?;
    let window_count = selection.windows.len() + selection.rejected;
    let rejected_windows = (selection.rejected > 0).then_some(selection.rejected);

    if window_count == 0 {
        return Ok(CurveSummary {
            window_count: 0,
            usable_count: None,
            simple_factor_density_per_call_per_asset: None,
            sample_pairs: Vec::new(),
            rejected_windows,
            notes: None,
            message: Some("No calibration windows available. Rebuild windows first.".to_string()),
        });
    }

    let pairs: Vec<SamplePair> = selection
        .windows
        .iter()
        .map(|w| w.point())
        .filter(|&(x, y)| x > 0.0 && y >= 0.0)
        .map(|(x, y)| SamplePair {
            x_calls_per_asset: x,
            y_density_per_ha: y,
        })
        .collect();
    let ratios: Vec<f64> = pairs
        .iter()
        .map(|p| p.y_density_per_ha / p.x_calls_per_asset)
        .collect();

    let Some(factor) = median(&ratios) else {
        return Ok(CurveSummary {
            window_count,
            usable_count: Some(0),
            simple_factor_density_per_call_per_asset: None,
            sample_pairs: Vec::new(),
            rejected_windows,
            notes: None,
            message: Some("No windows with positive acoustic call rate to calibrate.".to_string()),
        });
    };

    Ok(CurveSummary {
        window_count,
        usable_count: Some(ratios.len()),
        simple_factor_density_per_call_per_asset: Some(factor),
        sample_pairs: pairs.into_iter().take(MAX_SAMPLE_PAIRS).collect(),
        rejected_windows,
        notes: Some("Median of density/call-rate ratios; see `birdcal backtest` for fitted models.".to_string()),
        message: None,
    })
}
