//! Leave-one-visual-survey-out backtest.
//!
//! Windows that share a drone survey share its density estimate, so random
//! splits would leak the target between train and test. Each fold instead
//! holds out every window of one visual survey, fits both curves on the rest,
//! and scores them on the held-out survey. Overall metrics pool the held-out
//! residuals of all folds and are computed once.

use birdcal_common::{CalibrationWindow, Result, SurveyId};
use birdcal_config::{BacktestPolicy, DEFAULT_QUADRATIC_MIN_IMPROVEMENT};
use birdcal_math::{fit_linear, fit_quadratic, regression_metrics, RegressionMetrics, ResidualPool};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::features::build_feature_table;
use super::{check_margin, select_windows, RecommendedModel};

/// Minimum windows on each side of a fold.
pub const MIN_FOLD_WINDOWS: usize = 2;
/// Minimum usable folds for an overall estimate.
pub const MIN_FOLDS: usize = 2;
/// Minimum windows before any fold is attempted.
pub const MIN_BACKTEST_WINDOWS: usize = 3;

/// Backtest parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOptions {
    /// Windows with fewer acoustic calls are excluded before folding.
    pub min_calls: u64,
    /// Number of species features in the auxiliary feature table.
    pub top_species_features: usize,
    /// Relative RMSE margin quadratic must win by.
    pub quadratic_min_improvement: f64,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            min_calls: 1,
            top_species_features: 5,
            quadratic_min_improvement: DEFAULT_QUADRATIC_MIN_IMPROVEMENT,
        }
    }
}

impl From<&BacktestPolicy> for BacktestOptions {
    fn from(policy: &BacktestPolicy) -> Self {
        Self {
            min_calls: policy.min_calls,
            top_species_features: policy.top_species,
            quadratic_min_improvement: policy.quadratic_min_improvement,
        }
    }
}

/// Scores for one held-out visual survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestFold {
    pub held_out_visual_survey_id: SurveyId,
    pub train_windows: usize,
    pub test_windows: usize,
    pub linear_metrics: RegressionMetrics,
    pub quadratic_metrics: RegressionMetrics,
}

/// Pooled held-out metrics and the resulting recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub linear: RegressionMetrics,
    pub quadratic: RegressionMetrics,
    pub recommended_model: RecommendedModel,
}

/// Backtest result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Usable windows after filtering.
    pub window_count: usize,
    /// Windows dropped by the upstream-data check.
    pub rejected_windows: usize,
    pub feature_names: Vec<String>,
    pub species_features: Vec<String>,
    pub folds: Vec<BacktestFold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<OverallMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BacktestReport {
    /// The recommended model, when enough folds were scored.
    pub fn recommended_model(&self) -> Option<RecommendedModel> {
        self.overall.as_ref().map(|o| o.recommended_model)
    }
}

/// Run the grouped backtest.
pub fn backtest(windows: &[CalibrationWindow], options: &BacktestOptions) -> Result<BacktestReport> {
    check_margin(options.quadratic_min_improvement)?;

    let selection = select_windows(windows, options.min_calls)?;
    let table = build_feature_table(&selection.windows, options.top_species_features);
    let usable = &selection.windows;

    let mut report = BacktestReport {
        window_count: usable.len(),
        rejected_windows: selection.rejected,
        feature_names: table.feature_names,
        species_features: table.species_features,
        folds: Vec::new(),
        overall: None,
        message: None,
    };

    if usable.len() < MIN_BACKTEST_WINDOWS {
        report.message = Some(format!(
            "Not enough windows for grouped backtest (need >= {}).",
            MIN_BACKTEST_WINDOWS
        ));
        info!(windows = usable.len(), "backtest skipped: too few windows");
        return Ok(report);
    }

    let groups: BTreeSet<SurveyId> = usable.iter().map(|w| w.visual_survey_id).collect();
    if groups.len() < MIN_FOLDS {
        report.message = Some("Need at least 2 drone surveys for grouped backtest.".to_string());
        info!(surveys = groups.len(), "backtest skipped: too few visual surveys");
        return Ok(report);
    }

    let mut linear_pool = ResidualPool::new();
    let mut quadratic_pool = ResidualPool::new();

    for held_out in groups {
        let (test, train): (Vec<&CalibrationWindow>, Vec<&CalibrationWindow>) = usable
            .iter()
            .copied()
            .partition(|w| w.visual_survey_id == held_out);

        if train.len() < MIN_FOLD_WINDOWS || test.len() < MIN_FOLD_WINDOWS {
            debug!(
                visual_survey_id = %held_out,
                train = train.len(),
                test = test.len(),
                "skipping fold"
            );
            continue;
        }

        let train_points: Vec<_> = train.iter().map(|w| w.point()).collect();
        let linear = fit_linear(&train_points);
        let quadratic = fit_quadratic(&train_points);

        let y_true: Vec<f64> = test.iter().map(|w| w.drone_density_per_hectare).collect();
        let y_linear: Vec<f64> = test.iter().map(|w| linear.predict(w.acoustic_calls_per_asset)).collect();
        let y_quadratic: Vec<f64> = test
            .iter()
            .map(|w| quadratic.predict(w.acoustic_calls_per_asset))
            .collect();

        let fold = BacktestFold {
            held_out_visual_survey_id: held_out,
            train_windows: train.len(),
            test_windows: test.len(),
            linear_metrics: regression_metrics(&y_true, &y_linear),
            quadratic_metrics: regression_metrics(&y_true, &y_quadratic),
        };
        debug!(
            visual_survey_id = %held_out,
            train = fold.train_windows,
            test = fold.test_windows,
            linear_rmse = fold.linear_metrics.rmse,
            quadratic_rmse = fold.quadratic_metrics.rmse,
            "fold scored"
        );

        linear_pool.extend(&y_true, &y_linear);
        quadratic_pool.extend(&y_true, &y_quadratic);
        report.folds.push(fold);
    }

    if report.folds.len() < MIN_FOLDS {
        report.message = Some(format!(
            "Only {} usable fold(s); need at least {} folds with >= {} train and test windows each.",
            report.folds.len(),
            MIN_FOLDS,
            MIN_FOLD_WINDOWS
        ));
        info!(folds = report.folds.len(), "backtest has too few usable folds");
        return Ok(report);
    }

    let linear = linear_pool.metrics();
    let quadratic = quadratic_pool.metrics();
    let recommended_model =
        RecommendedModel::choose(linear.rmse, quadratic.rmse, options.quadratic_min_improvement);

    info!(
        windows = report.window_count,
        folds = report.folds.len(),
        linear_rmse = linear.rmse,
        quadratic_rmse = quadratic.rmse,
        recommended = %recommended_model,
        "backtest complete"
    );

    report.overall = Some(OverallMetrics {
        linear,
        quadratic,
        recommended_model,
    });
    Ok(report)
}
