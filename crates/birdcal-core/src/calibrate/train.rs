//! Full-dataset training summary.

use birdcal_common::{CalibrationWindow, Result};
use birdcal_math::stats::population_std;
use birdcal_math::{
    fit_multilinear, regression_metrics, CurveFit, LinearFit, QuadraticFit, RegressionMetrics,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::backtest::BacktestOptions;
use super::features::build_feature_table;
use super::{check_margin, select_windows, RecommendedModel};

/// Linear model over the whole feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiFeatureModel {
    pub intercept: f64,
    /// One coefficient per entry of `TrainSummary::feature_names`.
    pub coefficients: Vec<f64>,
    pub metrics_train: RegressionMetrics,
}

/// Fitted models and their in-sample fit quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub window_count: usize,
    pub rejected_windows: usize,
    pub feature_names: Vec<String>,
    pub species_features: Vec<String>,
    pub linear_model: LinearFit,
    pub quadratic_model: QuadraticFit,
    pub linear_metrics_train: RegressionMetrics,
    pub quadratic_metrics_train: RegressionMetrics,
    pub recommended_model: RecommendedModel,
    /// Population std of the recommended model's in-sample residuals.
    pub residual_std_density_per_hectare: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_feature_model: Option<MultiFeatureModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TrainSummary {
    /// The single-feature curves as one value.
    pub fn curve(&self) -> CurveFit {
        CurveFit {
            linear: self.linear_model,
            quadratic: self.quadratic_model,
        }
    }

    /// Predict with a specific single-feature model (unclamped).
    pub fn predict(&self, model: RecommendedModel, calls_per_asset: f64) -> f64 {
        match model {
            RecommendedModel::Linear => self.linear_model.predict(calls_per_asset),
            RecommendedModel::Quadratic => self.quadratic_model.predict(calls_per_asset),
        }
    }
}

/// Fit both curves and the multi-feature model on every usable window.
pub fn train_summary(windows: &[CalibrationWindow], options: &BacktestOptions) -> Result<TrainSummary> {
    check_margin(options.quadratic_min_improvement)?;

    let selection = select_windows(windows, options.min_calls)?;
    let table = build_feature_table(&selection.windows, options.top_species_features);

    if selection.windows.is_empty() {
        return Ok(TrainSummary {
            window_count: 0,
            rejected_windows: selection.rejected,
            feature_names: table.feature_names,
            species_features: table.species_features,
            linear_model: LinearFit::default(),
            quadratic_model: QuadraticFit::default(),
            linear_metrics_train: RegressionMetrics::default(),
            quadratic_metrics_train: RegressionMetrics::default(),
            recommended_model: RecommendedModel::Linear,
            residual_std_density_per_hectare: 0.0,
            multi_feature_model: None,
            message: Some("No windows available for training.".to_string()),
        });
    }

    let points = selection.points();
    let fit = CurveFit::fit(&points);
    let y: Vec<f64> = points.iter().map(|p| p.1).collect();
    let y_linear: Vec<f64> = points.iter().map(|p| fit.linear.predict(p.0)).collect();
    let y_quadratic: Vec<f64> = points.iter().map(|p| fit.quadratic.predict(p.0)).collect();

    let linear_metrics_train = regression_metrics(&y, &y_linear);
    let quadratic_metrics_train = regression_metrics(&y, &y_quadratic);
    let recommended_model = RecommendedModel::choose(
        linear_metrics_train.rmse,
        quadratic_metrics_train.rmse,
        options.quadratic_min_improvement,
    );

    let predicted = match recommended_model {
        RecommendedModel::Linear => &y_linear,
        RecommendedModel::Quadratic => &y_quadratic,
    };
    let residuals: Vec<f64> = predicted.iter().zip(&y).map(|(p, t)| p - t).collect();
    let residual_std = if residuals.len() > 1 {
        population_std(&residuals)
    } else {
        0.0
    };

    let (x_rows, targets) = table.matrix();
    let multi = fit_multilinear(&x_rows, &targets);
    let multi_pred: Vec<f64> = x_rows.iter().map(|row| multi.predict(row)).collect();
    let multi_feature_model = MultiFeatureModel {
        intercept: multi.intercept,
        coefficients: multi.coefficients,
        metrics_train: regression_metrics(&targets, &multi_pred),
    };

    info!(
        windows = selection.windows.len(),
        recommended = %recommended_model,
        linear_rmse = linear_metrics_train.rmse,
        quadratic_rmse = quadratic_metrics_train.rmse,
        residual_std,
        "training summary complete"
    );

    Ok(TrainSummary {
        window_count: selection.windows.len(),
        rejected_windows: selection.rejected,
        feature_names: table.feature_names,
        species_features: table.species_features,
        linear_model: fit.linear,
        quadratic_model: fit.quadratic,
        linear_metrics_train,
        quadratic_metrics_train,
        recommended_model,
        residual_std_density_per_hectare: residual_std,
        multi_feature_model: Some(multi_feature_model),
        message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::test_support::window;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_train_on_exact_parabola_prefers_quadratic() {
        let windows: Vec<_> = (0..6)
            .map(|i| {
                let x = i as f64;
                window(i + 1, i % 2 + 1, x, 1.0 + 0.5 * x * x)
            })
            .collect();
        let summary = train_summary(&windows, &BacktestOptions::default()).unwrap();

        assert_eq!(summary.window_count, 6);
        assert_eq!(summary.recommended_model, RecommendedModel::Quadratic);
        assert!(approx_eq(summary.quadratic_model.a2, 0.5, 1e-9));
        assert!(approx_eq(summary.residual_std_density_per_hectare, 0.0, 1e-9));
        assert!(summary.linear_metrics_train.rmse > 0.1);
    }

    #[test]
    fn test_train_empty() {
        let summary = train_summary(&[], &BacktestOptions::default()).unwrap();
        assert_eq!(summary.window_count, 0);
        assert!(summary.message.is_some());
        assert!(summary.multi_feature_model.is_none());
        assert!(summary.linear_model.is_flat_zero());
    }

    #[test]
    fn test_multi_feature_model_shape() {
        let windows: Vec<_> = (1..=5)
            .map(|i| window(i, i, i as f64, 3.0 * i as f64 + 1.0))
            .collect();
        let summary = train_summary(&windows, &BacktestOptions::default()).unwrap();
        let multi = summary.multi_feature_model.unwrap();
        assert_eq!(multi.coefficients.len(), summary.feature_names.len());
        assert!(multi.metrics_train.rmse < 1e-3);
        assert!(multi.intercept.is_finite());
    }

    #[test]
    fn test_single_window_has_zero_residual_std() {
        let summary = train_summary(&[window(1, 1, 2.0, 5.0)], &BacktestOptions::default()).unwrap();
        assert_eq!(summary.window_count, 1);
        assert_eq!(summary.residual_std_density_per_hectare, 0.0);
        assert_eq!(summary.recommended_model, RecommendedModel::Linear);
    }
}
