//! Density prediction for a new acoustic recording.

use birdcal_common::{AruId, Error, Result, SurveyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::features::{effort_hours, feature_map};
use super::train::TrainSummary;
use super::RecommendedModel;

/// Normal quantile for an approximate 95% interval.
pub const DEFAULT_INTERVAL_Z: f64 = 1.96;

/// Which model to predict with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// The model the training summary recommends.
    #[default]
    Best,
    Linear,
    Quadratic,
}

impl FromStr for ModelChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "best" => Ok(ModelChoice::Best),
            "linear" => Ok(ModelChoice::Linear),
            "quadratic" => Ok(ModelChoice::Quadratic),
            _ => Err(Error::UnknownModel(s.to_string())),
        }
    }
}

impl std::fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelChoice::Best => write!(f, "best"),
            ModelChoice::Linear => write!(f, "linear"),
            ModelChoice::Quadratic => write!(f, "quadratic"),
        }
    }
}

impl ModelChoice {
    /// Resolve `Best` against a training summary.
    pub fn resolve(self, train: &TrainSummary) -> RecommendedModel {
        match self {
            ModelChoice::Best => train.recommended_model,
            ModelChoice::Linear => RecommendedModel::Linear,
            ModelChoice::Quadratic => RecommendedModel::Quadratic,
        }
    }
}

/// Acoustic counts for one ARU deployment with no paired drone survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub acoustic_survey_id: Option<SurveyId>,
    #[serde(default)]
    pub aru_id: Option<AruId>,
    pub call_count: u64,
    pub asset_count: u64,
    #[serde(default)]
    pub effort_hours: Option<f64>,
    #[serde(default)]
    pub species_call_counts: BTreeMap<String, u64>,
}

impl Observation {
    pub fn calls_per_asset(&self) -> f64 {
        birdcal_common::window::calls_per_asset(self.call_count, self.asset_count)
    }
}

/// Low/high bounds, each floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionInterval {
    pub low: f64,
    pub high: f64,
}

/// A density estimate with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityPrediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acoustic_survey_id: Option<SurveyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aru_id: Option<AruId>,
    pub model_used: RecommendedModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_density_per_hectare: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_interval_approx: Option<PredictionInterval>,
    pub features: BTreeMap<String, f64>,
    pub effort_hours_estimated: f64,
    pub training_window_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Predict density for `observation` with `model`.
///
/// The interval is `estimate ± interval_z * residual_std`, both ends floored
/// at zero. With no training windows the prediction carries only a message.
pub fn predict_density(
    train: &TrainSummary,
    observation: &Observation,
    model: ModelChoice,
    interval_z: f64,
) -> Result<DensityPrediction> {
    if !interval_z.is_finite() || interval_z <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "interval_z".to_string(),
            reason: format!("must be positive, got {}", interval_z),
        });
    }
    if let Some(h) = observation.effort_hours {
        if !h.is_finite() {
            return Err(Error::InvalidParameter {
                name: "effort_hours".to_string(),
                reason: format!("is {}", h),
            });
        }
    }

    let model_used = model.resolve(train);
    let effort = effort_hours(observation.effort_hours, observation.asset_count);
    let calls_per_asset = observation.calls_per_asset();
    let features = feature_map(
        observation.call_count,
        calls_per_asset,
        &observation.species_call_counts,
        &train.species_features,
        effort,
    );

    let mut prediction = DensityPrediction {
        acoustic_survey_id: observation.acoustic_survey_id,
        aru_id: observation.aru_id,
        model_used,
        estimated_density_per_hectare: None,
        prediction_interval_approx: None,
        features,
        effort_hours_estimated: effort,
        training_window_count: train.window_count,
        message: None,
    };

    if train.window_count == 0 {
        prediction.message = Some("No calibration windows available for prediction.".to_string());
        return Ok(prediction);
    }

    let raw = train.predict(model_used, calls_per_asset);
    if !raw.is_finite() {
        return Err(Error::NumericalInstability(format!(
            "{} model produced {} at calls_per_asset={}",
            model_used, raw, calls_per_asset
        )));
    }
    let half_width = interval_z * train.residual_std_density_per_hectare;

    prediction.estimated_density_per_hectare = Some(raw.max(0.0));
    prediction.prediction_interval_approx = Some(PredictionInterval {
        low: (raw - half_width).max(0.0),
        high: (raw + half_width).max(0.0),
    });
    Ok(prediction)
}
