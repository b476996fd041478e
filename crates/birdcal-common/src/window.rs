//! Calibration window record.
//!
//! A window pairs one ARU's acoustic survey with one drone survey that covered
//! the ARU location within the day/distance tolerance. Windows are immutable:
//! a rebuild replaces the whole set.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::id::{AruId, SurveyId, WindowId};

/// One paired acoustic/visual observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationWindow {
    pub id: WindowId,
    pub acoustic_survey_id: SurveyId,
    pub visual_survey_id: SurveyId,
    pub aru_id: AruId,
    pub days_apart: u32,
    pub buffer_meters: f64,
    pub acoustic_call_count: u64,
    pub acoustic_asset_count: u64,
    pub acoustic_calls_per_asset: f64,
    pub drone_detection_count: u64,
    pub drone_area_hectares: f64,
    pub drone_density_per_hectare: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,

    /// Per-species acoustic call counts for this window's ARU and survey.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub species_call_counts: BTreeMap<String, u64>,

    /// Recording effort behind `acoustic_call_count`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort_hours: Option<f64>,
}

/// Why a structurally valid window is unusable for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// `drone_area_hectares <= 0`; density would be a divide-by-zero artifact.
    NonPositiveArea,
    /// A derived rate is negative, which counts cannot produce.
    NegativeRate,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NonPositiveArea => write!(f, "non-positive drone area"),
            RejectReason::NegativeRate => write!(f, "negative derived rate"),
        }
    }
}

/// Outcome of the upstream-data check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Usable,
    Rejected(RejectReason),
}

impl CalibrationWindow {
    /// The regression point `(calls_per_asset, density_per_hectare)`.
    pub fn point(&self) -> (f64, f64) {
        (self.acoustic_calls_per_asset, self.drone_density_per_hectare)
    }

    /// Check the window for upstream data-quality problems.
    ///
    /// Non-finite numbers are a hard error. A non-positive area or negative
    /// rate marks the window as rejected; callers exclude it from fitting.
    pub fn check(&self) -> Result<WindowStatus> {
        let floats = [
            ("buffer_meters", self.buffer_meters),
            ("acoustic_calls_per_asset", self.acoustic_calls_per_asset),
            ("drone_area_hectares", self.drone_area_hectares),
            ("drone_density_per_hectare", self.drone_density_per_hectare),
        ];
        for (field, value) in floats {
            if !value.is_finite() {
                return Err(Error::invalid_window(self.id, field, format!("is {}", value)));
            }
        }
        if let Some(effort) = self.effort_hours {
            if !effort.is_finite() {
                return Err(Error::invalid_window(self.id, "effort_hours", format!("is {}", effort)));
            }
        }

        if self.drone_area_hectares <= 0.0 {
            return Ok(WindowStatus::Rejected(RejectReason::NonPositiveArea));
        }
        if self.acoustic_calls_per_asset < 0.0 || self.drone_density_per_hectare < 0.0 {
            return Ok(WindowStatus::Rejected(RejectReason::NegativeRate));
        }
        Ok(WindowStatus::Usable)
    }

    /// Total of the per-species call counts, saturating at `u64::MAX`.
    pub fn species_call_total(&self) -> u64 {
        self.species_call_counts
            .values()
            .fold(0u64, |acc, &c| acc.saturating_add(c))
    }
}

/// Counts for a window before it is assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDraft {
    pub acoustic_survey_id: SurveyId,
    pub visual_survey_id: SurveyId,
    pub aru_id: AruId,
    pub days_apart: u32,
    pub buffer_meters: f64,
    pub acoustic_call_count: u64,
    pub acoustic_asset_count: u64,
    pub drone_detection_count: u64,
    pub drone_area_hectares: f64,
    pub species_call_counts: BTreeMap<String, u64>,
    pub effort_hours: Option<f64>,
}

impl WindowDraft {
    /// Finalize the draft, deriving the per-asset and per-hectare rates.
    pub fn into_window(self, id: WindowId, created_at: DateTime<Utc>) -> CalibrationWindow {
        CalibrationWindow {
            id,
            acoustic_survey_id: self.acoustic_survey_id,
            visual_survey_id: self.visual_survey_id,
            aru_id: self.aru_id,
            days_apart: self.days_apart,
            buffer_meters: self.buffer_meters,
            acoustic_call_count: self.acoustic_call_count,
            acoustic_asset_count: self.acoustic_asset_count,
            acoustic_calls_per_asset: calls_per_asset(self.acoustic_call_count, self.acoustic_asset_count),
            drone_detection_count: self.drone_detection_count,
            drone_area_hectares: self.drone_area_hectares,
            drone_density_per_hectare: density_per_hectare(self.drone_detection_count, self.drone_area_hectares),
            created_at,
            species_call_counts: self.species_call_counts,
            effort_hours: self.effort_hours,
        }
    }
}

/// `calls / assets`, or 0 when there are no assets.
pub fn calls_per_asset(call_count: u64, asset_count: u64) -> f64 {
    if asset_count == 0 {
        0.0
    } else {
        call_count as f64 / asset_count as f64
    }
}

/// `detections / hectares`, or 0 when the area is not positive.
pub fn density_per_hectare(detection_count: u64, area_hectares: f64) -> f64 {
    if area_hectares > 0.0 {
        detection_count as f64 / area_hectares
    } else {
        0.0
    }
}

/// Accept RFC 3339 timestamps and the backend's offset-less ISO form.
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
}
