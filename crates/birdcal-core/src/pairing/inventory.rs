//! Survey inventory: the raw records windows are aggregated from.

use birdcal_common::{AruId, AssetId, Error, Result, SurveyId};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::geometry::Bounds;

/// Recording length assumed for an asset with no timed detections (seconds).
pub const DEFAULT_ASSET_SECONDS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyKind {
    Acoustic,
    #[serde(alias = "visual")]
    Drone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: SurveyId,
    #[serde(rename = "type")]
    pub kind: SurveyKind,
    #[serde(default)]
    pub name: Option<String>,
    /// Calendar day of the survey; time of day is discarded.
    #[serde(default, deserialize_with = "deserialize_survey_date")]
    pub date: Option<NaiveDate>,
}

/// Autonomous recording unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aru {
    pub id: AruId,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub name: Option<String>,
}

/// One acoustic detection on an audio asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcousticDetection {
    pub class_name: String,
    /// Offset of the detection end within the recording, in seconds.
    #[serde(default)]
    pub end_time: Option<f64>,
}

/// An audio file or a georeferenced drone image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: AssetId,
    pub survey_id: SurveyId,
    #[serde(default)]
    pub aru_id: Option<AruId>,
    #[serde(default)]
    pub lat_tl: Option<f64>,
    #[serde(default)]
    pub lon_tl: Option<f64>,
    #[serde(default)]
    pub lat_br: Option<f64>,
    #[serde(default)]
    pub lon_br: Option<f64>,
    #[serde(default)]
    pub acoustic_detections: Vec<AcousticDetection>,
    #[serde(default)]
    pub visual_detection_count: u64,
}

impl MediaAsset {
    /// Top-left and bottom-right corners, when all four coordinates are set.
    pub fn corners(&self) -> Option<[(f64, f64); 2]> {
        match (self.lat_tl, self.lon_tl, self.lat_br, self.lon_br) {
            (Some(lat_tl), Some(lon_tl), Some(lat_br), Some(lon_br)) => {
                Some([(lat_tl, lon_tl), (lat_br, lon_br)])
            }
            _ => None,
        }
    }

    /// Recording length estimate: the latest detection end, or five minutes.
    pub fn recorded_seconds(&self) -> f64 {
        self.acoustic_detections
            .iter()
            .filter_map(|d| d.end_time)
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |m| m.max(t))))
            .unwrap_or(DEFAULT_ASSET_SECONDS)
    }
}

/// Everything a rebuild reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyInventory {
    #[serde(default)]
    pub surveys: Vec<Survey>,
    #[serde(default)]
    pub arus: Vec<Aru>,
    #[serde(default)]
    pub assets: Vec<MediaAsset>,
}

impl SurveyInventory {
    /// Parse and validate an inventory from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let inventory: SurveyInventory = serde_json::from_str(json)?;
        inventory.validate()?;
        Ok(inventory)
    }

    /// Reject duplicate ids, dangling survey references, and non-finite
    /// coordinates.
    pub fn validate(&self) -> Result<()> {
        let mut survey_ids = BTreeSet::new();
        for s in &self.surveys {
            if !survey_ids.insert(s.id) {
                return Err(Error::InvalidInventory(format!("duplicate survey id {}", s.id)));
            }
        }

        let mut aru_ids = BTreeSet::new();
        for a in &self.arus {
            if !aru_ids.insert(a.id) {
                return Err(Error::InvalidInventory(format!("duplicate ARU id {}", a.id)));
            }
            if !a.lat.is_finite() || !a.lon.is_finite() {
                return Err(Error::InvalidInventory(format!(
                    "ARU {} has non-finite location ({}, {})",
                    a.id, a.lat, a.lon
                )));
            }
        }

        let mut asset_ids = BTreeSet::new();
        for asset in &self.assets {
            if !asset_ids.insert(asset.id) {
                return Err(Error::InvalidInventory(format!("duplicate asset id {}", asset.id)));
            }
            if !survey_ids.contains(&asset.survey_id) {
                return Err(Error::InvalidInventory(format!(
                    "asset {} references unknown survey {}",
                    asset.id, asset.survey_id
                )));
            }
            let coords = [asset.lat_tl, asset.lon_tl, asset.lat_br, asset.lon_br];
            if coords.iter().flatten().any(|c| !c.is_finite()) {
                return Err(Error::InvalidInventory(format!(
                    "asset {} has a non-finite corner coordinate",
                    asset.id
                )));
            }
            if let Some(t) = asset.acoustic_detections.iter().filter_map(|d| d.end_time).find(|t| !t.is_finite()) {
                return Err(Error::InvalidInventory(format!(
                    "asset {} has a detection ending at {}",
                    asset.id, t
                )));
            }
        }

        Ok(())
    }

    /// Indexed view for aggregation queries.
    pub fn index(&self) -> InventoryIndex<'_> {
        let mut assets_by_survey: BTreeMap<SurveyId, Vec<&MediaAsset>> = BTreeMap::new();
        for asset in &self.assets {
            assets_by_survey.entry(asset.survey_id).or_default().push(asset);
        }
        for assets in assets_by_survey.values_mut() {
            assets.sort_by_key(|a| a.id);
        }
        InventoryIndex {
            surveys: self.surveys.iter().map(|s| (s.id, s)).collect(),
            arus: self.arus.iter().map(|a| (a.id, a)).collect(),
            assets_by_survey,
        }
    }
}

/// Per-ARU acoustic totals for one survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcousticMetrics {
    pub acoustic_call_count: u64,
    pub acoustic_asset_count: u64,
    pub acoustic_calls_per_asset: f64,
    pub species_call_counts: BTreeMap<String, u64>,
    /// Summed recording length in hours; `None` when there are no assets.
    pub effort_hours: Option<f64>,
}

/// Detection totals for one drone survey.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroneMetrics {
    pub drone_detection_count: u64,
    pub drone_area_hectares: f64,
    pub drone_density_per_hectare: f64,
}

/// Lookup tables over a [`SurveyInventory`].
#[derive(Debug, Clone)]
pub struct InventoryIndex<'a> {
    pub surveys: BTreeMap<SurveyId, &'a Survey>,
    pub arus: BTreeMap<AruId, &'a Aru>,
    assets_by_survey: BTreeMap<SurveyId, Vec<&'a MediaAsset>>,
}

impl<'a> InventoryIndex<'a> {
    /// Assets of a survey in id order.
    pub fn assets(&self, survey_id: SurveyId) -> &[&'a MediaAsset] {
        self.assets_by_survey
            .get(&survey_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Surveys of one kind in id order.
    pub fn surveys_of(&self, kind: SurveyKind) -> Vec<&'a Survey> {
        self.surveys.values().copied().filter(|s| s.kind == kind).collect()
    }

    /// Distinct ARUs that recorded in a survey.
    pub fn aru_ids(&self, survey_id: SurveyId) -> BTreeSet<AruId> {
        self.assets(survey_id).iter().filter_map(|a| a.aru_id).collect()
    }

    /// Bounding box of every asset footprint with complete coordinates.
    pub fn survey_bounds(&self, survey_id: SurveyId) -> Option<Bounds> {
        Bounds::from_corners(
            self.assets(survey_id)
                .iter()
                .filter_map(|a| a.corners())
                .flatten(),
        )
    }

    pub fn acoustic_metrics(&self, survey_id: SurveyId, aru_id: AruId) -> AcousticMetrics {
        let assets: Vec<&MediaAsset> = self
            .assets(survey_id)
            .iter()
            .copied()
            .filter(|a| a.aru_id == Some(aru_id))
            .collect();

        let mut species_call_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut call_count = 0u64;
        for asset in &assets {
            for det in &asset.acoustic_detections {
                call_count += 1;
                *species_call_counts.entry(det.class_name.clone()).or_default() += 1;
            }
        }

        let asset_count = assets.len() as u64;
        let effort_hours = (!assets.is_empty())
            .then(|| assets.iter().map(|a| a.recorded_seconds()).sum::<f64>() / 3600.0);

        AcousticMetrics {
            acoustic_call_count: call_count,
            acoustic_asset_count: asset_count,
            acoustic_calls_per_asset: birdcal_common::window::calls_per_asset(call_count, asset_count),
            species_call_counts,
            effort_hours,
        }
    }

    pub fn drone_metrics(&self, survey_id: SurveyId) -> DroneMetrics {
        let detections: u64 = self
            .assets(survey_id)
            .iter()
            .fold(0u64, |acc, a| acc.saturating_add(a.visual_detection_count));
        let area = self
            .survey_bounds(survey_id)
            .map(|b| b.area_hectares())
            .unwrap_or(0.0);
        DroneMetrics {
            drone_detection_count: detections,
            drone_area_hectares: area,
            drone_density_per_hectare: birdcal_common::window::density_per_hectare(detections, area),
        }
    }
}

/// Accept `YYYY-MM-DD`, RFC 3339, or an offset-less ISO datetime.
fn deserialize_survey_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.date_naive()));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|dt| Some(dt.date()))
        .map_err(|e| serde::de::Error::custom(format!("invalid survey date '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = r#"{
        "surveys": [
            {"id": 1, "type": "acoustic", "date": "2025-04-01"},
            {"id": 2, "type": "drone", "date": "2025-04-03T09:30:00Z"}
        ],
        "arus": [{"id": 7, "lat": 10.0, "lon": 20.0}],
        "assets": [
            {"id": 1, "survey_id": 1, "aru_id": 7, "acoustic_detections": [
                {"class_name": "tern", "end_time": 120.0},
                {"class_name": "tern", "end_time": 1800.0},
                {"class_name": "gull"}
            ]},
            {"id": 2, "survey_id": 1, "aru_id": 7},
            {"id": 3, "survey_id": 2, "lat_tl": 10.001, "lon_tl": 19.999,
             "lat_br": 9.999, "lon_br": 20.001, "visual_detection_count": 4}
        ]
    }"#;

    #[test]
    fn test_parse_and_dates() {
        let inv = SurveyInventory::from_json(INVENTORY).unwrap();
        assert_eq!(inv.surveys[0].date, NaiveDate::from_ymd_opt(2025, 4, 1));
        assert_eq!(inv.surveys[1].date, NaiveDate::from_ymd_opt(2025, 4, 3));
        assert_eq!(inv.surveys[1].kind, SurveyKind::Drone);
    }

    #[test]
    fn test_acoustic_metrics() {
        let inv = SurveyInventory::from_json(INVENTORY).unwrap();
        let idx = inv.index();
        let m = idx.acoustic_metrics(SurveyId(1), AruId(7));
        assert_eq!(m.acoustic_call_count, 3);
        assert_eq!(m.acoustic_asset_count, 2);
        assert_eq!(m.acoustic_calls_per_asset, 1.5);
        assert_eq!(m.species_call_counts["tern"], 2);
        // 1800 s from the latest detection plus 300 s for the silent asset.
        assert!((m.effort_hours.unwrap() - 2100.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn test_drone_metrics() {
        let inv = SurveyInventory::from_json(INVENTORY).unwrap();
        let idx = inv.index();
        let m = idx.drone_metrics(SurveyId(2));
        assert_eq!(m.drone_detection_count, 4);
        assert!(m.drone_area_hectares > 0.0);
        assert!((m.drone_density_per_hectare * m.drone_area_hectares - 4.0).abs() < 1e-9);
        assert!(idx.survey_bounds(SurveyId(1)).is_none());
    }

    #[test]
    fn test_drone_detections_saturate() {
        let json = r#"{
            "surveys": [{"id": 2, "type": "drone"}],
            "assets": [
                {"id": 1, "survey_id": 2, "lat_tl": 0.001, "lon_tl": 0.0,
                 "lat_br": 0.0, "lon_br": 0.001, "visual_detection_count": 18446744073709551615},
                {"id": 2, "survey_id": 2, "visual_detection_count": 18446744073709551615}
            ]
        }"#;
        let inv = SurveyInventory::from_json(json).unwrap();
        let m = inv.index().drone_metrics(SurveyId(2));
        assert_eq!(m.drone_detection_count, u64::MAX);
        assert!(m.drone_density_per_hectare.is_finite());
    }

    #[test]
    fn test_validate_dangling_survey() {
        let json = r#"{"surveys": [], "assets": [{"id": 1, "survey_id": 9}]}"#;
        let err = SurveyInventory::from_json(json).unwrap_err();
        assert_eq!(err.code(), 22);
    }

    #[test]
    fn test_validate_duplicate_aru() {
        let json = r#"{"arus": [{"id": 1, "lat": 0, "lon": 0}, {"id": 1, "lat": 1, "lon": 1}]}"#;
        assert!(SurveyInventory::from_json(json).is_err());
    }
}
