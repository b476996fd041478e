//! Per-window feature table.
//!
//! Each usable window becomes one row: the target density plus call-rate
//! features normalised by recording effort. The top species by total calls
//! get their own per-hour features.

use birdcal_common::{AruId, CalibrationWindow, SurveyId, WindowId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Calls per hour of recording.
pub const CALLS_PER_HOUR: &str = "calls_per_hour";
/// Calls per recorded asset; the x of the single-feature curves.
pub const CALLS_PER_ASSET: &str = "calls_per_asset";
const FEATURE_SUFFIX: &str = "_calls_per_hour";

/// Effort floor when nothing better is known (five minutes).
pub const MIN_EFFORT_HOURS: f64 = 1.0 / 12.0;
/// Assumed recording length per asset when the effort is unknown.
pub const ASSET_EFFORT_HOURS: f64 = 5.0 / 60.0;

/// One feature row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub window_id: WindowId,
    pub acoustic_survey_id: SurveyId,
    pub visual_survey_id: SurveyId,
    pub aru_id: AruId,
    pub days_apart: u32,
    pub target_density_per_hectare: f64,
    pub effort_hours_estimated: f64,
    pub features: BTreeMap<String, f64>,
}

impl FeatureRow {
    /// Feature values in `names` order; missing features read as 0.
    pub fn vector(&self, names: &[String]) -> Vec<f64> {
        names
            .iter()
            .map(|name| self.features.get(name).copied().unwrap_or(0.0))
            .collect()
    }
}

/// Rows plus the feature schema they share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub feature_names: Vec<String>,
    pub species_features: Vec<String>,
}

impl FeatureTable {
    /// Design matrix and targets, row for row.
    pub fn matrix(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x = self.rows.iter().map(|r| r.vector(&self.feature_names)).collect();
        let y = self.rows.iter().map(|r| r.target_density_per_hectare).collect();
        (x, y)
    }
}

/// Recording effort in hours.
///
/// Uses a known positive effort, otherwise five minutes per asset with a
/// five minute floor.
pub fn effort_hours(known: Option<f64>, asset_count: u64) -> f64 {
    match known {
        Some(h) if h > 0.0 => h,
        _ => MIN_EFFORT_HOURS.max(asset_count as f64 * ASSET_EFFORT_HOURS),
    }
}

/// `sp_<slug>_calls_per_hour`, with non-alphanumeric runs collapsed to `_`.
pub fn safe_feature_name(species: &str) -> String {
    let mut slug = String::with_capacity(species.len());
    let mut pending_sep = false;
    for c in species.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("unknown");
    }
    format!("sp_{}{}", slug, FEATURE_SUFFIX)
}

/// Feature names for `species`, in order.
///
/// Species whose names slug to the same feature get `_2`, `_3`, ... in
/// order of appearance so every column stays distinct.
pub fn species_feature_names(species: &[String]) -> Vec<String> {
    let mut taken: BTreeSet<String> = [CALLS_PER_HOUR, CALLS_PER_ASSET]
        .iter()
        .map(|s| s.to_string())
        .collect();
    species
        .iter()
        .map(|sp| {
            let base = safe_feature_name(sp);
            let mut name = base.clone();
            let mut n = 2;
            while taken.contains(&name) {
                let stem = base.trim_end_matches(FEATURE_SUFFIX);
                name = format!("{}_{}{}", stem, n, FEATURE_SUFFIX);
                n += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// The `n` species with the most calls across `windows`; ties by name.
///
/// Totals saturate at `u64::MAX`.
pub fn top_species(windows: &[&CalibrationWindow], n: usize) -> Vec<String> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for window in windows {
        for (species, count) in &window.species_call_counts {
            let total = totals.entry(species.as_str()).or_default();
            *total = total.saturating_add(*count);
        }
    }

    let mut ranked: Vec<(&str, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(n).map(|(s, _)| s.to_string()).collect()
}

/// Base and species features for one recording.
pub fn feature_map(
    call_count: u64,
    calls_per_asset: f64,
    species_call_counts: &BTreeMap<String, u64>,
    species: &[String],
    effort: f64,
) -> BTreeMap<String, f64> {
    let per_hour = |count: u64| if effort > 0.0 { count as f64 / effort } else { 0.0 };

    let mut map = BTreeMap::new();
    map.insert(CALLS_PER_HOUR.to_string(), per_hour(call_count));
    map.insert(CALLS_PER_ASSET.to_string(), calls_per_asset);
    for (sp, name) in species.iter().zip(species_feature_names(species)) {
        let count = species_call_counts.get(sp).copied().unwrap_or(0);
        map.insert(name, per_hour(count));
    }
    map
}

/// Build the feature table over already-selected windows.
///
/// An empty selection yields an empty schema.
pub fn build_feature_table(windows: &[&CalibrationWindow], top_n: usize) -> FeatureTable {
    if windows.is_empty() {
        return FeatureTable::default();
    }

    let species = top_species(windows, top_n);
    let mut feature_names = vec![CALLS_PER_HOUR.to_string(), CALLS_PER_ASSET.to_string()];
    feature_names.extend(species_feature_names(&species));

    let rows = windows
        .iter()
        .map(|w| {
            let effort = effort_hours(w.effort_hours, w.acoustic_asset_count);
            FeatureRow {
                window_id: w.id,
                acoustic_survey_id: w.acoustic_survey_id,
                visual_survey_id: w.visual_survey_id,
                aru_id: w.aru_id,
                days_apart: w.days_apart,
                target_density_per_hectare: w.drone_density_per_hectare,
                effort_hours_estimated: effort,
                features: feature_map(
                    w.acoustic_call_count,
                    w.acoustic_calls_per_asset,
                    &w.species_call_counts,
                    &species,
                    effort,
                ),
            }
        })
        .collect();

    FeatureTable {
        rows,
        feature_names,
        species_features: species,
    }
}
