//! Window rebuild: pair every ARU deployment with every nearby drone survey.

use birdcal_common::{CalibrationWindow, Error, Result, WindowDraft, WindowId};
use birdcal_config::RebuildPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::inventory::{SurveyInventory, SurveyKind};

/// Pairing tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildOptions {
    pub max_days_apart: u32,
    pub buffer_meters: f64,
    pub min_acoustic_calls: u64,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        RebuildOptions::from(&RebuildPolicy::default())
    }
}

impl From<&RebuildPolicy> for RebuildOptions {
    fn from(policy: &RebuildPolicy) -> Self {
        Self {
            max_days_apart: policy.max_days_apart,
            buffer_meters: policy.buffer_meters,
            min_acoustic_calls: policy.min_acoustic_calls,
        }
    }
}

/// Counters echoed by a rebuild, plus the parameters that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub created_windows: usize,
    pub skipped_candidates: usize,
    pub max_days_apart: u32,
    pub buffer_meters: f64,
    pub min_acoustic_calls: u64,
}

/// The replacement window set and its report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildOutcome {
    #[serde(flatten)]
    pub report: RebuildReport,
    pub windows: Vec<CalibrationWindow>,
}

/// Rebuild the full window set from an inventory.
///
/// Windows get ids `1..=n` in candidate order (acoustic survey, ARU, drone
/// survey, all ascending). Candidates that cannot be evaluated are counted in
/// `skipped_candidates`: an unknown ARU, too few calls, a missing survey
/// date, a drone survey without footprint, or a zero-area footprint.
/// Candidates that are simply too far apart in time or space are not counted.
pub fn rebuild_windows(
    inventory: &SurveyInventory,
    options: &RebuildOptions,
    created_at: DateTime<Utc>,
) -> Result<RebuildOutcome> {
    if !options.buffer_meters.is_finite() || options.buffer_meters < 0.0 {
        return Err(Error::InvalidParameter {
            name: "buffer_meters".to_string(),
            reason: format!("must be a non-negative number, got {}", options.buffer_meters),
        });
    }
    inventory.validate()?;

    let index = inventory.index();
    let acoustic_surveys = index.surveys_of(SurveyKind::Acoustic);
    let drone_surveys = index.surveys_of(SurveyKind::Drone);

    let mut windows = Vec::new();
    let mut skipped = 0usize;

    for acoustic in &acoustic_surveys {
        for aru_id in index.aru_ids(acoustic.id) {
            let Some(aru) = index.arus.get(&aru_id) else {
                debug!(acoustic_survey_id = %acoustic.id, aru_id = %aru_id, "unknown ARU");
                skipped += 1;
                continue;
            };

            let acoustic_m = index.acoustic_metrics(acoustic.id, aru_id);
            if acoustic_m.acoustic_call_count < options.min_acoustic_calls {
                skipped += 1;
                continue;
            }

            for drone in &drone_surveys {
                let (Some(drone_date), Some(acoustic_date)) = (drone.date, acoustic.date) else {
                    skipped += 1;
                    continue;
                };
                let days_apart = (drone_date - acoustic_date).num_days().unsigned_abs();
                if days_apart > u64::from(options.max_days_apart) {
                    continue;
                }

                let Some(bounds) = index.survey_bounds(drone.id) else {
                    skipped += 1;
                    continue;
                };
                if !bounds.contains_with_buffer(aru.lat, aru.lon, options.buffer_meters) {
                    continue;
                }

                let drone_m = index.drone_metrics(drone.id);
                if drone_m.drone_area_hectares <= 0.0 {
                    skipped += 1;
                    continue;
                }

                let id = WindowId(windows.len() as u64 + 1);
                let draft = WindowDraft {
                    acoustic_survey_id: acoustic.id,
                    visual_survey_id: drone.id,
                    aru_id,
                    // Bounded by max_days_apart above.
                    days_apart: days_apart as u32,
                    buffer_meters: options.buffer_meters,
                    acoustic_call_count: acoustic_m.acoustic_call_count,
                    acoustic_asset_count: acoustic_m.acoustic_asset_count,
                    drone_detection_count: drone_m.drone_detection_count,
                    drone_area_hectares: drone_m.drone_area_hectares,
                    species_call_counts: acoustic_m.species_call_counts.clone(),
                    effort_hours: acoustic_m.effort_hours,
                };
                windows.push(draft.into_window(id, created_at));
            }
        }
    }

    info!(
        created = windows.len(),
        skipped,
        max_days_apart = options.max_days_apart,
        buffer_meters = options.buffer_meters,
        "calibration windows rebuilt"
    );

    Ok(RebuildOutcome {
        report: RebuildReport {
            created_windows: windows.len(),
            skipped_candidates: skipped,
            max_days_apart: options.max_days_apart,
            buffer_meters: options.buffer_meters,
            min_acoustic_calls: options.min_acoustic_calls,
        },
        windows,
    })
}
