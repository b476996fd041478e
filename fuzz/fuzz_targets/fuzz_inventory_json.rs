//! Fuzz target for survey inventories.
//!
//! Rebuild must either fail cleanly or produce windows that pass the
//! upstream-data check.

#![no_main]

use birdcal_core::pairing::{rebuild_windows, RebuildOptions, SurveyInventory};
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(inventory) = SurveyInventory::from_json(text) else {
        return;
    };
    let Some(created_at) = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single() else {
        return;
    };
    if let Ok(outcome) = rebuild_windows(&inventory, &RebuildOptions::default(), created_at) {
        assert_eq!(outcome.report.created_windows, outcome.windows.len());
        for window in &outcome.windows {
            assert!(window.drone_area_hectares > 0.0);
        }
    }
});
