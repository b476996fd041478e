//! Grouped backtest scenarios.
//!
//! Exercises the leave-one-drone-survey-out contract end to end through the
//! public library API: fold eligibility, min-calls filtering, survey
//! separation, and the linear/quadratic recommendation.

use birdcal_common::{AruId, CalibrationWindow, SurveyId, WindowDraft, WindowId};
use birdcal_core::calibrate::{
    backtest, train_summary, BacktestOptions, RecommendedModel, MIN_FOLD_WINDOWS,
};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn window(id: u64, visual: u64, calls: u64, x: f64, y: f64) -> CalibrationWindow {
    let draft = WindowDraft {
        acoustic_survey_id: SurveyId(1000 + id),
        visual_survey_id: SurveyId(visual),
        aru_id: AruId(id),
        days_apart: 0,
        buffer_meters: 150.0,
        acoustic_call_count: calls,
        acoustic_asset_count: 2,
        drone_detection_count: 4,
        drone_area_hectares: 1.0,
        species_call_counts: BTreeMap::new(),
        effort_hours: None,
    };
    let created_at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let mut w = draft.into_window(WindowId(id), created_at);
    w.acoustic_calls_per_asset = x;
    w.drone_density_per_hectare = y;
    w
}

fn options() -> BacktestOptions {
    BacktestOptions::default()
}

#[test]
fn single_visual_survey_gives_no_folds() {
    let windows: Vec<_> = (1..=4)
        .map(|i| window(i, 7, 10, i as f64, 2.0 * i as f64))
        .collect();
    let report = backtest(&windows, &options()).unwrap();

    assert_eq!(report.window_count, 4);
    assert!(report.folds.is_empty());
    assert!(report.overall.is_none());
    assert_eq!(
        report.message.as_deref(),
        Some("Need at least 2 drone surveys for grouped backtest.")
    );
}

#[test]
fn windows_under_min_calls_never_reach_a_fold() {
    let mut windows = Vec::new();
    for survey in 1..=3u64 {
        for k in 0..3u64 {
            let id = survey * 10 + k;
            let x = (survey + k) as f64;
            windows.push(window(id, survey, 20, x, 1.5 * x + 0.3));
        }
        // Would be an extreme outlier if it leaked into a fold.
        windows.push(window(survey * 10 + 9, survey, 2, 50.0, 0.0));
    }

    let opts = BacktestOptions {
        min_calls: 5,
        ..options()
    };
    let report = backtest(&windows, &opts).unwrap();

    assert_eq!(report.window_count, 9);
    assert_eq!(report.folds.len(), 3);
    for fold in &report.folds {
        assert_eq!(fold.test_windows, 3);
        assert_eq!(fold.train_windows, 6);
    }
    let overall = report.overall.expect("three folds give overall metrics");
    assert!(overall.linear.rmse < 1e-9, "rmse {}", overall.linear.rmse);
}

#[test]
fn undersized_folds_are_skipped_not_scored() {
    // Survey 3 has a single window: its fold is dropped, but its window still
    // trains the other folds.
    let windows = vec![
        window(1, 1, 10, 1.0, 2.0),
        window(2, 1, 10, 2.0, 4.1),
        window(3, 2, 10, 3.0, 5.9),
        window(4, 2, 10, 4.0, 8.2),
        window(5, 3, 10, 5.0, 9.9),
    ];
    let report = backtest(&windows, &options()).unwrap();

    let held_out: Vec<_> = report.folds.iter().map(|f| f.held_out_visual_survey_id).collect();
    assert_eq!(held_out, vec![SurveyId(1), SurveyId(2)]);
    assert_eq!(report.folds[0].train_windows, 3);
    assert!(report.overall.is_some());
}

#[test]
fn single_usable_fold_keeps_fold_but_withholds_overall() {
    // Surveys 1 and 3 hold one window each, so only survey 2 can be held out.
    let windows = vec![
        window(1, 1, 10, 1.0, 2.0),
        window(3, 2, 10, 3.0, 6.0),
        window(4, 2, 10, 4.0, 8.0),
        window(5, 2, 10, 5.0, 10.0),
        window(6, 3, 10, 6.0, 12.0),
    ];
    let report = backtest(&windows, &options()).unwrap();

    assert_eq!(report.folds.len(), 1);
    assert_eq!(report.folds[0].held_out_visual_survey_id, SurveyId(2));
    assert_eq!(report.folds[0].train_windows, 2);
    assert!(report.overall.is_none());
    assert!(report.message.as_deref().unwrap_or("").contains("Only 1 usable fold"));
}

#[test]
fn identical_residuals_recommend_linear() {
    // Two distinct x values per training set: quadratic falls back to zero,
    // and with y == 0 the line is zero too.
    let mut windows = Vec::new();
    for survey in 1..=3u64 {
        windows.push(window(survey * 10, survey, 10, 1.0, 0.0));
        windows.push(window(survey * 10 + 1, survey, 10, 2.0, 0.0));
    }
    let report = backtest(&windows, &options()).unwrap();
    let overall = report.overall.unwrap();

    assert_eq!(overall.linear, overall.quadratic);
    assert_eq!(overall.recommended_model, RecommendedModel::Linear);
}

#[test]
fn curved_data_recommends_quadratic() {
    let mut windows = Vec::new();
    for survey in 1..=3u64 {
        for k in 0..4u64 {
            let x = (k * 3 + survey) as f64 * 0.5;
            windows.push(window(survey * 10 + k, survey, 10, x, 0.5 + 0.2 * x + 0.8 * x * x));
        }
    }
    let report = backtest(&windows, &options()).unwrap();
    let overall = report.overall.as_ref().unwrap();

    assert!(overall.quadratic.rmse < overall.linear.rmse);
    assert_eq!(overall.recommended_model, RecommendedModel::Quadratic);
    assert_eq!(report.recommended_model(), Some(RecommendedModel::Quadratic));
}

#[test]
fn rejected_windows_are_counted_not_fitted() {
    let mut windows: Vec<_> = (1..=6)
        .map(|i| window(i, (i + 1) / 2, 10, i as f64, 3.0 * i as f64))
        .collect();
    let mut bad = window(99, 1, 10, 1.0, 1000.0);
    bad.drone_area_hectares = 0.0;
    windows.push(bad);

    let report = backtest(&windows, &options()).unwrap();
    assert_eq!(report.rejected_windows, 1);
    assert_eq!(report.window_count, 6);
    assert!(report.overall.unwrap().linear.rmse < 1e-9);
}

#[test]
fn non_finite_window_is_an_error() {
    let mut windows: Vec<_> = (1..=4).map(|i| window(i, i, 10, 1.0, 1.0)).collect();
    windows[2].acoustic_calls_per_asset = f64::NAN;
    let err = backtest(&windows, &options()).unwrap_err();
    assert_eq!(err.code(), 20);
}

#[test]
fn train_and_backtest_agree_on_feature_names() {
    let mut windows: Vec<_> = (1..=6)
        .map(|i| window(i, (i + 1) / 2, 10, i as f64, 2.0 * i as f64))
        .collect();
    windows[0].species_call_counts.insert("Arctic Tern".to_string(), 8);
    windows[1].species_call_counts.insert("Arctic Tern".to_string(), 2);
    windows[1].species_call_counts.insert("Razorbill".to_string(), 3);

    let report = backtest(&windows, &options()).unwrap();
    let train = train_summary(&windows, &options()).unwrap();

    assert_eq!(report.feature_names, train.feature_names);
    assert_eq!(report.species_features, vec!["Arctic Tern", "Razorbill"]);
    assert_eq!(
        &report.feature_names[2..],
        ["sp_arctic_tern_calls_per_hour", "sp_razorbill_calls_per_hour"]
    );
}

#[test]
fn saturated_species_counts_still_rank_and_fit() {
    let mut windows: Vec<_> = [1u64, 1, 2, 2]
        .iter()
        .enumerate()
        .map(|(i, &survey)| {
            let x = (i + 1) as f64;
            window(i as u64 + 1, survey, 10, x, 2.0 * x)
        })
        .collect();
    for w in &mut windows {
        w.species_call_counts.insert("tern".to_string(), u64::MAX);
    }
    windows[0].species_call_counts.insert("gull".to_string(), 3);

    let report = backtest(&windows, &options()).unwrap();
    assert_eq!(report.species_features, vec!["tern", "gull"]);
    assert_eq!(report.folds.len(), 2);

    let train = train_summary(&windows, &options()).unwrap();
    assert_eq!(train.species_features, report.species_features);
}

proptest! {
    #[test]
    fn folds_hold_out_exactly_one_survey(
        assignments in prop::collection::vec((1u64..6, 0u64..4, 0.0f64..20.0, 0.0f64..50.0), 3..40)
    ) {
        let windows: Vec<_> = assignments
            .iter()
            .enumerate()
            .map(|(i, &(survey, calls, x, y))| window(i as u64 + 1, survey, calls, x, y))
            .collect();
        let opts = BacktestOptions { min_calls: 1, ..BacktestOptions::default() };
        let report = backtest(&windows, &opts).unwrap();

        let eligible: Vec<_> = windows.iter().filter(|w| w.acoustic_call_count >= 1).collect();
        prop_assert_eq!(report.window_count, eligible.len());

        for fold in &report.folds {
            let in_survey = eligible
                .iter()
                .filter(|w| w.visual_survey_id == fold.held_out_visual_survey_id)
                .count();
            prop_assert_eq!(fold.test_windows, in_survey);
            prop_assert_eq!(fold.train_windows + fold.test_windows, eligible.len());
            prop_assert!(fold.train_windows >= MIN_FOLD_WINDOWS);
            prop_assert!(fold.test_windows >= MIN_FOLD_WINDOWS);
            prop_assert!(fold.linear_metrics.rmse.is_finite());
            prop_assert!(fold.quadratic_metrics.rmse.is_finite());
        }
        prop_assert_eq!(report.overall.is_some(), report.folds.len() >= 2);
    }
}
