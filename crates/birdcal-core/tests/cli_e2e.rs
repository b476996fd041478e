//! End-to-end tests for the `birdcal` binary.
//!
//! Every invocation runs with config lookup pinned to an empty temp dir so a
//! developer's own policy file cannot leak into the results.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .display()
        .to_string()
}

/// Get a Command for the birdcal binary with isolated config lookup.
fn birdcal(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("birdcal").expect("birdcal binary should exist");
    cmd.env_remove("BIRDCAL_POLICY")
        .env_remove("BIRDCAL_LOG")
        .env_remove("RUST_LOG")
        .env("BIRDCAL_CONFIG_DIR", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path());
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// Backtest
// ============================================================================

mod backtest {
    use super::*;

    #[test]
    fn three_surveys_give_overall_metrics() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args(["backtest", "--windows", &fixture("windows.json")])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(0));
        let report = stdout_json(&output);
        assert_eq!(report["window_count"], 9);
        assert_eq!(report["rejected_windows"], 1);
        assert_eq!(report["folds"].as_array().unwrap().len(), 3);
        for fold in report["folds"].as_array().unwrap() {
            assert_eq!(fold["train_windows"], 6);
            assert_eq!(fold["test_windows"], 3);
        }
        let model = report["overall"]["recommended_model"].as_str().unwrap();
        assert!(model == "linear" || model == "quadratic");
        assert_eq!(
            report["feature_names"][0].as_str(),
            Some("calls_per_hour")
        );
    }

    #[test]
    fn single_survey_exits_with_insufficient_data() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args(["backtest", "-w", &fixture("windows_single_survey.json")])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(1));
        let report = stdout_json(&output);
        assert!(report["folds"].as_array().unwrap().is_empty());
        assert!(report.get("overall").is_none());
        assert_eq!(
            report["message"],
            "Need at least 2 drone surveys for grouped backtest."
        );
    }

    #[test]
    fn min_calls_flag_overrides_policy() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args(["backtest", "-w", &fixture("windows.json"), "--min-calls", "7"])
            .output()
            .unwrap();

        // Only windows with >= 7 calls remain: ids 6, 8, 9.
        let report = stdout_json(&output);
        assert_eq!(report["window_count"], 3);
        assert!(report["folds"].as_array().unwrap().is_empty());
    }

    #[test]
    fn summary_format_is_one_line() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .args(["-f", "summary", "backtest", "-w", &fixture("windows.json")])
            .assert()
            .success()
            .stdout(predicate::str::contains("3 folds over 9 windows"));
    }

    #[test]
    fn markdown_format_has_fold_table() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .args(["--format", "md", "backtest", "-w", &fixture("windows.json")])
            .assert()
            .success()
            .stdout(predicate::str::contains("# Grouped backtest"))
            .stdout(predicate::str::contains("| held-out survey |"));
    }

    #[test]
    fn bad_margin_is_args_error() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .args([
                "backtest",
                "-w",
                &fixture("windows.json"),
                "--quadratic-min-improvement",
                "1.5",
            ])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("\"code\":12"));
    }

    #[test]
    fn windows_from_stdin() {
        let home = TempDir::new().unwrap();
        let json = std::fs::read_to_string(fixture("windows.json")).unwrap();
        birdcal(&home)
            .args(["backtest", "-w", "-"])
            .write_stdin(json)
            .assert()
            .success();
    }

    #[test]
    fn malformed_windows_is_input_error() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .args(["backtest", "-w", "-"])
            .write_stdin("[{\"id\": 1}]")
            .assert()
            .code(12)
            .stderr(predicate::str::contains("\"category\":\"io\""));
    }

    #[test]
    fn missing_windows_file_is_io_error() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .args(["backtest", "-w", "/nonexistent/windows.json"])
            .assert()
            .code(21);
    }
}

// ============================================================================
// Windows, summary, train, predict, curve
// ============================================================================

mod commands {
    use super::*;

    #[test]
    fn windows_list_orders_and_limits() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args(["windows", "list", "-w", &fixture("windows.json"), "--limit", "3"])
            .output()
            .unwrap();

        assert!(output.status.success());
        let rows = stdout_json(&output);
        let ids: Vec<u64> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["id"].as_u64().unwrap())
            .collect();
        // days_apart 0 holds ids 4, 8, 10; newest id first.
        assert_eq!(ids, vec![10, 8, 4]);
    }

    #[test]
    fn windows_rebuild_pairs_inventory() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args(["windows", "rebuild", "--inventory", &fixture("inventory.json")])
            .output()
            .unwrap();

        assert!(output.status.success());
        let outcome = stdout_json(&output);
        assert_eq!(outcome["created_windows"], 1);
        assert_eq!(outcome["skipped_candidates"], 0);
        assert_eq!(outcome["max_days_apart"], 14);
        let window = &outcome["windows"][0];
        assert_eq!(window["days_apart"], 2);
        assert_eq!(window["acoustic_call_count"], 4);
        assert_eq!(window["acoustic_calls_per_asset"], 2.0);
        assert_eq!(window["drone_detection_count"], 4);
    }

    #[test]
    fn windows_rebuild_output_file_feeds_backtest() {
        let home = TempDir::new().unwrap();
        let out = home.path().join("rebuilt.json");
        let output = birdcal(&home)
            .args(["windows", "rebuild", "-i", &fixture("inventory.json"), "-o"])
            .arg(&out)
            .output()
            .unwrap();

        assert!(output.status.success());
        let report = stdout_json(&output);
        assert!(report.get("windows").is_none());
        assert!(out.exists());

        // One window is too few to backtest, but the file parses.
        birdcal(&home)
            .args(["backtest", "-w"])
            .arg(&out)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Not enough windows"));
    }

    #[test]
    fn rebuild_tight_day_window_creates_nothing() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args([
                "windows",
                "rebuild",
                "-i",
                &fixture("inventory.json"),
                "--max-days-apart",
                "1",
            ])
            .output()
            .unwrap();
        let outcome = stdout_json(&output);
        assert_eq!(outcome["created_windows"], 0);
        assert!(outcome["windows"].as_array().unwrap().is_empty());
    }

    #[test]
    fn summary_reports_median_factor() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args(["summary", "-w", &fixture("windows.json")])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(0));
        let summary = stdout_json(&output);
        // The zero-area window counts but is not usable.
        assert_eq!(summary["window_count"], 10);
        assert_eq!(summary["rejected_windows"], 1);
        let factor = summary["simple_factor_density_per_call_per_asset"]
            .as_f64()
            .unwrap();
        assert!(factor > 1.5 && factor < 2.5, "factor {}", factor);
    }

    #[test]
    fn train_reports_models() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args(["train", "-w", &fixture("windows.json")])
            .output()
            .unwrap();

        assert!(output.status.success());
        let train = stdout_json(&output);
        assert_eq!(train["window_count"], 9);
        assert!(train["linear_model"]["slope"].as_f64().unwrap() > 1.0);
        assert_eq!(
            train["species_features"],
            serde_json::json!(["Common Tern", "Herring Gull"])
        );
        assert!(train["multi_feature_model"]["coefficients"].is_array());
    }

    #[test]
    fn predict_from_counts() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args([
                "predict",
                "-w",
                &fixture("windows.json"),
                "--calls",
                "6",
                "--assets",
                "2",
                "--model",
                "linear",
                "--species",
                "Common Tern=4",
            ])
            .output()
            .unwrap();

        assert!(output.status.success());
        let p = stdout_json(&output);
        assert_eq!(p["model_used"], "linear");
        let est = p["estimated_density_per_hectare"].as_f64().unwrap();
        assert!(est > 4.0 && est < 8.0, "estimate {}", est);
        let low = p["prediction_interval_approx"]["low"].as_f64().unwrap();
        let high = p["prediction_interval_approx"]["high"].as_f64().unwrap();
        assert!(low >= 0.0 && low <= est && est <= high);
        assert_eq!(p["training_window_count"], 9);
    }

    #[test]
    fn predict_from_inventory() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args([
                "predict",
                "-w",
                &fixture("windows.json"),
                "--inventory",
                &fixture("inventory.json"),
                "--survey",
                "1",
                "--aru",
                "10",
            ])
            .output()
            .unwrap();

        assert!(output.status.success());
        let p = stdout_json(&output);
        assert_eq!(p["aru_id"], 10);
        assert_eq!(p["acoustic_survey_id"], 1);
        assert!((p["effort_hours_estimated"].as_f64().unwrap() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn predict_unknown_model_is_args_error() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .args([
                "predict",
                "-w",
                &fixture("windows.json"),
                "--calls",
                "6",
                "--assets",
                "2",
                "--model",
                "cubic",
            ])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("cubic"));
    }

    #[test]
    fn curve_samples_requested_count() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home)
            .args(["curve", "-w", &fixture("windows.json"), "--sample-count", "5"])
            .output()
            .unwrap();

        assert!(output.status.success());
        let curve = stdout_json(&output);
        let samples = curve["samples"].as_array().unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0]["x"], 0.0);
        assert_eq!(samples[4]["x"], 5.0);
        assert_eq!(curve["x_max"], 5.0);
    }
}

// ============================================================================
// Config and version
// ============================================================================

mod config {
    use super::*;

    const POLICY: &str = r#"{
        "schema_version": "1.0.0",
        "backtest": {"min_calls": 7},
        "curve": {"sample_count": 4}
    }"#;

    #[test]
    fn show_defaults_without_policy_file() {
        let home = TempDir::new().unwrap();
        let output = birdcal(&home).args(["config", "show"]).output().unwrap();

        assert!(output.status.success());
        let shown = stdout_json(&output);
        assert_eq!(shown["source"]["policy_source"], "builtin default");
        assert_eq!(shown["policy"]["backtest"]["min_calls"], 1);
    }

    #[test]
    fn config_dir_policy_drives_commands() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("policy.json"), POLICY).unwrap();

        let output = birdcal(&home)
            .args(["curve", "-w", &fixture("windows.json")])
            .output()
            .unwrap();
        let curve = stdout_json(&output);
        assert_eq!(curve["samples"].as_array().unwrap().len(), 4);
        assert_eq!(curve["window_count"], 3);
    }

    #[test]
    fn validate_good_and_bad_policies() {
        let home = TempDir::new().unwrap();
        let good = home.path().join("good.json");
        std::fs::write(&good, POLICY).unwrap();
        birdcal(&home)
            .args(["config", "validate"])
            .arg(&good)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"valid\": true"));

        let bad = home.path().join("bad.json");
        std::fs::write(
            &bad,
            r#"{"schema_version": "1.0.0", "prediction": {"interval_z": -1.0}}"#,
        )
        .unwrap();
        birdcal(&home)
            .args(["config", "validate"])
            .arg(&bad)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("interval_z"));
    }

    #[test]
    fn validate_missing_file_fails() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .args(["config", "validate", "/nonexistent/policy.json"])
            .assert()
            .code(21);
    }

    #[test]
    fn version_reports_schema() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"name\":\"birdcal\""));
    }

    #[test]
    fn unknown_command_fails() {
        let home = TempDir::new().unwrap();
        birdcal(&home)
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }
}
