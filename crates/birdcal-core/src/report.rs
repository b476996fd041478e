//! Rendering of command payloads for the `md` and `summary` output formats.
//!
//! JSON output is the payload serialized as-is; the shapes match the
//! calibration API responses.

use birdcal_common::{CalibrationWindow, OutputFormat};
use birdcal_config::LoadedPolicy;
use birdcal_math::RegressionMetrics;
use serde::Serialize;
use std::fmt::Write;

use crate::calibrate::{BacktestReport, CurveSummary, DensityPrediction, FittedCurve, TrainSummary};
use crate::exit_codes::ExitCode;
use crate::pairing::RebuildOutcome;

/// A command payload that can be printed in every output format.
pub trait Report: Serialize {
    /// One line for `--format summary`.
    fn summary_line(&self) -> String;

    /// Markdown for `--format md`.
    fn to_markdown(&self) -> String;

    /// Exit code for a successfully computed payload.
    fn exit_code(&self) -> ExitCode {
        ExitCode::Clean
    }

    fn render(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self),
            OutputFormat::Md => Ok(self.to_markdown()),
            OutputFormat::Summary => Ok(self.summary_line()),
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

fn metrics_row(out: &mut String, label: &str, m: &RegressionMetrics) {
    let _ = writeln!(out, "| {} | {:.4} | {:.4} | {:.4} |", label, m.rmse, m.mae, m.r2);
}

impl Report for Vec<CalibrationWindow> {
    fn summary_line(&self) -> String {
        format!("{} calibration windows", self.len())
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Calibration windows\n\n");
        out.push_str("| id | acoustic | visual | aru | days | calls/asset | density/ha |\n");
        out.push_str("|---:|---:|---:|---:|---:|---:|---:|\n");
        for w in self {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {:.3} | {:.3} |",
                w.id,
                w.acoustic_survey_id,
                w.visual_survey_id,
                w.aru_id,
                w.days_apart,
                w.acoustic_calls_per_asset,
                w.drone_density_per_hectare
            );
        }
        out
    }
}

impl Report for RebuildOutcome {
    fn summary_line(&self) -> String {
        format!(
            "rebuilt {} windows ({} candidates skipped, max {} days, {} m buffer)",
            self.report.created_windows,
            self.report.skipped_candidates,
            self.report.max_days_apart,
            self.report.buffer_meters
        )
    }

    fn to_markdown(&self) -> String {
        let r = &self.report;
        let mut out = String::from("# Window rebuild\n\n");
        let _ = writeln!(out, "- created windows: {}", r.created_windows);
        let _ = writeln!(out, "- skipped candidates: {}", r.skipped_candidates);
        let _ = writeln!(out, "- max days apart: {}", r.max_days_apart);
        let _ = writeln!(out, "- buffer meters: {}", r.buffer_meters);
        let _ = writeln!(out, "- min acoustic calls: {}", r.min_acoustic_calls);
        out
    }
}

impl Report for CurveSummary {
    fn summary_line(&self) -> String {
        match (&self.message, self.simple_factor_density_per_call_per_asset) {
            (Some(msg), _) => format!("{} windows: {}", self.window_count, msg),
            (None, factor) => format!(
                "{} windows, {} usable, factor {} density/ha per call/asset",
                self.window_count,
                self.usable_count.unwrap_or(0),
                fmt_opt(factor)
            ),
        }
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Calibration summary\n\n");
        let _ = writeln!(out, "- windows: {}", self.window_count);
        if let Some(usable) = self.usable_count {
            let _ = writeln!(out, "- usable: {}", usable);
        }
        let _ = writeln!(
            out,
            "- factor (density/ha per call/asset): {}",
            fmt_opt(self.simple_factor_density_per_call_per_asset)
        );
        if let Some(msg) = &self.message {
            let _ = writeln!(out, "\n> {}", msg);
        }
        out
    }

    fn exit_code(&self) -> ExitCode {
        if self.message.is_some() {
            ExitCode::InsufficientData
        } else {
            ExitCode::Clean
        }
    }
}

impl Report for BacktestReport {
    fn summary_line(&self) -> String {
        match (&self.overall, &self.message) {
            (Some(o), _) => format!(
                "{} folds over {} windows: linear rmse {:.4}, quadratic rmse {:.4}, recommend {}",
                self.folds.len(),
                self.window_count,
                o.linear.rmse,
                o.quadratic.rmse,
                o.recommended_model
            ),
            (None, Some(msg)) => format!("{} windows: {}", self.window_count, msg),
            (None, None) => format!("{} windows: no overall metrics", self.window_count),
        }
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Grouped backtest\n\n");
        let _ = writeln!(
            out,
            "{} usable windows, {} rejected.\n",
            self.window_count, self.rejected_windows
        );
        if !self.folds.is_empty() {
            out.push_str("| held-out survey | train | test | linear rmse | quadratic rmse |\n");
            out.push_str("|---:|---:|---:|---:|---:|\n");
            for fold in &self.folds {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {:.4} | {:.4} |",
                    fold.held_out_visual_survey_id,
                    fold.train_windows,
                    fold.test_windows,
                    fold.linear_metrics.rmse,
                    fold.quadratic_metrics.rmse
                );
            }
            out.push('\n');
        }
        if let Some(o) = &self.overall {
            out.push_str("| model | rmse | mae | r2 |\n|---|---:|---:|---:|\n");
            metrics_row(&mut out, "linear", &o.linear);
            metrics_row(&mut out, "quadratic", &o.quadratic);
            let _ = writeln!(out, "\nRecommended model: **{}**", o.recommended_model);
        }
        if let Some(msg) = &self.message {
            let _ = writeln!(out, "\n> {}", msg);
        }
        out
    }

    fn exit_code(&self) -> ExitCode {
        if self.overall.is_some() {
            ExitCode::Clean
        } else {
            ExitCode::InsufficientData
        }
    }
}

impl Report for TrainSummary {
    fn summary_line(&self) -> String {
        match &self.message {
            Some(msg) => format!("{} windows: {}", self.window_count, msg),
            None => format!(
                "trained on {} windows: recommend {} (residual std {:.4})",
                self.window_count, self.recommended_model, self.residual_std_density_per_hectare
            ),
        }
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Training summary\n\n");
        let _ = writeln!(out, "- windows: {}", self.window_count);
        let _ = writeln!(
            out,
            "- linear: y = {:.4} + {:.4}x",
            self.linear_model.intercept, self.linear_model.slope
        );
        let _ = writeln!(
            out,
            "- quadratic: y = {:.4} + {:.4}x + {:.4}x^2",
            self.quadratic_model.a0, self.quadratic_model.a1, self.quadratic_model.a2
        );
        out.push_str("\n| model | rmse | mae | r2 |\n|---|---:|---:|---:|\n");
        metrics_row(&mut out, "linear", &self.linear_metrics_train);
        metrics_row(&mut out, "quadratic", &self.quadratic_metrics_train);
        let _ = writeln!(out, "\nRecommended model: **{}**", self.recommended_model);
        if let Some(msg) = &self.message {
            let _ = writeln!(out, "\n> {}", msg);
        }
        out
    }

    fn exit_code(&self) -> ExitCode {
        if self.message.is_some() {
            ExitCode::InsufficientData
        } else {
            ExitCode::Clean
        }
    }
}

impl Report for DensityPrediction {
    fn summary_line(&self) -> String {
        match (self.estimated_density_per_hectare, &self.prediction_interval_approx) {
            (Some(est), Some(iv)) => format!(
                "{:.4} birds/ha [{:.4}, {:.4}] via {} ({} training windows)",
                est, iv.low, iv.high, self.model_used, self.training_window_count
            ),
            _ => self
                .message
                .clone()
                .unwrap_or_else(|| "no estimate".to_string()),
        }
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Density prediction\n\n");
        let _ = writeln!(out, "- model: {}", self.model_used);
        let _ = writeln!(out, "- estimate: {}", fmt_opt(self.estimated_density_per_hectare));
        if let Some(iv) = &self.prediction_interval_approx {
            let _ = writeln!(out, "- interval: [{:.4}, {:.4}]", iv.low, iv.high);
        }
        let _ = writeln!(out, "- effort hours: {:.3}", self.effort_hours_estimated);
        if let Some(msg) = &self.message {
            let _ = writeln!(out, "\n> {}", msg);
        }
        out
    }

    fn exit_code(&self) -> ExitCode {
        if self.estimated_density_per_hectare.is_some() {
            ExitCode::Clean
        } else {
            ExitCode::InsufficientData
        }
    }
}

impl Report for FittedCurve {
    fn summary_line(&self) -> String {
        format!(
            "{} samples over [{}, {:.4}] from {} windows",
            self.samples.len(),
            self.x_min,
            self.x_max,
            self.window_count
        )
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Fitted curve\n\n| x | linear | quadratic |\n|---:|---:|---:|\n");
        for s in &self.samples {
            let _ = writeln!(out, "| {:.4} | {:.4} | {:.4} |", s.x, s.y_linear, s.y_quadratic);
        }
        out
    }
}

/// `config show` payload.
#[derive(Debug, Serialize)]
pub struct PolicyReport<'a> {
    pub schema_version: &'static str,
    pub source: &'a birdcal_config::ConfigSnapshot,
    pub policy: &'a birdcal_config::CalibrationPolicy,
}

impl<'a> From<&'a LoadedPolicy> for PolicyReport<'a> {
    fn from(loaded: &'a LoadedPolicy) -> Self {
        PolicyReport {
            schema_version: birdcal_common::SCHEMA_VERSION,
            source: &loaded.snapshot,
            policy: &loaded.policy,
        }
    }
}

impl Report for PolicyReport<'_> {
    fn summary_line(&self) -> String {
        format!(
            "policy from {} ({})",
            self.source.policy_path.as_deref().unwrap_or("built-in defaults"),
            self.source.short_id()
        )
    }

    fn to_markdown(&self) -> String {
        let s = &self.source.summary;
        let mut out = String::from("# Calibration policy\n\n");
        let _ = writeln!(out, "- source: {}", self.source.policy_source);
        let _ = writeln!(out, "- hash: `{}`", self.source.policy_hash);
        let _ = writeln!(out, "- min calls: {}", s.min_calls);
        let _ = writeln!(out, "- top species: {}", s.top_species);
        let _ = writeln!(out, "- quadratic min improvement: {}", s.quadratic_min_improvement);
        let _ = writeln!(out, "- max days apart: {}", s.max_days_apart);
        let _ = writeln!(out, "- buffer meters: {}", s.buffer_meters);
        let _ = writeln!(out, "- sample count: {}", s.sample_count);
        let _ = writeln!(out, "- interval z: {}", s.interval_z);
        out
    }
}
