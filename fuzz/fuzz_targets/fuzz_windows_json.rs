//! Fuzz target for calibration window files.
//!
//! Any window set that parses must flow through every calibration operation
//! without panicking.

#![no_main]

use birdcal_core::calibrate::{backtest, curve_summary, fitted_curve, train_summary, BacktestOptions};
use birdcal_core::io::parse_windows;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(windows) = parse_windows(text) else {
        return;
    };

    let options = BacktestOptions::default();
    if let Ok(report) = backtest(&windows, &options) {
        assert_eq!(report.overall.is_some(), report.folds.len() >= 2);
    }
    let _ = train_summary(&windows, &options);
    let _ = curve_summary(&windows, options.min_calls);
    let _ = fitted_curve(&windows, options.min_calls, 16);
});
