//! birdcal core library.
//!
//! Calibrates acoustic call rates against drone-observed bird densities:
//! - `pairing`: aggregate calibration windows from a survey inventory
//! - `calibrate`: curve fits, grouped backtests, training and prediction
//! - `logging`, `exit_codes`, `io`, `report`: CLI plumbing

pub mod calibrate;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pairing;
pub mod report;

pub use birdcal_math::{fit_linear, fit_quadratic, sample_curve};
pub use calibrate::backtest;
