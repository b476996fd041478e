//! Fuzz target for the curve fitters.
//!
//! Finite, bounded input must always give finite coefficients and a sampled
//! curve that never dips below zero.

#![no_main]

use arbitrary::Arbitrary;
use birdcal_math::{fit_linear, fit_quadratic, sample_curve, CurveFit};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FitInput {
    points: Vec<(i16, i16)>,
    sample_count: u8,
}

fuzz_target!(|input: FitInput| {
    let points: Vec<(f64, f64)> = input
        .points
        .iter()
        .map(|&(x, y)| (f64::from(x) / 16.0, f64::from(y) / 16.0))
        .collect();

    let linear = fit_linear(&points);
    let quadratic = fit_quadratic(&points);
    assert!(linear.slope.is_finite() && linear.intercept.is_finite());
    assert!(quadratic.a0.is_finite() && quadratic.a1.is_finite() && quadratic.a2.is_finite());

    let fit = CurveFit { linear, quadratic };
    let x_max = points.iter().map(|p| p.0).fold(1.0f64, f64::max);
    for sample in sample_curve(&fit, 0.0, x_max, usize::from(input.sample_count)) {
        assert!(sample.y_linear >= 0.0 && sample.y_quadratic >= 0.0);
    }
});
