//! birdcal math utilities.

pub mod math;

pub use math::fit::*;
pub use math::metrics::*;
pub use math::sample::*;
pub use math::solve::{fit_multilinear, solve_linear_system, MultiLinearFit};
pub use math::stats;
