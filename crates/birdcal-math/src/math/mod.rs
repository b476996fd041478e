//! Core math modules.

pub mod fit;
pub mod metrics;
pub mod sample;
pub mod solve;
pub mod stats;
