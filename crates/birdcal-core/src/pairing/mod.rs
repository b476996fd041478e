//! Calibration window aggregation.
//!
//! Pairs each ARU deployment of an acoustic survey with every drone survey
//! flown within `max_days_apart` days whose footprint, grown by
//! `buffer_meters`, contains the ARU. A rebuild always produces a complete
//! replacement window set; windows are never patched in place.

pub mod geometry;
pub mod inventory;
pub mod rebuild;

pub use geometry::Bounds;
pub use inventory::{
    AcousticDetection, AcousticMetrics, Aru, DroneMetrics, InventoryIndex, MediaAsset, Survey,
    SurveyInventory, SurveyKind,
};
pub use rebuild::{rebuild_windows, RebuildOptions, RebuildOutcome, RebuildReport};
