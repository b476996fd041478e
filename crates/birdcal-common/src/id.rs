//! Survey, sensor, and window identity types.
//!
//! All identifiers are backend row ids. They are kept distinct so a visual
//! survey id can never be passed where an ARU id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

row_id!(
    /// Calibration window id. Stable across reads of one window set.
    WindowId
);

row_id!(
    /// Survey id (acoustic or drone).
    SurveyId
);

row_id!(
    /// Autonomous Recording Unit id.
    AruId
);

row_id!(
    /// Media asset id (one recording file or one drone tile).
    AssetId
);
