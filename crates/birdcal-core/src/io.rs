//! JSON input loading for the CLI layer.
//!
//! The engine itself never touches the filesystem.

use birdcal_common::{CalibrationWindow, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::pairing::SurveyInventory;

/// Window files are either a bare array or a rebuild outcome object.
#[derive(Deserialize)]
#[serde(untagged)]
enum WindowFile {
    Bare(Vec<CalibrationWindow>),
    Wrapped { windows: Vec<CalibrationWindow> },
}

/// Read a whole file, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Parse calibration windows from JSON.
pub fn parse_windows(json: &str) -> Result<Vec<CalibrationWindow>> {
    let file: WindowFile = serde_json::from_str(json)?;
    Ok(match file {
        WindowFile::Bare(windows) | WindowFile::Wrapped { windows } => windows,
    })
}

pub fn load_windows(path: &Path) -> Result<Vec<CalibrationWindow>> {
    parse_windows(&read_input(path)?)
}

pub fn load_inventory(path: &Path) -> Result<SurveyInventory> {
    SurveyInventory::from_json(&read_input(path)?)
}
