//! Fuzz target for policy.json configuration parsing.
//!
//! Parsing and validation must reject bad input with an error, never a panic.

#![no_main]

use birdcal_config::{validate_policy, CalibrationPolicy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(policy) = CalibrationPolicy::parse_json(text) {
        let _ = validate_policy(&policy);
        let _ = policy.to_json_pretty();
    }
});
