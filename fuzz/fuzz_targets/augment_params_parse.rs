//! Fuzz target for augmentation parameter parsing.

#![no_main]

use beardstore::augment::AugmentParams;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    let _ = AugmentParams::from_json_str(json);
});
