//! Fuzz target for dataset config parsing and validation.

#![no_main]

use beardstore::schema::RecordConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(config) = RecordConfig::from_json_str(json) {
        let _ = config.normalized().to_document();
    }
});
