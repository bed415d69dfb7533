//! Fuzz target for decoding one annotation row against the KITTI schema.
//!
//! Decoded rows are encoded again, so both directions of the codec are
//! checked for panics.

#![no_main]

use beardstore::adapter::kitti;
use beardstore::schema::{decode_row, encode_row};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    let config = kitti::create_config(&kitti::default_classes(), true);
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if let Ok(decoded) = decode_row(&tokens, &config.boxes) {
        let _ = encode_row(&decoded.fields, &config.boxes);
    }
});
