//! Fuzz target for `annotations.json` parsing.
//!
//! Parsed records are pushed through clamping and rotation as well, since
//! loaded data is not guaranteed to be well formed.
//!
//! Run with:
//!   cargo +nightly fuzz run annotations_json_parse

#![no_main]

use boxmark::ir::io_json::annotations_from_slice;
use boxmark::ir::{ImageSize, Rotation};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for an annotation store.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(records) = annotations_from_slice(data) else {
        return;
    };
    let size = ImageSize::new(640.0, 480.0);
    for ann in records.iter().flat_map(|r| &r.annotations) {
        let clamped = ann.coordinates.normalized().clamp_to_image(size);
        for rotation in Rotation::ALL {
            let _ = clamped.rotated(rotation, size);
        }
    }
});
