//! Fuzz target for `classes.json` parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run classes_json_parse

#![no_main]

use boxmark::ir::io_json::classes_from_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let _ = classes_from_slice(data);
});
