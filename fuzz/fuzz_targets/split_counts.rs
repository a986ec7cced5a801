//! Fuzz target for split sizing: counts must always sum to the total.
//!
//! Run with:
//!   cargo +nightly fuzz run split_counts

#![no_main]

use boxmark::split::{split_counts, SplitRatios};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u16, u8, u8)| {
    let (total, test, valid) = input;
    let test = (test % 101) as f64;
    let valid = (valid as f64).min(100.0 - test);
    let ratios = SplitRatios::new(100.0 - test - valid, test, valid);

    let counts = split_counts(total as usize, &ratios);
    assert_eq!(counts.total(), total as usize);
});
