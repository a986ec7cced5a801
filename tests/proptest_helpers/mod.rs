#![allow(dead_code)]

use boxmark::ir::{BoundingBox, ImageSize, Pixel};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_image_size() -> BoxedStrategy<ImageSize> {
    (1u32..=4096, 1u32..=4096)
        .prop_map(|(w, h)| ImageSize::new(w as f64, h as f64))
        .boxed()
}

/// Any finite box, including ones with negative origin or extent.
pub fn arb_any_bbox() -> BoxedStrategy<BoundingBox<Pixel>> {
    (
        -5000.0f64..5000.0,
        -5000.0f64..5000.0,
        -5000.0f64..5000.0,
        -5000.0f64..5000.0,
    )
        .prop_map(|(x, y, w, h)| BoundingBox::new(x, y, w, h))
        .boxed()
}

/// An image size with a box that lies inside it.
pub fn arb_bbox_within() -> BoxedStrategy<(ImageSize, BoundingBox<Pixel>)> {
    (2u32..=2048, 2u32..=2048)
        .prop_flat_map(|(w, h)| {
            (0..w - 1, 0..h - 1).prop_flat_map(move |(x, y)| {
                (Just((w, h, x, y)), 1..=(w - x), 1..=(h - y))
            })
        })
        .prop_map(|((w, h, x, y), bw, bh)| {
            (
                ImageSize::new(w as f64, h as f64),
                BoundingBox::new(x as f64, y as f64, bw as f64, bh as f64),
            )
        })
        .boxed()
}

pub fn approx_eq(a: &BoundingBox<Pixel>, b: &BoundingBox<Pixel>) -> bool {
    (a.x - b.x).abs() <= EPS
        && (a.y - b.y).abs() <= EPS
        && (a.width - b.width).abs() <= EPS
        && (a.height - b.height).abs() <= EPS
}
