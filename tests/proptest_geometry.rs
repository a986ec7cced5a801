//! Property tests for box geometry: clamping, normalization and rotation.

mod proptest_helpers;

use boxmark::ir::{BoundingBox, Coord, Pixel, Rotation};
use proptest::prelude::*;

use proptest_helpers::{
    approx_eq, arb_any_bbox, arb_bbox_within, arb_image_size, proptest_config,
};

fn arb_rotation() -> impl Strategy<Value = Rotation> {
    prop::sample::select(Rotation::ALL.to_vec())
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn clamp_is_idempotent(bbox in arb_any_bbox(), size in arb_image_size()) {
        let once = bbox.clamp_to_image(size);
        let twice = once.clamp_to_image(size);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn clamped_box_fits_within_image(bbox in arb_any_bbox(), size in arb_image_size()) {
        let clamped = bbox.normalized().clamp_to_image(size);
        prop_assert!(clamped.width >= 0.0 && clamped.height >= 0.0);
        prop_assert!(clamped.x >= 0.0 && clamped.y >= 0.0);
        prop_assert!(clamped.right() <= size.width + 1e-9, "{:?} outside {:?}", clamped, size);
        prop_assert!(clamped.bottom() <= size.height + 1e-9, "{:?} outside {:?}", clamped, size);
    }

    #[test]
    fn two_point_drag_has_non_negative_extent(
        x1 in -1e4f64..1e4, y1 in -1e4f64..1e4, x2 in -1e4f64..1e4, y2 in -1e4f64..1e4,
    ) {
        let bbox: BoundingBox<Pixel> = BoundingBox::from_points(Coord::new(x1, y1), Coord::new(x2, y2));
        prop_assert!(bbox.width >= 0.0);
        prop_assert!(bbox.height >= 0.0);
        prop_assert_eq!(bbox.x, x1.min(x2));
        prop_assert_eq!(bbox.y, y1.min(y2));
    }

    #[test]
    fn rotation_then_inverse_restores_box(
        (size, bbox) in arb_bbox_within(),
        rotation in arb_rotation(),
    ) {
        let turned = bbox.rotated(rotation, size);
        let back = turned.rotated(rotation.inverse(), rotation.rotated_size(size));
        prop_assert!(approx_eq(&back, &bbox), "{:?} -> {:?} -> {:?}", bbox, turned, back);
    }

    #[test]
    fn rotated_box_stays_inside_rotated_image(
        (size, bbox) in arb_bbox_within(),
        rotation in arb_rotation(),
    ) {
        let turned = bbox.rotated(rotation, size);
        prop_assert!(turned.fits_within(rotation.rotated_size(size)));
        prop_assert!((turned.area() - bbox.area()).abs() < 1e-6);
    }

    #[test]
    fn four_quarter_turns_are_identity((size, bbox) in arb_bbox_within()) {
        let mut current = bbox;
        let mut current_size = size;
        for _ in 0..4 {
            current = current.rotated(Rotation::Deg90, current_size);
            current_size = Rotation::Deg90.rotated_size(current_size);
        }
        prop_assert!(approx_eq(&current, &bbox));
    }
}
