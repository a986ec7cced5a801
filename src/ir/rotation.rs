//! Right-angle rotations shared by pixel data and box geometry.

use image::DynamicImage;
use std::fmt;

use super::coord::ImageSize;

/// A counter-clockwise rotation by a multiple of 90 degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Every rotation, in ascending angle order.
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    const UPRIGHT: [Rotation; 1] = [Rotation::Deg0];

    /// The rotations an export produces for each image.
    pub fn export_set(allow_rotation: bool) -> &'static [Rotation] {
        if allow_rotation {
            &Self::ALL
        } else {
            &Self::UPRIGHT
        }
    }

    /// Returns the angle in degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg0,
            Rotation::Deg90 => Rotation::Deg270,
            Rotation::Deg180 => Rotation::Deg180,
            Rotation::Deg270 => Rotation::Deg90,
        }
    }

    /// Returns true for 90 and 270 degrees, which swap width and height.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Canvas size of an image of `size` after this rotation.
    pub fn rotated_size(self, size: ImageSize) -> ImageSize {
        if self.is_quarter_turn() {
            size.transposed()
        } else {
            size
        }
    }

    /// Rotates pixel data about the image center.
    ///
    /// `image` turns its quarter rotations clockwise, so a counter-clockwise
    /// quarter turn is its `rotate270`.
    pub fn apply(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Rotation::Deg0 => image.clone(),
            Rotation::Deg90 => image.rotate270(),
            Rotation::Deg180 => image.rotate180(),
            Rotation::Deg270 => image.rotate90(),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}
