//! Bounding box geometry in corner (XYWH) form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::coord::{Coord, ImageSize};
use super::rotation::Rotation;
use super::space::{Pixel, Screen};

/// Smallest width or height a resize may shrink a box to, in source pixels.
pub const MIN_BOX_SIZE: f64 = 10.0;

/// An axis-aligned bounding box stored as top-left corner plus extent.
///
/// The `TSpace` parameter should be either [`Pixel`] or [`Screen`].
///
/// Construction does not enforce non-negative extents or image bounds;
/// those are established at write time by [`BoundingBox::normalized`] and
/// [`BoundingBox::clamp_to_image`]. Boxes loaded from older project files
/// may therefore sit partly outside their image.
#[derive(Clone, Copy, PartialEq)]
pub struct BoundingBox<TSpace> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    _space: std::marker::PhantomData<TSpace>,
}

impl<TSpace> BoundingBox<TSpace> {
    /// Creates a box from its top-left corner and extent.
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            _space: std::marker::PhantomData,
        }
    }

    /// Builds the box spanned by a two-point drag, in whichever order the
    /// points were visited.
    pub fn from_points(start: Coord<TSpace>, end: Coord<TSpace>) -> Self {
        Self::new(
            start.x.min(end.x),
            start.y.min(end.y),
            (end.x - start.x).abs(),
            (end.y - start.y).abs(),
        )
    }

    /// Returns the same area with non-negative width and height.
    pub fn normalized(&self) -> Self {
        Self::from_points(
            Coord::new(self.x, self.y),
            Coord::new(self.x + self.width, self.y + self.height),
        )
    }

    /// Returns the x coordinate of the right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Returns the y coordinate of the bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Returns the area of the bounding box.
    ///
    /// May be negative if the box is not normalized.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Coord<TSpace> {
        Coord::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns true if all fields are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }
}

impl BoundingBox<Screen> {
    /// Maps a box drawn on screen into source-image pixels.
    pub fn to_pixel(&self, image_scale: f64) -> BoundingBox<Pixel> {
        BoundingBox::new(
            self.x * image_scale,
            self.y * image_scale,
            self.width * image_scale,
            self.height * image_scale,
        )
    }
}

impl BoundingBox<Pixel> {
    /// Restricts the box to `[0, width] x [0, height]` of the image.
    ///
    /// The origin is pulled inside the image and the extent is cut at the
    /// right and bottom edges. Applying it twice gives the same result as
    /// applying it once.
    pub fn clamp_to_image(&self, size: ImageSize) -> Self {
        let x = self.x.max(0.0).min(size.width);
        let y = self.y.max(0.0).min(size.height);
        let width = self.width.min(size.width - x).max(0.0);
        let height = self.height.min(size.height - y).max(0.0);
        Self::new(x, y, width, height)
    }

    /// Returns true if the box lies entirely within the image.
    pub fn fits_within(&self, size: ImageSize) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.right() <= size.width && self.bottom() <= size.height
    }

    /// Moves one corner to `corner` while the opposite corner stays put.
    ///
    /// The moving edges cannot come closer than [`MIN_BOX_SIZE`] to the
    /// fixed ones. The result is clamped to the image.
    pub fn resize_from_handle(&self, handle: Handle, corner: Coord<Pixel>, size: ImageSize) -> Self {
        let mut resized = *self;
        match handle {
            Handle::TopLeft => {
                let x = corner.x.min(self.right() - MIN_BOX_SIZE);
                let y = corner.y.min(self.bottom() - MIN_BOX_SIZE);
                resized.width = self.width + (self.x - x);
                resized.height = self.height + (self.y - y);
                resized.x = x;
                resized.y = y;
            }
            Handle::TopRight => {
                let y = corner.y.min(self.bottom() - MIN_BOX_SIZE);
                resized.width = (corner.x - self.x).max(MIN_BOX_SIZE);
                resized.height = self.height + (self.y - y);
                resized.y = y;
            }
            Handle::BottomLeft => {
                let x = corner.x.min(self.right() - MIN_BOX_SIZE);
                resized.width = self.width + (self.x - x);
                resized.height = (corner.y - self.y).max(MIN_BOX_SIZE);
                resized.x = x;
            }
            Handle::BottomRight => {
                resized.width = (corner.x - self.x).max(MIN_BOX_SIZE);
                resized.height = (corner.y - self.y).max(MIN_BOX_SIZE);
            }
        }
        resized.clamp_to_image(size)
    }

    /// Maps the box onto an image rotated counter-clockwise by `rotation`.
    ///
    /// `size` is the image extent before rotation. The mapping matches
    /// [`Rotation::apply`] on the pixel data: a point `(px, py)` lands at
    /// `(py, W - px)` after a quarter turn, on a canvas of `H x W`.
    pub fn rotated(&self, rotation: Rotation, size: ImageSize) -> Self {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        match rotation {
            Rotation::Deg0 => *self,
            Rotation::Deg90 => Self::new(y, size.width - x - w, h, w),
            Rotation::Deg180 => Self::new(size.width - (x + w), size.height - (y + h), w, h),
            Rotation::Deg270 => Self::new(size.height - y - h, x, h, w),
        }
    }
}

impl<TSpace> fmt::Debug for BoundingBox<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundingBox")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<TSpace> Default for BoundingBox<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

// Custom serde implementation to avoid TSpace: Serialize/Deserialize bounds
impl<TSpace> Serialize for BoundingBox<TSpace> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Coordinates", 4)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.end()
    }
}

impl<'de, TSpace> Deserialize<'de> for BoundingBox<TSpace> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct BoxData {
            x: f64,
            y: f64,
            width: f64,
            height: f64,
        }
        let data = BoxData::deserialize(deserializer)?;
        Ok(BoundingBox::new(data.x, data.y, data.width, data.height))
    }
}

/// One of the four corner grips used to resize a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl FromStr for Handle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "top-left" | "tl" => Ok(Handle::TopLeft),
            "top-right" | "tr" => Ok(Handle::TopRight),
            "bottom-left" | "bl" => Ok(Handle::BottomLeft),
            "bottom-right" | "br" => Ok(Handle::BottomRight),
            other => Err(format!(
                "unknown handle '{}' (expected top-left, top-right, bottom-left, bottom-right)",
                other
            )),
        }
    }
}
