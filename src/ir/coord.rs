//! Typed points and extents using PhantomData for compile-time safety.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use super::space::{Pixel, Screen};

/// A 2D point with a type-level marker for the coordinate space.
///
/// The `TSpace` parameter should be either [`Pixel`] or [`Screen`], so a
/// drag position on screen cannot be stored as an image coordinate without
/// going through [`Coord::to_pixel`].
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new coordinate with the given x and y values.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Coord<Screen> {
    /// Maps a screen position into source-image pixels.
    #[inline]
    pub fn to_pixel(&self, image_scale: f64) -> Coord<Pixel> {
        Coord::new(self.x * image_scale, self.y * image_scale)
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Width and height of an image in source pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

impl ImageSize {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size of an image whose displayed extent is `displayed` and whose
    /// scale factor (source / displayed) is `image_scale`.
    #[inline]
    pub fn from_displayed(displayed: ImageSize, image_scale: f64) -> Self {
        Self::new(displayed.width * image_scale, displayed.height * image_scale)
    }

    /// The extent after a quarter turn swaps the axes.
    #[inline]
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f64, height as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_is_finite() {
        let finite: Coord<Pixel> = Coord::new(10.0, 20.0);
        assert!(finite.is_finite());

        let nan: Coord<Pixel> = Coord::new(f64::NAN, 20.0);
        assert!(!nan.is_finite());

        let inf: Coord<Screen> = Coord::new(10.0, f64::INFINITY);
        assert!(!inf.is_finite());
    }

    #[test]
    fn screen_point_scales_into_pixels() {
        let on_screen: Coord<Screen> = Coord::new(50.0, 25.0);
        let in_image = on_screen.to_pixel(2.0);
        assert_eq!(in_image.x, 100.0);
        assert_eq!(in_image.y, 50.0);
    }

    #[test]
    fn displayed_size_scales_into_source_size() {
        let source = ImageSize::from_displayed(ImageSize::new(400.0, 300.0), 2.5);
        assert_eq!(source, ImageSize::new(1000.0, 750.0));
        assert_eq!(source.transposed(), ImageSize::new(750.0, 1000.0));
    }
}
