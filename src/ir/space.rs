//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! between source-image pixels and the on-screen space the user draws in.

use std::fmt;

/// Marker type for source-image pixel coordinates.
///
/// This is the space annotations are stored and exported in: (0, 0) is the
/// top-left corner of the decoded image and one unit is one pixel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for screen coordinates.
///
/// Screen coordinates are positions on the displayed (possibly scaled)
/// image. They become [`Pixel`] coordinates by multiplying with the image
/// scale factor `source_width / displayed_width`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Screen {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
