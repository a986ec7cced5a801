//! Image codec used by the export pipeline.
//!
//! Exports always re-encode to a lossy format; the source format is never
//! preserved.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError};

use crate::ir::Rotation;

/// Decodes, rotates and re-encodes image data for export.
///
/// Implementations are shared by every worker thread of an export.
pub trait ImageCodec: Send + Sync {
    /// Decodes an image file's bytes into pixels.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError>;

    /// Rotates the pixels about the image center, counter-clockwise.
    ///
    /// Must agree with [`BoundingBox::rotated`](crate::ir::BoundingBox::rotated)
    /// or exported boxes drift off their objects.
    fn rotate(&self, image: &DynamicImage, rotation: Rotation) -> DynamicImage {
        rotation.apply(image)
    }

    /// Encodes pixels into the export format.
    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, ImageError>;

    /// File extension of encoded images, without the dot.
    fn extension(&self) -> &'static str;
}

/// Baseline JPEG output at a fixed quality.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JpegCodec {
    pub quality: u8,
}

impl JpegCodec {
    pub const DEFAULT_QUALITY: u8 = 90;

    /// Creates a codec; quality is clamped to `1..=100`.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUALITY)
    }
}

impl ImageCodec for JpegCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError> {
        image::load_from_memory(bytes)
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut out = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.quality))?;
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn jpeg_roundtrip_keeps_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 5, Rgba([10, 200, 30, 128])));
        let codec = JpegCodec::default();
        let bytes = codec.encode(&img).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let back = codec.decode(&bytes).expect("decode");
        assert_eq!(back.dimensions(), (8, 5));
    }

    #[test]
    fn rotate_swaps_dimensions_for_quarter_turns() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(8, 5));
        let codec = JpegCodec::default();
        assert_eq!(codec.rotate(&img, Rotation::Deg90).dimensions(), (5, 8));
        assert_eq!(codec.rotate(&img, Rotation::Deg180).dimensions(), (8, 5));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(JpegCodec::default().decode(b"not an image").is_err());
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(JpegCodec::new(0).quality, 1);
        assert_eq!(JpegCodec::new(255).quality, 100);
    }
}
