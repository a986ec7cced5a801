//! Core value types for boxmark projects.
//!
//! This module defines the geometry and data model shared by the annotation
//! store, the class registry and the export pipeline.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Marker types keep screen positions (where the user
//!    drags) apart from source-image pixels (what gets stored).
//!
//! 2. **Corner Storage**: Boxes are stored as top-left corner plus extent.
//!    Center-form coordinates only exist in export manifests.
//!
//! 3. **Write-time Checks**: Boxes are normalized and clamped when they are
//!    written; loaded data is represented as-is so validation can report it.
//!
//! # Example
//!
//! ```
//! use boxmark::ir::{BoundingBox, Coord, ImageSize, Pixel, Rotation, Screen};
//!
//! let drag: BoundingBox<Screen> =
//!     BoundingBox::from_points(Coord::new(40.0, 30.0), Coord::new(10.0, 10.0));
//! let stored: BoundingBox<Pixel> = drag
//!     .to_pixel(2.0)
//!     .clamp_to_image(ImageSize::new(100.0, 50.0));
//! assert_eq!(stored, BoundingBox::new(20.0, 20.0, 60.0, 30.0));
//!
//! let turned = stored.rotated(Rotation::Deg180, ImageSize::new(100.0, 50.0));
//! assert_eq!(turned, BoundingBox::new(20.0, 0.0, 60.0, 30.0));
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_json;
mod model;
mod rotation;
mod space;

// Re-export core types for convenient access
pub use bbox::{BoundingBox, Handle, MIN_BOX_SIZE};
pub use coord::{Coord, ImageSize};
pub use ids::{AnnotationId, ClassId, RecordId};
pub use model::{Annotation, ClassEntry, ImageAnnotations, Rgb};
pub use rotation::Rotation;
pub use space::{Pixel, Screen};
