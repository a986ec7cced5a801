//! Core project model: annotations, per-image records and classes.
//!
//! Field names follow the persisted JSON documents (`annotations.json`,
//! `classes.json`), which use camelCase keys.

use rand::{Rng, RngExt};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::bbox::BoundingBox;
use super::ids::{AnnotationId, ClassId, RecordId};
use super::space::Pixel;

/// One labeled bounding box on one image.
///
/// `label` is a copy of the class name, not a reference to the class, so a
/// class rename has to rewrite it and a class removal leaves it in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Stable across resize and relabel.
    pub id: AnnotationId,

    pub label: String,

    /// Corner-form box in source-image pixels.
    pub coordinates: BoundingBox<Pixel>,
}

impl Annotation {
    /// Creates an annotation with a fresh ID.
    pub fn new(label: impl Into<String>, coordinates: BoundingBox<Pixel>) -> Self {
        Self {
            id: AnnotationId::new_random(),
            label: label.into(),
            coordinates,
        }
    }
}

/// All annotations drawn on a single image.
///
/// Records exist only for images with at least one annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnnotations {
    pub id: RecordId,

    /// Image path relative to the project root, using `/` separators.
    pub image_path: String,

    pub annotations: Vec<Annotation>,
}

impl ImageAnnotations {
    /// Creates an empty record for `image_path`.
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            id: RecordId::new_random(),
            image_path: image_path.into(),
            annotations: Vec::new(),
        }
    }

    /// Adds an annotation to the record (builder style).
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Finds an annotation by ID.
    pub fn find(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }
}

/// A display color with channels in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rgb {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self {
            red: red.clamp(0.0, 1.0),
            green: green.clamp(0.0, 1.0),
            blue: blue.clamp(0.0, 1.0),
        }
    }

    /// Draws one uniform value per channel.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let red = rng.random::<f64>();
        let green = rng.random::<f64>();
        let blue = rng.random::<f64>();
        Self::new(red, green, blue)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parses `r,g,b`, either as floats in `0..=1` or as bytes `0..=255`
    /// when any channel exceeds 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid color '{}': {}", s, e))?;

        let [r, g, b] = parts[..] else {
            return Err(format!("invalid color '{}': expected R,G,B", s));
        };

        if [r, g, b].iter().any(|c| !c.is_finite() || *c < 0.0 || *c > 255.0) {
            return Err(format!("invalid color '{}': channels out of range", s));
        }

        if r > 1.0 || g > 1.0 || b > 1.0 {
            Ok(Rgb::new(r / 255.0, g / 255.0, b / 255.0))
        } else {
            Ok(Rgb::new(r, g, b))
        }
    }
}

/// A named label with its display color.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub id: ClassId,

    /// Unique within a registry (exact, case-sensitive).
    pub name: String,

    pub color: Rgb,
}

impl ClassEntry {
    /// Creates a class with a fresh ID.
    pub fn new(name: impl Into<String>, color: Rgb) -> Self {
        Self {
            id: ClassId::new_random(),
            name: name.into(),
            color,
        }
    }
}
