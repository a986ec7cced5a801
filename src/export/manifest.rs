//! Per-bucket export manifest (`createml.json`).
//!
//! Unlike the project store, manifest coordinates are **center** based:
//! `x`/`y` give the box center, rounded to whole pixels together with the
//! extent. Consumers of the exported dataset depend on that convention.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::BoxmarkError;
use crate::ir::io_json::{read_json, write_json};
use crate::ir::{BoundingBox, Pixel};

/// File name of the manifest written into every bucket folder.
pub const MANIFEST_FILE: &str = "createml.json";

/// One exported image and its regions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// File name of the exported image inside the bucket folder.
    pub image: String,
    pub annotations: Vec<ManifestRegion>,
}

/// A labeled region in center form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestRegion {
    pub label: String,
    pub coordinates: CenterBox,
}

/// A box given by its center and extent, in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CenterBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CenterBox {
    /// Converts a corner-form box, rounding half away from zero.
    pub fn from_corner(bbox: &BoundingBox<Pixel>) -> Self {
        let center = bbox.center();
        Self {
            x: center.x.round(),
            y: center.y.round(),
            width: bbox.width.round(),
            height: bbox.height.round(),
        }
    }
}

impl ManifestRegion {
    pub fn new(label: impl Into<String>, bbox: &BoundingBox<Pixel>) -> Self {
        Self {
            label: label.into(),
            coordinates: CenterBox::from_corner(bbox),
        }
    }
}

/// Writes `entries` as the manifest of the bucket folder `dir`.
pub fn write_manifest(dir: &Path, entries: &[ManifestEntry]) -> Result<PathBuf, BoxmarkError> {
    let path = dir.join(MANIFEST_FILE);
    write_json(&path, entries)?;
    Ok(path)
}

/// Reads a manifest file.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, BoxmarkError> {
    read_json(path)
}
