//! In-memory annotation store backed by `annotations.json`.
//!
//! The store keeps one [`ImageAnnotations`] record per annotated image,
//! keyed by the image path relative to the project root. Records are created
//! lazily by the first annotation and dropped with the last one. Every
//! successful mutation rewrites the whole document.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::error::BoxmarkError;
use crate::ir::io_json::{read_annotations, write_annotations};
use crate::ir::{
    Annotation, AnnotationId, BoundingBox, Coord, Handle, ImageAnnotations, ImageSize, Pixel,
    Screen,
};

/// File name of the annotation document inside a project.
pub const ANNOTATIONS_FILE: &str = "annotations.json";

/// New boxes thinner than this (in source pixels) after clamping are
/// rejected instead of stored.
pub const MIN_NEW_BOX_SIZE: f64 = 1.0;

/// Expresses `image` relative to `root` with `/` separators.
///
/// # Errors
/// Returns [`BoxmarkError::ImageOutsideProject`] if the image does not live
/// under the project root.
pub fn relative_image_path(root: &Path, image: &Path) -> Result<String, BoxmarkError> {
    let outside = || BoxmarkError::ImageOutsideProject {
        image: image.to_path_buf(),
        root: root.to_path_buf(),
    };

    let rel = image.strip_prefix(root).map_err(|_| outside())?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }

    if parts.is_empty() {
        return Err(outside());
    }
    Ok(parts.join("/"))
}

/// Resolves a stored image path against `root`.
///
/// # Errors
/// Returns [`BoxmarkError::ImageOutsideProject`] for absolute paths and
/// paths that climb out of the root with `..`.
pub fn resolve_image_path(root: &Path, image_path: &str) -> Result<PathBuf, BoxmarkError> {
    let rel = Path::new(image_path);
    let escapes = rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || image_path.is_empty() {
        return Err(BoxmarkError::ImageOutsideProject {
            image: rel.to_path_buf(),
            root: root.to_path_buf(),
        });
    }
    Ok(root.join(rel))
}

/// The annotation records of one project.
#[derive(Debug)]
pub struct AnnotationStore {
    path: PathBuf,
    records: Vec<ImageAnnotations>,
    index: HashMap<String, usize>,
}

impl AnnotationStore {
    /// Opens the store of the project at `project_root`.
    ///
    /// A missing or unreadable document yields an empty store.
    pub fn open(project_root: &Path) -> Self {
        let mut store = Self {
            path: project_root.join(ANNOTATIONS_FILE),
            records: Vec::new(),
            index: HashMap::new(),
        };
        store.load();
        store
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory records with the document on disk.
    pub fn load(&mut self) {
        self.records = if self.path.exists() {
            match read_annotations(&self.path) {
                Ok(records) => {
                    info!(
                        "Loaded {} annotated image(s) from {}",
                        records.len(),
                        self.path.display()
                    );
                    records
                }
                Err(e) => {
                    warn!("Ignoring unreadable annotations file: {}", e);
                    Vec::new()
                }
            }
        } else {
            debug!("No annotations file at {}", self.path.display());
            Vec::new()
        };
        self.reindex();
    }

    /// Writes all records to the backing document.
    pub fn save(&self) -> Result<(), BoxmarkError> {
        write_annotations(&self.path, &self.records)?;
        debug!(
            "Saved {} annotated image(s) to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.image_path.clone(), i))
            .collect();
    }

    /// All records, in insertion order.
    pub fn records(&self) -> &[ImageAnnotations] {
        &self.records
    }

    /// The record for one image, if it has any annotations.
    pub fn record(&self, image_path: &str) -> Option<&ImageAnnotations> {
        self.index.get(image_path).map(|&i| &self.records[i])
    }

    /// The annotations of one image (empty if it has none).
    pub fn annotations_for(&self, image_path: &str) -> &[Annotation] {
        self.record(image_path)
            .map(|r| r.annotations.as_slice())
            .unwrap_or(&[])
    }

    /// Number of annotations on one image.
    pub fn count(&self, image_path: &str) -> usize {
        self.annotations_for(image_path).len()
    }

    /// An owned copy of every record with at least one annotation.
    ///
    /// Exports work from a snapshot so later edits cannot leak into a
    /// running export.
    pub fn snapshot(&self) -> Vec<ImageAnnotations> {
        self.records
            .iter()
            .filter(|r| !r.annotations.is_empty())
            .cloned()
            .collect()
    }

    /// Adds a box to an image and returns the new annotation's ID.
    ///
    /// The box is normalized and clamped to `image` (source pixels).
    ///
    /// # Errors
    /// [`BoxmarkError::DegenerateBox`] if nothing usable is left after
    /// clamping; nothing is stored in that case. I/O errors from saving.
    pub fn add_annotation(
        &mut self,
        image_path: &str,
        label: &str,
        bbox: BoundingBox<Pixel>,
        image: ImageSize,
    ) -> Result<AnnotationId, BoxmarkError> {
        let coordinates = bbox.normalized().clamp_to_image(image);
        if !coordinates.is_finite()
            || coordinates.width < MIN_NEW_BOX_SIZE
            || coordinates.height < MIN_NEW_BOX_SIZE
        {
            return Err(BoxmarkError::DegenerateBox {
                width: coordinates.width,
                height: coordinates.height,
            });
        }

        let annotation = Annotation::new(label, coordinates);
        let id = annotation.id;

        match self.index.get(image_path) {
            Some(&i) => self.records[i].annotations.push(annotation),
            None => {
                self.records
                    .push(ImageAnnotations::new(image_path).with_annotation(annotation));
                self.index
                    .insert(image_path.to_string(), self.records.len() - 1);
            }
        }

        debug!("Added '{}' annotation {} to {}", label, id, image_path);
        self.save()?;
        Ok(id)
    }

    /// Drags one corner of an existing box to a new screen position.
    ///
    /// `corner` is in screen space; `image_scale` maps it to source pixels
    /// and `displayed` is the on-screen image size. Returns `Ok(false)` when
    /// the image or annotation is unknown.
    pub fn resize_annotation(
        &mut self,
        image_path: &str,
        id: AnnotationId,
        handle: Handle,
        corner: Coord<Screen>,
        image_scale: f64,
        displayed: ImageSize,
    ) -> Result<bool, BoxmarkError> {
        let image = ImageSize::from_displayed(displayed, image_scale);
        let Some(annotation) = self.annotation_mut(image_path, id) else {
            warn!("Cannot resize: annotation {} not found on {}", id, image_path);
            return Ok(false);
        };

        annotation.coordinates =
            annotation
                .coordinates
                .resize_from_handle(handle, corner.to_pixel(image_scale), image);
        self.save()?;
        Ok(true)
    }

    /// Changes the label of a single annotation. Returns `Ok(false)` when
    /// the image or annotation is unknown.
    pub fn relabel_annotation(
        &mut self,
        image_path: &str,
        id: AnnotationId,
        label: &str,
    ) -> Result<bool, BoxmarkError> {
        let Some(annotation) = self.annotation_mut(image_path, id) else {
            warn!("Cannot relabel: annotation {} not found on {}", id, image_path);
            return Ok(false);
        };
        annotation.label = label.to_string();
        self.save()?;
        Ok(true)
    }

    /// Removes an annotation, dropping the image's record if it was the last.
    pub fn delete_annotation(
        &mut self,
        image_path: &str,
        id: AnnotationId,
    ) -> Result<Option<Annotation>, BoxmarkError> {
        let Some(&i) = self.index.get(image_path) else {
            return Ok(None);
        };
        let record = &mut self.records[i];
        let Some(pos) = record.annotations.iter().position(|a| a.id == id) else {
            return Ok(None);
        };

        let removed = record.annotations.remove(pos);
        if record.annotations.is_empty() {
            self.records.remove(i);
            self.reindex();
            debug!("Removed last annotation of {}", image_path);
        }

        self.save()?;
        Ok(Some(removed))
    }

    /// Renames every annotation labeled `old` to `new`, across all images,
    /// and saves once. Returns how many annotations changed.
    pub fn relabel_all(&mut self, old: &str, new: &str) -> Result<usize, BoxmarkError> {
        let mut changed = 0;
        for annotation in self
            .records
            .iter_mut()
            .flat_map(|r| r.annotations.iter_mut())
            .filter(|a| a.label == old)
        {
            annotation.label = new.to_string();
            changed += 1;
        }

        if changed > 0 {
            info!("Relabeled {} annotation(s) from '{}' to '{}'", changed, old, new);
            self.save()?;
        }
        Ok(changed)
    }

    fn annotation_mut(&mut self, image_path: &str, id: AnnotationId) -> Option<&mut Annotation> {
        let &i = self.index.get(image_path)?;
        self.records[i].annotations.iter_mut().find(|a| a.id == id)
    }
}
