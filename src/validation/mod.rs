//! Project validation.
//!
//! Checks the annotation store against the class registry and the image
//! files on disk:
//! - Structural integrity (unique annotation ids, no empty records)
//! - Label references (every label names a registered class)
//! - Image files (inside the project, present and readable)
//! - Geometric validity (proper boxes, within image bounds)
//!
//! Out-of-bounds boxes are warnings: boxes are clamped when written, so
//! they only appear in data from older project files.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::ir::{AnnotationId, ClassEntry, ImageAnnotations, ImageSize};
use crate::project::Project;
use crate::store::resolve_image_path;

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates an open project.
pub fn validate_project(project: &Project, opts: &ValidateOptions) -> ValidationReport {
    validate_records(
        project.store.records(),
        project.classes.classes(),
        project.root(),
        opts,
    )
}

/// Validates annotation records whose image paths are relative to
/// `project_root`.
pub fn validate_records(
    records: &[ImageAnnotations],
    classes: &[ClassEntry],
    project_root: &Path,
    _opts: &ValidateOptions,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_ids(records, &mut report);
    validate_labels(records, classes, &mut report);

    for record in records {
        if record.annotations.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyRecord,
                "Record has no annotations",
                IssueContext::Image {
                    path: record.image_path.clone(),
                },
            ));
        }

        let size = image_size(project_root, record, &mut report);
        validate_boxes(record, size, &mut report);
    }

    report
}

fn validate_ids(records: &[ImageAnnotations], report: &mut ValidationReport) {
    let mut seen: HashMap<AnnotationId, &str> = HashMap::new();

    for record in records {
        for ann in &record.annotations {
            if let Some(first) = seen.get(&ann.id) {
                report.add(ValidationIssue::error(
                    IssueCode::DuplicateAnnotationId,
                    format!("Duplicate annotation ID (first seen in {})", first),
                    IssueContext::Annotation {
                        image: record.image_path.clone(),
                        id: ann.id,
                    },
                ));
            } else {
                seen.insert(ann.id, &record.image_path);
            }
        }
    }
}

/// One warning per orphaned label, not per annotation.
fn validate_labels(
    records: &[ImageAnnotations],
    classes: &[ClassEntry],
    report: &mut ValidationReport,
) {
    let known: HashSet<&str> = classes.iter().map(|c| c.name.as_str()).collect();
    let mut orphaned: BTreeSet<&str> = BTreeSet::new();
    let mut uses: HashMap<&str, usize> = HashMap::new();

    for ann in records.iter().flat_map(|r| &r.annotations) {
        if !known.contains(ann.label.as_str()) {
            orphaned.insert(&ann.label);
            *uses.entry(&ann.label).or_default() += 1;
        }
    }

    for label in orphaned {
        report.add(ValidationIssue::warning(
            IssueCode::OrphanedLabel,
            format!(
                "Label '{}' is used by {} annotation(s) but has no class",
                label,
                uses.get(label).copied().unwrap_or(0)
            ),
            IssueContext::Project,
        ));
    }
}

/// Reads the record's image dimensions, reporting an escaping path or a
/// missing or unreadable file.
fn image_size(
    project_root: &Path,
    record: &ImageAnnotations,
    report: &mut ValidationReport,
) -> Option<ImageSize> {
    let context = IssueContext::Image {
        path: record.image_path.clone(),
    };
    let path = match resolve_image_path(project_root, &record.image_path) {
        Ok(path) => path,
        Err(e) => {
            report.add(ValidationIssue::error(
                IssueCode::ImageOutsideProject,
                e.to_string(),
                context,
            ));
            return None;
        }
    };

    if !path.is_file() {
        report.add(ValidationIssue::error(
            IssueCode::MissingImageFile,
            format!("Image file not found: {}", path.display()),
            context,
        ));
        return None;
    }

    match imagesize::size(&path) {
        Ok(dim) => Some(ImageSize::new(dim.width as f64, dim.height as f64)),
        Err(e) => {
            report.add(ValidationIssue::error(
                IssueCode::UnreadableImage,
                format!("Cannot read image dimensions: {}", e),
                context,
            ));
            None
        }
    }
}

fn validate_boxes(record: &ImageAnnotations, size: Option<ImageSize>, report: &mut ValidationReport) {
    for ann in &record.annotations {
        let bbox = &ann.coordinates;
        let context = IssueContext::Annotation {
            image: record.image_path.clone(),
            id: ann.id,
        };

        if !bbox.is_finite() || bbox.width <= 0.0 || bbox.height <= 0.0 {
            report.add(ValidationIssue::error(
                IssueCode::DegenerateBox,
                format!("Box {:?} has no area", bbox),
                context,
            ));
            continue;
        }

        if let Some(size) = size {
            if !bbox.fits_within(size) {
                report.add(ValidationIssue::warning(
                    IssueCode::BoxOutOfBounds,
                    format!(
                        "Box {:?} extends outside the {}x{} image",
                        bbox, size.width, size.height
                    ),
                    context,
                ));
            }
        }
    }
}
