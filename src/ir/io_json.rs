//! JSON persistence for project documents.
//!
//! Every project file (`annotations.json`, `classes.json`,
//! `projectSettings.json`) and every export manifest is a single
//! pretty-printed UTF-8 JSON document, read and written whole.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::model::{ClassEntry, ImageAnnotations};
use crate::error::BoxmarkError;

/// Reads any JSON document from `path`.
///
/// # Errors
/// Returns an error if the file cannot be opened or does not parse as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BoxmarkError> {
    let file = File::open(path).map_err(BoxmarkError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| BoxmarkError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `value` as pretty-printed JSON to `path`.
///
/// The document is written to a sibling temporary file first and renamed
/// over `path`, so a crash mid-write never leaves a truncated project file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), BoxmarkError> {
    let tmp = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp).map_err(BoxmarkError::Io)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|source| {
            BoxmarkError::JsonWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads the annotation records of a project.
pub fn read_annotations(path: &Path) -> Result<Vec<ImageAnnotations>, BoxmarkError> {
    read_json(path)
}

/// Writes the annotation records of a project.
pub fn write_annotations(path: &Path, records: &[ImageAnnotations]) -> Result<(), BoxmarkError> {
    write_json(path, records)
}

/// Reads the class list of a project.
pub fn read_classes(path: &Path) -> Result<Vec<ClassEntry>, BoxmarkError> {
    read_json(path)
}

/// Writes the class list of a project.
pub fn write_classes(path: &Path, classes: &[ClassEntry]) -> Result<(), BoxmarkError> {
    write_json(path, classes)
}

/// Parses annotation records from a JSON string.
///
/// Useful for testing without file I/O.
pub fn annotations_from_str(json: &str) -> Result<Vec<ImageAnnotations>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parses annotation records from raw bytes.
pub fn annotations_from_slice(bytes: &[u8]) -> Result<Vec<ImageAnnotations>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Parses a class list from raw bytes.
pub fn classes_from_slice(bytes: &[u8]) -> Result<Vec<ClassEntry>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Renders annotation records as a pretty-printed JSON string.
///
/// Useful for testing without file I/O.
pub fn annotations_to_string(records: &[ImageAnnotations]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Annotation, BoundingBox, Rgb};

    fn sample_records() -> Vec<ImageAnnotations> {
        vec![
            ImageAnnotations::new("images/a/0001.jpg")
                .with_annotation(Annotation::new("cat", BoundingBox::new(10.0, 20.0, 30.0, 40.0)))
                .with_annotation(Annotation::new("dog", BoundingBox::new(1.5, 2.5, 3.5, 4.5))),
            ImageAnnotations::new("images/b/0002.png")
                .with_annotation(Annotation::new("cat", BoundingBox::new(0.0, 0.0, 8.0, 8.0))),
        ]
    }

    #[test]
    fn test_annotations_roundtrip() {
        let original = sample_records();
        let json = annotations_to_string(&original).expect("serialization failed");
        let restored = annotations_from_str(&json).expect("deserialization failed");
        assert_eq!(original, restored);
    }

    #[test]
    fn test_reads_document_written_by_other_tools() {
        let json = r#"[
          {
            "id": "A1B2C3D4-0000-4000-8000-000000000001",
            "imagePath": "images/set/x.jpg",
            "annotations": [
              {
                "id": "A1B2C3D4-0000-4000-8000-000000000002",
                "label": "bird",
                "coordinates": { "x": 1, "y": 2, "width": 3, "height": 4 }
              }
            ]
          }
        ]"#;
        let records = annotations_from_str(json).expect("parse");
        assert_eq!(records[0].image_path, "images/set/x.jpg");
        assert_eq!(records[0].annotations[0].coordinates.height, 4.0);
    }

    #[test]
    fn test_rejects_malformed_documents() {
        assert!(annotations_from_slice(b"{").is_err());
        assert!(annotations_from_slice(br#"[{"imagePath": "x.jpg"}]"#).is_err());
        assert!(classes_from_slice(br#"[{"id": "nope", "name": "a"}]"#).is_err());
        assert!(classes_from_slice(b"[]").expect("empty list").is_empty());
    }

    #[test]
    fn test_classes_file_roundtrip() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("classes.json");
        let classes = vec![ClassEntry::new("cat", Rgb::new(0.1, 0.2, 0.3))];

        write_classes(&path, &classes).expect("write");
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(read_classes(&path).expect("read"), classes);
    }

    #[test]
    fn test_read_reports_parse_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("annotations.json");
        fs::write(&path, "{ not json").expect("write");

        match read_annotations(&path) {
            Err(BoxmarkError::JsonParse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
