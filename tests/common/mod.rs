#![allow(dead_code)]

use std::fs;
use std::path::Path;

use boxmark::ir::{Annotation, BoundingBox, ImageAnnotations};
use image::{Rgb, RgbImage};

/// Writes a solid-color image; the format follows the file extension.
pub fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    RgbImage::from_pixel(width, height, Rgb([120, 60, 200]))
        .save(path)
        .expect("write image file");
}

/// Creates `count` PNG images under `<root>/images/set/` and one record per
/// image with a single `cat` box.
pub fn annotated_images(root: &Path, count: usize, width: u32, height: u32) -> Vec<ImageAnnotations> {
    (0..count)
        .map(|i| {
            let key = format!("images/set/img{:03}.png", i);
            write_image(&root.join(&key), width, height);
            ImageAnnotations::new(key).with_annotation(Annotation::new(
                "cat",
                BoundingBox::new(2.0, 4.0, 10.0, 6.0),
            ))
        })
        .collect()
}

/// Files in `dir` with the given extension.
pub fn files_with_extension(dir: &Path, ext: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(&format!(".{}", ext)))
        .collect();
    names.sort();
    names
}
