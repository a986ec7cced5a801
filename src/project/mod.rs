//! Project context: root directory, settings and image folders.
//!
//! A project is a directory holding `projectSettings.json`,
//! `annotations.json`, `classes.json` and an `images/` tree with one
//! sub-folder per imported image folder. Exports are written to
//! `Training data/` inside the project.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classes::ClassRegistry;
use crate::error::BoxmarkError;
use crate::ir::io_json::{read_json, write_json};
use crate::split::SplitRatios;
use crate::store::{relative_image_path, AnnotationStore};

/// File name of the settings document inside a project.
pub const SETTINGS_FILE: &str = "projectSettings.json";

/// Folder under the project root that holds imported images.
pub const IMAGES_DIR: &str = "images";

/// Folder under the project root that exports are written to.
pub const EXPORT_DIR: &str = "Training data";

/// File extensions recognised as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

/// Returns true if `path` has an image file extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Persisted per-project settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    /// Names of the folders under `images/`.
    #[serde(default)]
    pub folders_in_project: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_folder: Option<String>,

    /// Whether exports add 90/180/270 degree copies of every image.
    #[serde(default)]
    pub allow_image_rotation: bool,

    #[serde(rename = "selectedImageURL", default, skip_serializing_if = "Option::is_none")]
    pub selected_image_url: Option<String>,

    #[serde(default)]
    pub export_proportions: SplitRatios,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            folders_in_project: Vec::new(),
            selected_folder: None,
            allow_image_rotation: false,
            selected_image_url: None,
            export_proportions: SplitRatios::default(),
        }
    }
}

impl ProjectSettings {
    /// Loads settings from `project_root`, falling back to defaults when the
    /// file is missing or corrupt.
    pub fn load(project_root: &Path) -> Self {
        let path = project_root.join(SETTINGS_FILE);
        if !path.exists() {
            return Self::default();
        }
        read_json(&path).unwrap_or_else(|e| {
            warn!("Using default project settings: {}", e);
            Self::default()
        })
    }

    /// Writes settings into `project_root`.
    pub fn save(&self, project_root: &Path) -> Result<(), BoxmarkError> {
        write_json(&project_root.join(SETTINGS_FILE), self)
    }
}

/// An open project with all of its persisted state.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    pub settings: ProjectSettings,
    pub store: AnnotationStore,
    pub classes: ClassRegistry,
}

impl Project {
    /// Creates the project layout at `root` (if needed) and opens it.
    pub fn init(root: &Path) -> Result<Self, BoxmarkError> {
        fs::create_dir_all(root.join(IMAGES_DIR))?;
        let project = Self::open(root)?;
        if !root.join(SETTINGS_FILE).exists() {
            project.settings.save(&project.root)?;
        }
        info!("Initialised project at {}", project.root.display());
        Ok(project)
    }

    /// Opens the project at `root`.
    ///
    /// Only a missing root directory is an error; unreadable project files
    /// load as empty state.
    pub fn open(root: &Path) -> Result<Self, BoxmarkError> {
        let root = root.canonicalize()?;
        Ok(Self {
            settings: ProjectSettings::load(&root),
            store: AnnotationStore::open(&root),
            classes: ClassRegistry::open(&root),
            root,
        })
    }

    /// The canonical project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the settings document.
    pub fn save_settings(&self) -> Result<(), BoxmarkError> {
        self.settings.save(&self.root)
    }

    /// Key of an image in the annotation store.
    ///
    /// Relative paths are resolved against the project root.
    pub fn image_key(&self, image: &Path) -> Result<String, BoxmarkError> {
        let absolute = if image.is_absolute() {
            image.to_path_buf()
        } else {
            self.root.join(image)
        };
        let absolute = absolute.canonicalize().map_err(|e| BoxmarkError::ImageRead {
            path: absolute.clone(),
            message: e.to_string(),
        })?;
        relative_image_path(&self.root, &absolute)
    }

    /// Lists images under `images/`, or under one imported folder, as
    /// store keys in sorted order.
    pub fn list_images(&self, folder: Option<&str>) -> Vec<String> {
        let base = match folder {
            Some(name) => self.root.join(IMAGES_DIR).join(name),
            None => self.root.join(IMAGES_DIR),
        };

        let mut keys: Vec<String> = WalkDir::new(&base)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_image_file(e.path()))
            .filter_map(|e| relative_image_path(&self.root, e.path()).ok())
            .collect();
        keys.sort();
        keys
    }

    /// Copies the images in `source` into `images/<folder name>/` and
    /// registers the folder. Returns the number of images copied.
    pub fn import_folder(&mut self, source: &Path) -> Result<usize, BoxmarkError> {
        let name = source
            .canonicalize()?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BoxmarkError::ImageRead {
                path: source.to_path_buf(),
                message: "folder has no name".to_string(),
            })?;
        let dest = self.root.join(IMAGES_DIR).join(&name);

        let mut copied = 0;
        for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() || !is_image_file(entry.path()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(source) else {
                continue;
            };
            let target = dest.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }

        if !self.settings.folders_in_project.contains(&name) {
            self.settings.folders_in_project.push(name.clone());
        }
        if self.settings.selected_folder.is_none() {
            self.settings.selected_folder = Some(name.clone());
        }
        self.save_settings()?;
        info!("Imported {} image(s) into {}", copied, dest.display());
        Ok(copied)
    }
}
