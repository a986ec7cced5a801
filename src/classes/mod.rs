//! Class registry backed by `classes.json`.
//!
//! Classes are the label vocabulary offered when drawing. Annotations copy
//! the class name, so renaming a class relabels the store while removing a
//! class leaves its annotations behind with an orphaned label.

use log::{debug, info, warn};
use rand::Rng;
use std::path::{Path, PathBuf};

use crate::error::BoxmarkError;
use crate::ir::io_json::{read_classes, write_classes};
use crate::ir::{ClassEntry, ClassId, Rgb};
use crate::store::AnnotationStore;

/// File name of the class document inside a project.
pub const CLASSES_FILE: &str = "classes.json";

/// The classes of one project plus the currently active class.
#[derive(Debug)]
pub struct ClassRegistry {
    path: PathBuf,
    classes: Vec<ClassEntry>,
    active: Option<ClassId>,
}

impl ClassRegistry {
    /// Opens the registry of the project at `project_root`.
    ///
    /// A missing or unreadable document yields an empty registry. The first
    /// loaded class becomes active.
    pub fn open(project_root: &Path) -> Self {
        let path = project_root.join(CLASSES_FILE);
        let classes = if path.exists() {
            read_classes(&path).unwrap_or_else(|e| {
                warn!("Ignoring unreadable class list: {}", e);
                Vec::new()
            })
        } else {
            Vec::new()
        };
        let active = classes.first().map(|c| c.id);
        Self {
            path,
            classes,
            active,
        }
    }

    /// Writes the class list to the backing document.
    pub fn save(&self) -> Result<(), BoxmarkError> {
        write_classes(&self.path, &self.classes)?;
        debug!("Saved {} class(es) to {}", self.classes.len(), self.path.display());
        Ok(())
    }

    /// All classes, in creation order.
    pub fn classes(&self) -> &[ClassEntry] {
        &self.classes
    }

    /// Looks up a class by ID.
    pub fn get(&self, id: ClassId) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Looks up a class by exact name.
    pub fn find_by_name(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// The class new annotations are drawn with, if any.
    pub fn active(&self) -> Option<&ClassEntry> {
        self.active.and_then(|id| self.get(id))
    }

    /// Makes `id` the active class. Returns false if it does not exist.
    pub fn set_active(&mut self, id: ClassId) -> bool {
        if self.get(id).is_some() {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Adds a class, drawing a random color when none is given.
    pub fn add(&mut self, name: &str, color: Option<Rgb>) -> Result<ClassId, BoxmarkError> {
        self.add_with_rng(name, color, &mut rand::rng())
    }

    /// Adds a class, drawing any random color from `rng`.
    ///
    /// The new class becomes active if no class was active.
    pub fn add_with_rng<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        color: Option<Rgb>,
        rng: &mut R,
    ) -> Result<ClassId, BoxmarkError> {
        let name = self.checked_name(name, None)?;
        let color = color.unwrap_or_else(|| Rgb::random(rng));
        let entry = ClassEntry::new(name, color);
        let id = entry.id;

        info!("Added class '{}'", entry.name);
        self.classes.push(entry);
        if self.active.is_none() {
            self.active = Some(id);
        }
        self.save()?;
        Ok(id)
    }

    /// Renames a class and relabels every annotation carrying the old name.
    pub fn rename(
        &mut self,
        id: ClassId,
        new_name: &str,
        store: &mut AnnotationStore,
    ) -> Result<(), BoxmarkError> {
        let new_name = self.checked_name(new_name, Some(id))?;
        let entry = self
            .classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BoxmarkError::ClassNotFound(id.to_string()))?;

        let old_name = std::mem::replace(&mut entry.name, new_name.clone());
        info!("Renamed class '{}' to '{}'", old_name, new_name);
        self.save()?;
        store.relabel_all(&old_name, &new_name)?;
        Ok(())
    }

    /// Removes a class from the registry.
    ///
    /// Annotations using its name are kept as they are.
    pub fn remove(&mut self, id: ClassId) -> Result<ClassEntry, BoxmarkError> {
        let pos = self
            .classes
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| BoxmarkError::ClassNotFound(id.to_string()))?;
        let removed = self.classes.remove(pos);

        if self.active == Some(id) {
            self.active = None;
        }
        info!("Removed class '{}'", removed.name);
        self.save()?;
        Ok(removed)
    }

    /// Changes the display color of a class.
    pub fn set_color(&mut self, id: ClassId, color: Rgb) -> Result<(), BoxmarkError> {
        let entry = self
            .classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BoxmarkError::ClassNotFound(id.to_string()))?;
        entry.color = color;
        self.save()
    }

    /// Trims `name` and checks it is non-empty and unused by any class
    /// other than `except`.
    fn checked_name(&self, name: &str, except: Option<ClassId>) -> Result<String, BoxmarkError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(BoxmarkError::InvalidClassName(
                "class name cannot be empty".to_string(),
            ));
        }
        if self
            .classes
            .iter()
            .any(|c| c.name == trimmed && Some(c.id) != except)
        {
            return Err(BoxmarkError::DuplicateClassName(trimmed.to_string()));
        }
        Ok(trimmed.to_string())
    }
}
