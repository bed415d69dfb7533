//! Dataset conventions: where images and labels live inside a split folder.
//!
//! A generic ("beard") dataset keeps its schema in a config file next to the
//! split folders. Named conventions such as [`kitti`] instead provide the
//! schema in code and extend the folder synonyms.

pub mod kitti;

use std::path::{Path, PathBuf};

/// Sub-folder synonyms searched inside each split folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderLayout {
    /// Image folder names, first existing wins.
    pub image_dirs: Vec<String>,
    /// Label folder names, first existing wins.
    pub label_dirs: Vec<String>,
    /// Extension of annotation files, without dot.
    pub label_extension: String,
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self::beard()
    }
}

impl FolderLayout {
    /// The generic layout: `image(s)|img(s)` and `label(s)|lbl(s)`.
    pub fn beard() -> Self {
        Self {
            image_dirs: ["image", "images", "img", "imgs"].map(String::from).to_vec(),
            label_dirs: ["label", "labels", "lbl", "lbls"].map(String::from).to_vec(),
            label_extension: "txt".to_string(),
        }
    }

    pub fn with_image_dir(mut self, name: impl Into<String>) -> Self {
        self.image_dirs.push(name.into());
        self
    }

    pub fn with_label_dir(mut self, name: impl Into<String>) -> Self {
        self.label_dirs.push(name.into());
        self
    }

    /// The image folder inside `split_dir`, if any synonym exists.
    pub fn image_dir(&self, split_dir: &Path) -> Option<PathBuf> {
        first_existing(split_dir, &self.image_dirs)
    }

    /// The label folder inside `split_dir`, if any synonym exists.
    pub fn label_dir(&self, split_dir: &Path) -> Option<PathBuf> {
        first_existing(split_dir, &self.label_dirs)
    }

    /// Annotation file that belongs to `image_path`: same stem, label extension.
    pub fn label_path(&self, label_dir: &Path, image_path: &Path) -> Option<PathBuf> {
        let mut name = image_path.file_stem()?.to_os_string();
        name.push(".");
        name.push(&self.label_extension);
        Some(label_dir.join(name))
    }
}

fn first_existing(parent: &Path, names: &[String]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| parent.join(name))
        .find(|path| path.is_dir())
}
