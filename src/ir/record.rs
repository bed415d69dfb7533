//! The unified per-image record every loader produces.

use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::value::Fields;

/// Dataset partition a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Split {
    Training,
    Development,
    Testing,
}

impl Split {
    /// All splits in canonical order.
    pub const ALL: [Split; 3] = [Split::Training, Split::Development, Split::Testing];

    /// Folder names recognized for this split, in search order.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Split::Training => &["train", "training"],
            Split::Development => &["val", "validation", "valid", "dev", "develop", "development"],
            Split::Testing => &["test", "testing"],
        }
    }

    /// Folder name used when writing this split.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Split::Training => "train",
            Split::Development => "dev",
            Split::Testing => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Split::Training => "TRAINING",
            Split::Development => "DEVELOPMENT",
            Split::Testing => "TESTING",
        };
        f.write_str(name)
    }
}

impl FromStr for Split {
    type Err = String;

    /// Accepts the canonical names as well as any folder alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Split::ALL
            .into_iter()
            .find(|split| {
                split.to_string().eq_ignore_ascii_case(&lowered)
                    || split.aliases().contains(&lowered.as_str())
            })
            .ok_or_else(|| format!("unknown split '{s}' (expected train, dev or test)"))
    }
}

/// One image with its decoded annotations.
///
/// Every box in `objects` is in absolute, y-x, post-transform pixel
/// coordinates of `image`.
#[derive(Clone, Debug)]
pub struct Record {
    pub image: RgbImage,
    pub global: Fields,
    pub objects: Vec<Fields>,
    pub split: Split,
}

impl Record {
    /// Creates a record without annotations.
    pub fn new(image: RgbImage, split: Split) -> Self {
        Self {
            image,
            global: Fields::new(),
            objects: Vec::new(),
            split,
        }
    }

    /// Sets the global (per-image) data.
    pub fn with_global(mut self, global: Fields) -> Self {
        self.global = global;
        self
    }

    /// Sets the per-object data.
    pub fn with_objects(mut self, objects: Vec<Fields>) -> Self {
        self.objects = objects;
        self
    }

    /// `(height, width)` of the image.
    pub fn size(&self) -> (u32, u32) {
        (self.image.height(), self.image.width())
    }
}
