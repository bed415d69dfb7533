//! KITTI object-detection layout.
//!
//! KITTI has no config file: every object line is
//! `type truncated occluded alpha left top right bottom h w l x y z ry [score]`
//! and images/labels may live in `image_2/` and `label_2/`.

use std::path::Path;

use crate::error::BeardError;
use crate::loader::{LoadOptions, Loader};
use crate::schema::{
    BoxOrder, BoxReference, FieldSchema, RecordConfig, ValueType, CLASS_FIELD,
};

/// Object classes of the KITTI benchmark.
pub const DEFAULT_CLASSES: [&str; 9] = [
    "Car",
    "Van",
    "Truck",
    "Pedestrian",
    "Person_sitting",
    "Cyclist",
    "Tram",
    "Misc",
    "DontCare",
];

pub fn default_classes() -> Vec<String> {
    DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect()
}

/// Builds the KITTI schema.
///
/// With `beard_style` the enum is called `class` (the generic name used by
/// the rest of the pipeline) instead of KITTI's own `type`.
pub fn create_config(classes: &[String], beard_style: bool) -> RecordConfig {
    let class_name = if beard_style { CLASS_FIELD } else { "type" };
    RecordConfig {
        global: Vec::new(),
        boxes: vec![
            FieldSchema::enumeration(class_name, ValueType::Str, classes.to_vec(), 0),
            FieldSchema::value("truncated", ValueType::Float, 1).with_precision(2),
            FieldSchema::value("occluded", ValueType::Int, 2),
            FieldSchema::value("alpha", ValueType::Float, 3).with_precision(2),
            FieldSchema::box_array(
                "bbox",
                ValueType::Int,
                BoxOrder::XY,
                BoxReference::Absolute,
                4,
            ),
            FieldSchema::array("dimensions", ValueType::Float, 3, 8).with_precision(2),
            FieldSchema::array("location", ValueType::Float, 3, 11).with_precision(2),
            FieldSchema::value("rotation_y", ValueType::Float, 14).with_precision(2),
            FieldSchema::value("score", ValueType::Float, 15)
                .with_precision(2)
                .optional(),
        ],
    }
}

/// The generic synonyms plus KITTI's `image_2` / `label_2`.
pub fn layout() -> super::FolderLayout {
    super::FolderLayout::beard()
        .with_image_dir("image_2")
        .with_label_dir("label_2")
}

/// Opens a KITTI dataset rooted at `folder`.
///
/// `classes` defaults to [`DEFAULT_CLASSES`]. The enum is named `class`, so
/// records can be fed straight into the generic writer.
pub fn load(
    folder: &Path,
    classes: Option<&[String]>,
    mut options: LoadOptions,
) -> Result<(RecordConfig, Loader), BeardError> {
    if !folder.is_dir() {
        return Err(BeardError::MissingPath {
            path: folder.to_path_buf(),
        });
    }

    let classes = classes.map(<[String]>::to_vec).unwrap_or_else(default_classes);
    let config = create_config(&classes, true);
    options.layout = layout();

    let loader = Loader::new(folder, config.clone(), options)?;
    Ok((config, loader))
}
