//! Declarative annotation schemas.
//!
//! A dataset config lists the fields of the optional global line (`global`)
//! and of every object line (`boxes`). Configs are parsed from JSON or YAML
//! into loose [`FieldDescriptor`]s and then validated once into typed
//! [`FieldSchema`]s, so no record is ever decoded against a half-valid
//! config.

pub mod codec;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BeardError;

pub use codec::{decode_row, encode_row, CodecDiagnostic, Decoded, Encoded, UNKNOWN};

/// Name of the object field that holds the class label.
pub const CLASS_FIELD: &str = "class";

/// Primitive type of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    Str,
}

impl ValueType {
    fn parse(raw: &str, field: &str) -> Result<Self, BeardError> {
        match raw.to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(ValueType::Int),
            "float" | "double" => Ok(ValueType::Float),
            "str" | "string" => Ok(ValueType::Str),
            other => Err(BeardError::config(format!(
                "field '{field}' has unknown dtype '{other}' (expected int, float or str)"
            ))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "str",
        }
    }
}

/// Order of the two axes inside a box-array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxOrder {
    /// `x1 y1 x2 y2` (or `x y w h`).
    XY,
    /// `y1 x1 y2 x2` (or `y x h w`).
    YX,
}

/// How the four numbers of a box-array are to be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxReference {
    /// Two corner points in source-image pixels.
    Absolute,
    /// Origin plus size, as fractions of the source image size.
    Relative,
}

/// The shape of one schema entry.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// One scalar token.
    Value,
    /// `length` consecutive scalar tokens.
    Array { length: usize },
    /// Four scalar tokens describing a bounding box.
    BoxArray {
        order: BoxOrder,
        reference: BoxReference,
    },
    /// One token mapped through a fixed value list.
    Enum { values: Vec<String> },
}

/// A validated description of one annotation field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    pub dtype: ValueType,
    /// Output slot when serializing; decoding always follows declaration order.
    pub position: usize,
    /// An absent trailing token decodes to `Null` instead of failing.
    pub optional: bool,
    /// Decimal places written for float tokens.
    pub precision: Option<usize>,
}

impl FieldSchema {
    pub fn value(name: impl Into<String>, dtype: ValueType, position: usize) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Value,
            dtype,
            position,
            optional: false,
            precision: None,
        }
    }

    pub fn array(name: impl Into<String>, dtype: ValueType, length: usize, position: usize) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Array { length },
            dtype,
            position,
            optional: false,
            precision: None,
        }
    }

    pub fn box_array(
        name: impl Into<String>,
        dtype: ValueType,
        order: BoxOrder,
        reference: BoxReference,
        position: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::BoxArray { order, reference },
            dtype,
            position,
            optional: false,
            precision: None,
        }
    }

    pub fn enumeration(
        name: impl Into<String>,
        dtype: ValueType,
        values: Vec<String>,
        position: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Enum { values },
            dtype,
            position,
            optional: false,
            precision: None,
        }
    }

    /// Marks the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Writes float tokens with exactly `places` decimals.
    pub fn with_precision(mut self, places: usize) -> Self {
        self.precision = Some(places);
        self
    }

    /// Number of tokens the field occupies on a line.
    pub fn width(&self) -> usize {
        match &self.kind {
            FieldKind::Value | FieldKind::Enum { .. } => 1,
            FieldKind::Array { length } => *length,
            FieldKind::BoxArray { .. } => 4,
        }
    }

    pub fn is_box_array(&self) -> bool {
        matches!(self.kind, FieldKind::BoxArray { .. })
    }

    fn from_descriptor(desc: &FieldDescriptor, index: usize) -> Result<Self, BeardError> {
        let name = desc.name.trim();
        if name.is_empty() {
            return Err(BeardError::config(format!(
                "field at index {index} has an empty name"
            )));
        }

        let dtype = match (&desc.dtype, desc.kind.as_str()) {
            (Some(raw), _) => ValueType::parse(raw, name)?,
            (None, "enum") => ValueType::Str,
            (None, _) => {
                return Err(BeardError::config(format!("field '{name}' is missing 'dtype'")));
            }
        };

        let kind = match desc.kind.as_str() {
            "value" => FieldKind::Value,
            "array" => {
                let length = desc.length.ok_or_else(|| {
                    BeardError::config(format!("array field '{name}' is missing 'length'"))
                })?;
                if length == 0 {
                    return Err(BeardError::config(format!(
                        "array field '{name}' must have a positive length"
                    )));
                }
                FieldKind::Array { length }
            }
            "box-array" => {
                if let Some(length) = desc.length {
                    if length != 4 {
                        return Err(BeardError::config(format!(
                            "box-array field '{name}' must have length 4, found {length}"
                        )));
                    }
                }
                let order = match desc.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
                    Some("x-y") | Some("xy") => BoxOrder::XY,
                    Some("y-x") | Some("yx") => BoxOrder::YX,
                    Some(other) => {
                        return Err(BeardError::config(format!(
                            "box-array field '{name}' has unknown order '{other}'"
                        )));
                    }
                    None => {
                        return Err(BeardError::config(format!(
                            "box-array field '{name}' is missing 'order'"
                        )));
                    }
                };
                let reference = match desc.bb_type.as_deref().map(str::to_ascii_lowercase).as_deref() {
                    Some("absolute") => BoxReference::Absolute,
                    Some("relative") => BoxReference::Relative,
                    Some(other) => {
                        return Err(BeardError::config(format!(
                            "box-array field '{name}' has unknown bb_type '{other}'"
                        )));
                    }
                    None => {
                        return Err(BeardError::config(format!(
                            "box-array field '{name}' is missing 'bb_type'"
                        )));
                    }
                };
                if dtype == ValueType::Str {
                    return Err(BeardError::config(format!(
                        "box-array field '{name}' must be numeric"
                    )));
                }
                FieldKind::BoxArray { order, reference }
            }
            "enum" => {
                let values = desc.values.clone().ok_or_else(|| {
                    BeardError::config(format!("enum field '{name}' is missing 'values'"))
                })?;
                if values.is_empty() {
                    return Err(BeardError::config(format!(
                        "enum field '{name}' has an empty value list"
                    )));
                }
                if dtype == ValueType::Float {
                    return Err(BeardError::config(format!(
                        "enum field '{name}' must use dtype int or str"
                    )));
                }
                FieldKind::Enum { values }
            }
            other => {
                return Err(BeardError::config(format!(
                    "field '{name}' has unknown type '{other}'"
                )));
            }
        };

        if desc.precision.is_some() && dtype != ValueType::Float {
            return Err(BeardError::config(format!(
                "field '{name}' sets 'precision' but is not a float"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            dtype,
            position: desc.pos.unwrap_or(index),
            optional: desc.optional,
            precision: desc.precision,
        })
    }

    fn to_descriptor(&self) -> FieldDescriptor {
        let mut desc = FieldDescriptor {
            kind: String::new(),
            name: self.name.clone(),
            dtype: Some(self.dtype.as_str().to_string()),
            pos: Some(self.position),
            length: None,
            values: None,
            optional: self.optional,
            precision: self.precision,
            bb_type: None,
            order: None,
        };
        match &self.kind {
            FieldKind::Value => desc.kind = "value".into(),
            FieldKind::Array { length } => {
                desc.kind = "array".into();
                desc.length = Some(*length);
            }
            FieldKind::BoxArray { order, reference } => {
                desc.kind = "box-array".into();
                desc.length = Some(4);
                desc.order = Some(
                    match order {
                        BoxOrder::XY => "x-y",
                        BoxOrder::YX => "y-x",
                    }
                    .into(),
                );
                desc.bb_type = Some(
                    match reference {
                        BoxReference::Absolute => "absolute",
                        BoxReference::Relative => "relative",
                    }
                    .into(),
                );
            }
            FieldKind::Enum { values } => {
                desc.kind = "enum".into();
                desc.values = Some(values.clone());
            }
        }
        desc
    }
}

/// One field entry exactly as it appears in a config document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// A config document: the `global` and `boxes` descriptor lists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub global: Vec<FieldDescriptor>,
    #[serde(default)]
    pub boxes: Vec<FieldDescriptor>,
}

/// The validated schema of a dataset's annotation files.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordConfig {
    /// Fields of the first line of every annotation file.
    pub global: Vec<FieldSchema>,
    /// Fields of each following (object) line.
    pub boxes: Vec<FieldSchema>,
}

impl RecordConfig {
    pub fn new(global: Vec<FieldSchema>, boxes: Vec<FieldSchema>) -> Result<Self, BeardError> {
        check_unique_names(&global, "global")?;
        check_unique_names(&boxes, "boxes")?;
        Ok(Self { global, boxes })
    }

    /// Validates a parsed document.
    pub fn from_document(doc: &ConfigDocument) -> Result<Self, BeardError> {
        let global = doc
            .global
            .iter()
            .enumerate()
            .map(|(i, desc)| FieldSchema::from_descriptor(desc, i))
            .collect::<Result<Vec<_>, _>>()?;
        let boxes = doc
            .boxes
            .iter()
            .enumerate()
            .map(|(i, desc)| FieldSchema::from_descriptor(desc, i))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(global, boxes)
    }

    pub fn to_document(&self) -> ConfigDocument {
        ConfigDocument {
            global: self.global.iter().map(FieldSchema::to_descriptor).collect(),
            boxes: self.boxes.iter().map(FieldSchema::to_descriptor).collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, BeardError> {
        let doc: ConfigDocument =
            serde_json::from_str(json).map_err(|source| BeardError::ConfigJsonParse {
                path: PathBuf::from("<string>"),
                source,
            })?;
        Self::from_document(&doc)
    }

    /// Reads a JSON or YAML config, chosen by file extension.
    pub fn from_path(path: &Path) -> Result<Self, BeardError> {
        let data = fs::read_to_string(path).map_err(BeardError::Io)?;
        let doc: ConfigDocument = if is_yaml(path) {
            serde_yaml::from_str(&data).map_err(|source| BeardError::ConfigYamlParse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_json::from_str(&data).map_err(|source| BeardError::ConfigJsonParse {
                path: path.to_path_buf(),
                source,
            })?
        };
        Self::from_document(&doc)
    }

    /// Writes the config as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), BeardError> {
        let json = serde_json::to_string_pretty(&self.to_document()).map_err(|source| {
            BeardError::ConfigWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(BeardError::Io)
    }

    /// Box-array fields of the object schema.
    pub fn box_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.boxes.iter().filter(|field| field.is_box_array())
    }

    /// The object field named `class`, if any.
    pub fn class_field(&self) -> Option<&FieldSchema> {
        self.boxes.iter().find(|field| field.name == CLASS_FIELD)
    }

    /// Replaces the value list of the `class` enum.
    ///
    /// Configs without an enum `class` field are returned unchanged.
    pub fn with_class_values(mut self, classes: &[String]) -> Self {
        if let Some(field) = self.boxes.iter_mut().find(|f| f.name == CLASS_FIELD) {
            if let FieldKind::Enum { values } = &mut field.kind {
                *values = classes.to_vec();
            }
        }
        self
    }

    /// The config describing records after loading: every box-array is
    /// absolute and y-x ordered.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        for field in config.global.iter_mut().chain(config.boxes.iter_mut()) {
            if let FieldKind::BoxArray { order, reference } = &mut field.kind {
                *order = BoxOrder::YX;
                *reference = BoxReference::Absolute;
            }
        }
        config
    }
}

fn check_unique_names(fields: &[FieldSchema], list: &str) -> Result<(), BeardError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(BeardError::config(format!(
                "duplicate field name '{}' in '{list}'",
                field.name
            )));
        }
    }
    Ok(())
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

/// Locates the dataset config inside `folder`.
///
/// `pattern` is either an exact file name or a glob such as `beard*.json`.
/// Without a pattern the first `*.json` is used, then the first
/// `*.yaml`/`*.yml`. Candidates are compared in sorted order.
pub fn find_config(folder: &Path, pattern: Option<&str>) -> Result<PathBuf, BeardError> {
    let mut names: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(BeardError::Io)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    names.sort();

    let patterns: Vec<&str> = match pattern {
        Some(pattern) => vec![pattern],
        None => vec!["*.json", "*.yaml", "*.yml"],
    };

    for raw in &patterns {
        let pattern = glob::Pattern::new(raw).map_err(|err| {
            BeardError::config(format!("invalid config pattern '{raw}': {err}"))
        })?;
        let found = names.iter().find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name))
        });
        if let Some(path) = found {
            return Ok(path.clone());
        }
    }

    Err(BeardError::ConfigNotFound {
        folder: folder.to_path_buf(),
        pattern: patterns.join(", "),
    })
}
