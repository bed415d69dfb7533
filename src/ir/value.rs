//! Decoded annotation values.

use std::collections::BTreeMap;
use std::fmt;

use super::{BBox, Pixel};

/// Named values of one annotation line (the global line or one object).
pub type Fields = BTreeMap<String, Value>;

/// A single decoded field value.
///
/// `Box` only appears after a box-array field has been normalized onto the
/// transformed image; freshly decoded box-arrays are `Array`s of their raw
/// tokens.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An absent optional field.
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    /// Absolute y-x pixel box on the (transformed) image.
    Box(BBox<Pixel>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of a scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Interprets the value as a normalized box.
    ///
    /// Four-element numeric arrays are read as `[y1, x1, y2, x2]`.
    pub fn as_bbox(&self) -> Option<BBox<Pixel>> {
        match self {
            Value::Box(bbox) => Some(*bbox),
            Value::Array(items) if items.len() == 4 => {
                let mut raw = [0.0; 4];
                for (slot, item) in raw.iter_mut().zip(items) {
                    *slot = item.as_f64()?;
                }
                Some(BBox::from_yxyx(raw[0], raw[1], raw[2], raw[3]))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Box(bbox) => {
                let [y1, x1, y2, x2] = bbox.to_yxyx();
                write!(f, "[{y1}, {x1}, {y2}, {x2}]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<BBox<Pixel>> for Value {
    fn from(v: BBox<Pixel>) -> Self {
        Value::Box(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_of_numbers_reads_as_bbox() {
        let value = Value::Array(vec![
            Value::Int(10),
            Value::Int(20),
            Value::Float(30.5),
            Value::Int(40),
        ]);
        let bbox = value.as_bbox().expect("numeric array is a box");
        assert_eq!(bbox.to_yxyx(), [10.0, 20.0, 30.5, 40.0]);
    }

    #[test]
    fn non_numeric_array_is_not_a_bbox() {
        let value = Value::Array(vec![Value::from("a"); 4]);
        assert!(value.as_bbox().is_none());
        assert!(Value::Array(vec![Value::Int(1); 3]).as_bbox().is_none());
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::Float(2.5)]).to_string(),
            "[1, 2.5]"
        );
    }
}
