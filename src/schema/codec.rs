//! Token-level encoding and decoding of annotation lines.
//!
//! Decoding walks the schema in declaration order and consumes tokens from
//! the left. Encoding emits each field's tokens and then orders them by the
//! field's `position`, which lets a layout store its columns in a different
//! order than the one it is processed in.
//!
//! Enum values outside the declared list never fail a row. They decode to a
//! sentinel (`UNKNOWN` for string enums, `-1` for integer enums) and are
//! reported as [`CodecDiagnostic`]s, so callers can log or escalate them.

use crate::error::BeardError;
use crate::ir::{Fields, Value};

use super::{FieldKind, FieldSchema, ValueType};

/// Sentinel for string enum values outside the declared list.
pub const UNKNOWN: &str = "UNKNOWN";

/// Sentinel for integer enum values outside the declared range.
pub const UNKNOWN_INDEX: i64 = -1;

/// A non-fatal decoding or encoding problem.
#[derive(Clone, Debug, PartialEq)]
pub struct CodecDiagnostic {
    /// Name of the affected field.
    pub field: String,
    pub message: String,
}

/// Result of decoding one line.
#[derive(Debug)]
pub struct Decoded<'a> {
    pub fields: Fields,
    /// Tokens left over after every schema entry has been consumed.
    pub remaining: &'a [&'a str],
    pub diagnostics: Vec<CodecDiagnostic>,
}

/// Result of encoding one line.
#[derive(Debug, Default)]
pub struct Encoded {
    /// Tokens in output (position) order.
    pub tokens: Vec<String>,
    pub diagnostics: Vec<CodecDiagnostic>,
}

impl Encoded {
    /// Whitespace-joined line.
    pub fn line(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Decodes `tokens` against `schema`.
///
/// Fails with [`BeardError::Format`] when a token cannot be cast to its
/// declared type or when a required field finds no tokens left.
pub fn decode_row<'a>(
    tokens: &'a [&'a str],
    schema: &[FieldSchema],
) -> Result<Decoded<'a>, BeardError> {
    let mut fields = Fields::new();
    let mut diagnostics = Vec::new();
    let mut rest = tokens;

    for field in schema {
        if rest.is_empty() {
            if field.optional {
                fields.insert(field.name.clone(), Value::Null);
                continue;
            }
            return Err(BeardError::format(format!(
                "could not extract field '{}': no tokens left",
                field.name
            )));
        }

        let value = match &field.kind {
            FieldKind::Value => {
                let value = parse_scalar(rest[0], field.dtype, &field.name)?;
                rest = &rest[1..];
                value
            }
            FieldKind::Array { .. } | FieldKind::BoxArray { .. } => {
                let width = field.width();
                if rest.len() < width {
                    return Err(BeardError::format(format!(
                        "field '{}' expects {} tokens, found {}",
                        field.name,
                        width,
                        rest.len()
                    )));
                }
                // Box coordinates stay f64 until encoding, whatever their dtype.
                let dtype = if field.is_box_array() {
                    ValueType::Float
                } else {
                    field.dtype
                };
                let items = rest[..width]
                    .iter()
                    .map(|token| parse_scalar(token, dtype, &field.name))
                    .collect::<Result<Vec<_>, _>>()?;
                rest = &rest[width..];
                Value::Array(items)
            }
            FieldKind::Enum { values } => {
                let token = rest[0];
                rest = &rest[1..];
                decode_enum(token, values, field, &mut diagnostics)?
            }
        };

        fields.insert(field.name.clone(), value);
    }

    Ok(Decoded {
        fields,
        remaining: rest,
        diagnostics,
    })
}

/// Encodes `data` into tokens ordered by each field's `position`.
///
/// Missing or `Null` optional fields emit nothing. A missing required field
/// or a value that does not fit its field fails with [`BeardError::Format`].
pub fn encode_row(data: &Fields, schema: &[FieldSchema]) -> Result<Encoded, BeardError> {
    let mut slots: Vec<(usize, Vec<String>)> = Vec::with_capacity(schema.len());
    let mut diagnostics = Vec::new();

    for field in schema {
        let value = match data.get(&field.name) {
            Some(Value::Null) | None if field.optional => continue,
            Some(value) => value,
            None => {
                return Err(BeardError::format(format!(
                    "missing value for required field '{}'",
                    field.name
                )));
            }
        };

        let tokens = match &field.kind {
            FieldKind::Value => vec![format_scalar(value, field)?],
            FieldKind::Array { length } => {
                let Value::Array(items) = value else {
                    return Err(BeardError::format(format!(
                        "field '{}' expects an array, found {value}",
                        field.name
                    )));
                };
                if items.len() != *length {
                    return Err(BeardError::format(format!(
                        "field '{}' expects {} values, found {}",
                        field.name,
                        length,
                        items.len()
                    )));
                }
                items
                    .iter()
                    .map(|item| format_scalar(item, field))
                    .collect::<Result<Vec<_>, _>>()?
            }
            FieldKind::BoxArray { .. } => match value {
                Value::Box(bbox) => bbox
                    .to_yxyx()
                    .iter()
                    .map(|v| format_scalar(&Value::Float(*v), field))
                    .collect::<Result<Vec<_>, _>>()?,
                Value::Array(items) if items.len() == 4 => items
                    .iter()
                    .map(|item| format_scalar(item, field))
                    .collect::<Result<Vec<_>, _>>()?,
                other => {
                    return Err(BeardError::format(format!(
                        "field '{}' expects a box, found {other}",
                        field.name
                    )));
                }
            },
            FieldKind::Enum { values } => {
                vec![encode_enum(value, values, field, &mut diagnostics)?]
            }
        };

        slots.push((field.position, tokens));
    }

    // Stable: equal positions keep declaration order.
    slots.sort_by_key(|(position, _)| *position);

    Ok(Encoded {
        tokens: slots.into_iter().flat_map(|(_, tokens)| tokens).collect(),
        diagnostics,
    })
}

fn decode_enum(
    token: &str,
    values: &[String],
    field: &FieldSchema,
    diagnostics: &mut Vec<CodecDiagnostic>,
) -> Result<Value, BeardError> {
    match field.dtype {
        ValueType::Int => {
            let index = token.parse::<i64>().map_err(|_| {
                BeardError::format(format!(
                    "invalid index '{token}' for enum '{}'; expected integer",
                    field.name
                ))
            })?;
            if index < 0 || index as usize >= values.len() {
                diagnostics.push(out_of_range(field, token, values));
                Ok(Value::Int(UNKNOWN_INDEX))
            } else {
                Ok(Value::Int(index))
            }
        }
        _ => match lookup(token, values) {
            // Restore the declared spelling.
            Some(index) => Ok(Value::Str(values[index].clone())),
            None => {
                diagnostics.push(out_of_range(field, token, values));
                Ok(Value::Str(UNKNOWN.to_string()))
            }
        },
    }
}

fn encode_enum(
    value: &Value,
    values: &[String],
    field: &FieldSchema,
    diagnostics: &mut Vec<CodecDiagnostic>,
) -> Result<String, BeardError> {
    let index = match value {
        Value::Str(name) => lookup(name, values),
        Value::Int(index) if *index >= 0 && (*index as usize) < values.len() => {
            Some(*index as usize)
        }
        Value::Int(_) => None,
        other => {
            return Err(BeardError::format(format!(
                "enum '{}' cannot encode {other}",
                field.name
            )));
        }
    };

    match (index, field.dtype) {
        (Some(index), ValueType::Int) => Ok(index.to_string()),
        (Some(index), _) => Ok(values[index].clone()),
        (None, dtype) => {
            diagnostics.push(out_of_range(field, &value.to_string(), values));
            Ok(match dtype {
                ValueType::Int => UNKNOWN_INDEX.to_string(),
                _ => UNKNOWN.to_string(),
            })
        }
    }
}

/// Case-insensitive lookup of `token` in the value list.
fn lookup(token: &str, values: &[String]) -> Option<usize> {
    let upper = token.to_uppercase();
    values.iter().position(|value| value.to_uppercase() == upper)
}

fn out_of_range(field: &FieldSchema, token: &str, values: &[String]) -> CodecDiagnostic {
    CodecDiagnostic {
        field: field.name.clone(),
        message: format!(
            "value '{token}' is out of range ({}) or not in the value list {:?}",
            values.len(),
            values
        ),
    }
}

fn parse_scalar(token: &str, dtype: ValueType, field: &str) -> Result<Value, BeardError> {
    match dtype {
        ValueType::Int => token.parse::<i64>().map(Value::Int).map_err(|_| {
            BeardError::format(format!(
                "invalid {field} '{token}'; expected integer"
            ))
        }),
        ValueType::Float => token.parse::<f64>().map(Value::Float).map_err(|_| {
            BeardError::format(format!(
                "invalid {field} '{token}'; expected floating-point number"
            ))
        }),
        ValueType::Str => Ok(Value::Str(token.to_string())),
    }
}

/// Floats use the field's `precision` when set, else the shortest form that
/// parses back to the same value (`0.00` becomes `0`).
fn format_scalar(value: &Value, field: &FieldSchema) -> Result<String, BeardError> {
    let float = |v: f64| match field.precision {
        Some(places) => format!("{v:.places$}"),
        None => v.to_string(),
    };
    match (field.dtype, value) {
        (ValueType::Int, Value::Int(v)) => Ok(v.to_string()),
        (ValueType::Int, Value::Float(v)) => Ok((v.round() as i64).to_string()),
        (ValueType::Float, Value::Float(v)) => Ok(float(*v)),
        (ValueType::Float, Value::Int(v)) => Ok(float(*v as f64)),
        (ValueType::Str, Value::Str(v)) => Ok(v.clone()),
        (ValueType::Str, Value::Int(v)) => Ok(v.to_string()),
        (ValueType::Str, Value::Float(v)) => Ok(v.to_string()),
        (_, other) => Err(BeardError::format(format!(
            "field '{}' cannot encode {other} as {}",
            field.name,
            field.dtype.as_str()
        ))),
    }
}
