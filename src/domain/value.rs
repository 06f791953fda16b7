// Uniform value abstraction - parse/convert/render for every signal type
use crate::domain::descriptor::{ScalarKind, Shape};
use crate::error::ArchiveError;
use serde_json::Value as Json;
use std::fmt;

/// One decoded signal value, tagged by primitive type and shape. Dispatch is
/// over this closed set, keyed by `(ScalarKind, Shape)` at parse time; adding
/// a type means adding a variant and its table entries.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    Float(f32),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Bool(bool),
    Str(String),
    State(u32),
    DoubleArray(Vec<f64>),
    FloatArray(Vec<f32>),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    UInt8Array(Vec<u8>),
    UInt16Array(Vec<u16>),
    UInt32Array(Vec<u32>),
    UInt64Array(Vec<u64>),
    BoolArray(Vec<bool>),
    StrArray(Vec<String>),
    StateArray(Vec<u32>),
}

/// Label for an enumerated state code.
pub fn state_label(code: u32) -> &'static str {
    match code {
        0 => "ON",
        1 => "OFF",
        2 => "CLOSE",
        3 => "OPEN",
        4 => "INSERT",
        5 => "EXTRACT",
        6 => "MOVING",
        7 => "STANDBY",
        8 => "FAULT",
        9 => "INIT",
        10 => "RUNNING",
        11 => "ALARM",
        12 => "DISABLE",
        13 => "UNKNOWN",
        _ => "UNKNOWN",
    }
}

// Raw column parsing. The backend may hand back a native JSON number/bool or
// its string form; null and the empty string default to the type sentinel,
// a malformed non-empty string is a decode error.

fn parse_f64(raw: &Json) -> Result<f64, ArchiveError> {
    match raw {
        Json::Null => Ok(f64::NAN),
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| ArchiveError::Decode(format!("not a double: {n}"))),
        Json::String(s) if s.trim().is_empty() => Ok(f64::NAN),
        Json::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ArchiveError::Decode(format!("invalid double syntax: {s:?}"))),
        other => Err(ArchiveError::Decode(format!("unexpected double value: {other}"))),
    }
}

fn parse_i64(raw: &Json) -> Result<i64, ArchiveError> {
    match raw {
        Json::Null => Ok(0),
        Json::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| ArchiveError::Decode(format!("not an integer: {n}"))),
        Json::String(s) if s.trim().is_empty() => Ok(0),
        Json::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ArchiveError::Decode(format!("invalid integer syntax: {s:?}"))),
        other => Err(ArchiveError::Decode(format!("unexpected integer value: {other}"))),
    }
}

fn parse_u64(raw: &Json) -> Result<u64, ArchiveError> {
    match raw {
        Json::Null => Ok(0),
        Json::Number(n) => n
            .as_u64()
            .ok_or_else(|| ArchiveError::Decode(format!("not an unsigned integer: {n}"))),
        Json::String(s) if s.trim().is_empty() => Ok(0),
        Json::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| ArchiveError::Decode(format!("invalid unsigned syntax: {s:?}"))),
        other => Err(ArchiveError::Decode(format!("unexpected unsigned value: {other}"))),
    }
}

fn parse_bool(raw: &Json) -> Result<bool, ArchiveError> {
    match raw {
        Json::Null => Ok(false),
        Json::Bool(b) => Ok(*b),
        Json::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        Json::String(s) if s.trim().is_empty() => Ok(false),
        Json::String(s) => match s.trim() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            other => Err(ArchiveError::Decode(format!("invalid boolean syntax: {other:?}"))),
        },
        other => Err(ArchiveError::Decode(format!("unexpected boolean value: {other}"))),
    }
}

fn parse_string(raw: &Json) -> Result<String, ArchiveError> {
    match raw {
        Json::Null => Ok(String::new()),
        Json::String(s) => Ok(s.clone()),
        Json::Number(n) => Ok(n.to_string()),
        Json::Bool(b) => Ok(b.to_string()),
        other => Err(ArchiveError::Decode(format!("unexpected string value: {other}"))),
    }
}

fn elements(raw: &Json) -> Result<&[Json], ArchiveError> {
    match raw {
        Json::Null => Ok(&[]),
        Json::Array(items) => Ok(items),
        other => Err(ArchiveError::Decode(format!("expected array value, got: {other}"))),
    }
}

fn parse_vec<T>(
    raw: &Json,
    f: impl Fn(&Json) -> Result<T, ArchiveError>,
) -> Result<Vec<T>, ArchiveError> {
    elements(raw)?.iter().map(f).collect()
}

impl Value {
    /// Parse one raw column into its native representation, dispatching on
    /// the descriptor's type and shape tags.
    pub fn parse(kind: ScalarKind, shape: Shape, raw: &Json) -> Result<Value, ArchiveError> {
        match shape {
            Shape::Scalar => match kind {
                ScalarKind::Double => Ok(Value::Double(parse_f64(raw)?)),
                ScalarKind::Float => Ok(Value::Float(parse_f64(raw)? as f32)),
                ScalarKind::Int8 => Ok(Value::Int8(parse_i64(raw)? as i8)),
                ScalarKind::Int16 => Ok(Value::Int16(parse_i64(raw)? as i16)),
                ScalarKind::Int32 => Ok(Value::Int32(parse_i64(raw)? as i32)),
                ScalarKind::Int64 => Ok(Value::Int64(parse_i64(raw)?)),
                ScalarKind::UInt8 => Ok(Value::UInt8(parse_u64(raw)? as u8)),
                ScalarKind::UInt16 => Ok(Value::UInt16(parse_u64(raw)? as u16)),
                ScalarKind::UInt32 => Ok(Value::UInt32(parse_u64(raw)? as u32)),
                ScalarKind::UInt64 => Ok(Value::UInt64(parse_u64(raw)?)),
                ScalarKind::Bool => Ok(Value::Bool(parse_bool(raw)?)),
                ScalarKind::Str => Ok(Value::Str(parse_string(raw)?)),
                ScalarKind::State => Ok(Value::State(parse_i64(raw)? as u32)),
            },
            Shape::Array => match kind {
                ScalarKind::Double => Ok(Value::DoubleArray(parse_vec(raw, parse_f64)?)),
                ScalarKind::Float => {
                    Ok(Value::FloatArray(parse_vec(raw, |v| Ok(parse_f64(v)? as f32))?))
                }
                ScalarKind::Int8 => {
                    Ok(Value::Int8Array(parse_vec(raw, |v| Ok(parse_i64(v)? as i8))?))
                }
                ScalarKind::Int16 => {
                    Ok(Value::Int16Array(parse_vec(raw, |v| Ok(parse_i64(v)? as i16))?))
                }
                ScalarKind::Int32 => {
                    Ok(Value::Int32Array(parse_vec(raw, |v| Ok(parse_i64(v)? as i32))?))
                }
                ScalarKind::Int64 => Ok(Value::Int64Array(parse_vec(raw, parse_i64)?)),
                ScalarKind::UInt8 => {
                    Ok(Value::UInt8Array(parse_vec(raw, |v| Ok(parse_u64(v)? as u8))?))
                }
                ScalarKind::UInt16 => {
                    Ok(Value::UInt16Array(parse_vec(raw, |v| Ok(parse_u64(v)? as u16))?))
                }
                ScalarKind::UInt32 => {
                    Ok(Value::UInt32Array(parse_vec(raw, |v| Ok(parse_u64(v)? as u32))?))
                }
                ScalarKind::UInt64 => Ok(Value::UInt64Array(parse_vec(raw, parse_u64)?)),
                ScalarKind::Bool => Ok(Value::BoolArray(parse_vec(raw, parse_bool)?)),
                ScalarKind::Str => Ok(Value::StrArray(parse_vec(raw, parse_string)?)),
                ScalarKind::State => {
                    Ok(Value::StateArray(parse_vec(raw, |v| Ok(parse_i64(v)? as u32))?))
                }
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Double(_) => "double",
            Value::Float(_) => "float",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::State(_) => "state",
            Value::DoubleArray(_) => "double[]",
            Value::FloatArray(_) => "float[]",
            Value::Int8Array(_) => "int8[]",
            Value::Int16Array(_) => "int16[]",
            Value::Int32Array(_) => "int32[]",
            Value::Int64Array(_) => "int64[]",
            Value::UInt8Array(_) => "uint8[]",
            Value::UInt16Array(_) => "uint16[]",
            Value::UInt32Array(_) => "uint32[]",
            Value::UInt64Array(_) => "uint64[]",
            Value::BoolArray(_) => "bool[]",
            Value::StrArray(_) => "string[]",
            Value::StateArray(_) => "state[]",
        }
    }

    pub fn is_array(&self) -> bool {
        self.type_name().ends_with("[]")
    }

    fn unsupported(&self, to: &'static str) -> ArchiveError {
        ArchiveError::UnsupportedConversion {
            from: self.type_name(),
            to,
        }
    }

    /// Generic double representation for numeric scalars.
    pub fn as_f64(&self) -> Result<f64, ArchiveError> {
        match self {
            Value::Double(v) => Ok(*v),
            Value::Float(v) => Ok(f64::from(*v)),
            Value::Int8(v) => Ok(f64::from(*v)),
            Value::Int16(v) => Ok(f64::from(*v)),
            Value::Int32(v) => Ok(f64::from(*v)),
            Value::Int64(v) => Ok(*v as f64),
            Value::UInt8(v) => Ok(f64::from(*v)),
            Value::UInt16(v) => Ok(f64::from(*v)),
            Value::UInt32(v) => Ok(f64::from(*v)),
            Value::UInt64(v) => Ok(*v as f64),
            Value::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Value::State(v) => Ok(f64::from(*v)),
            _ => Err(self.unsupported("double")),
        }
    }

    /// Generic double-array representation; a numeric scalar converts to a
    /// one-element array.
    pub fn as_f64_vec(&self) -> Result<Vec<f64>, ArchiveError> {
        match self {
            Value::DoubleArray(v) => Ok(v.clone()),
            Value::FloatArray(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            Value::Int8Array(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            Value::Int16Array(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            Value::Int32Array(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            Value::Int64Array(v) => Ok(v.iter().map(|x| *x as f64).collect()),
            Value::UInt8Array(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            Value::UInt16Array(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            Value::UInt32Array(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            Value::UInt64Array(v) => Ok(v.iter().map(|x| *x as f64).collect()),
            Value::BoolArray(v) => Ok(v.iter().map(|x| if *x { 1.0 } else { 0.0 }).collect()),
            Value::StateArray(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            Value::StrArray(_) | Value::Str(_) => Err(self.unsupported("double[]")),
            scalar => Ok(vec![scalar.as_f64()?]),
        }
    }

    /// Generic integer representation for numeric scalars.
    pub fn as_i64(&self) -> Result<i64, ArchiveError> {
        match self {
            Value::Double(v) => Ok(*v as i64),
            Value::Float(v) => Ok(*v as i64),
            Value::Int8(v) => Ok(i64::from(*v)),
            Value::Int16(v) => Ok(i64::from(*v)),
            Value::Int32(v) => Ok(i64::from(*v)),
            Value::Int64(v) => Ok(*v),
            Value::UInt8(v) => Ok(i64::from(*v)),
            Value::UInt16(v) => Ok(i64::from(*v)),
            Value::UInt32(v) => Ok(i64::from(*v)),
            Value::UInt64(v) => Ok(*v as i64),
            Value::Bool(v) => Ok(i64::from(*v)),
            Value::State(v) => Ok(i64::from(*v)),
            _ => Err(self.unsupported("int64")),
        }
    }

    /// Generic integer-array representation; a numeric scalar converts to a
    /// one-element array.
    pub fn as_i64_vec(&self) -> Result<Vec<i64>, ArchiveError> {
        match self {
            Value::DoubleArray(v) => Ok(v.iter().map(|x| *x as i64).collect()),
            Value::FloatArray(v) => Ok(v.iter().map(|x| *x as i64).collect()),
            Value::Int8Array(v) => Ok(v.iter().map(|x| i64::from(*x)).collect()),
            Value::Int16Array(v) => Ok(v.iter().map(|x| i64::from(*x)).collect()),
            Value::Int32Array(v) => Ok(v.iter().map(|x| i64::from(*x)).collect()),
            Value::Int64Array(v) => Ok(v.clone()),
            Value::UInt8Array(v) => Ok(v.iter().map(|x| i64::from(*x)).collect()),
            Value::UInt16Array(v) => Ok(v.iter().map(|x| i64::from(*x)).collect()),
            Value::UInt32Array(v) => Ok(v.iter().map(|x| i64::from(*x)).collect()),
            Value::UInt64Array(v) => Ok(v.iter().map(|x| *x as i64).collect()),
            Value::BoolArray(v) => Ok(v.iter().map(|x| i64::from(*x)).collect()),
            Value::StateArray(v) => Ok(v.iter().map(|x| i64::from(*x)).collect()),
            Value::StrArray(_) | Value::Str(_) => Err(self.unsupported("int64[]")),
            scalar => Ok(vec![scalar.as_i64()?]),
        }
    }

    /// Number of items (1 for scalars).
    pub fn len(&self) -> usize {
        match self {
            Value::DoubleArray(v) => v.len(),
            Value::FloatArray(v) => v.len(),
            Value::Int8Array(v) => v.len(),
            Value::Int16Array(v) => v.len(),
            Value::Int32Array(v) => v.len(),
            Value::Int64Array(v) => v.len(),
            Value::UInt8Array(v) => v.len(),
            Value::UInt16Array(v) => v.len(),
            Value::UInt32Array(v) => v.len(),
            Value::UInt64Array(v) => v.len(),
            Value::BoolArray(v) => v.len(),
            Value::StrArray(v) => v.len(),
            Value::StateArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a numeric conversion factor in place. No-op for boolean, string
    /// and state types.
    pub fn apply_factor(&mut self, f: f64) {
        match self {
            Value::Double(v) => *v *= f,
            Value::Float(v) => *v = (f64::from(*v) * f) as f32,
            Value::Int8(v) => *v = (f64::from(*v) * f) as i8,
            Value::Int16(v) => *v = (f64::from(*v) * f) as i16,
            Value::Int32(v) => *v = (f64::from(*v) * f) as i32,
            Value::Int64(v) => *v = (*v as f64 * f) as i64,
            Value::UInt8(v) => *v = (f64::from(*v) * f) as u8,
            Value::UInt16(v) => *v = (f64::from(*v) * f) as u16,
            Value::UInt32(v) => *v = (f64::from(*v) * f) as u32,
            Value::UInt64(v) => *v = (*v as f64 * f) as u64,
            Value::DoubleArray(v) => v.iter_mut().for_each(|x| *x *= f),
            Value::FloatArray(v) => v.iter_mut().for_each(|x| *x = (f64::from(*x) * f) as f32),
            Value::Int8Array(v) => v.iter_mut().for_each(|x| *x = (f64::from(*x) * f) as i8),
            Value::Int16Array(v) => v.iter_mut().for_each(|x| *x = (f64::from(*x) * f) as i16),
            Value::Int32Array(v) => v.iter_mut().for_each(|x| *x = (f64::from(*x) * f) as i32),
            Value::Int64Array(v) => v.iter_mut().for_each(|x| *x = (*x as f64 * f) as i64),
            Value::UInt8Array(v) => v.iter_mut().for_each(|x| *x = (f64::from(*x) * f) as u8),
            Value::UInt16Array(v) => v.iter_mut().for_each(|x| *x = (f64::from(*x) * f) as u16),
            Value::UInt32Array(v) => v.iter_mut().for_each(|x| *x = (f64::from(*x) * f) as u32),
            Value::UInt64Array(v) => v.iter_mut().for_each(|x| *x = (*x as f64 * f) as u64),
            Value::Bool(_)
            | Value::Str(_)
            | Value::State(_)
            | Value::BoolArray(_)
            | Value::StrArray(_)
            | Value::StateArray(_) => {}
        }
    }
}

fn fmt_array<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::State(v) => write!(f, "{}", state_label(*v)),
            Value::DoubleArray(v) => fmt_array(f, v),
            Value::FloatArray(v) => fmt_array(f, v),
            Value::Int8Array(v) => fmt_array(f, v),
            Value::Int16Array(v) => fmt_array(f, v),
            Value::Int32Array(v) => fmt_array(f, v),
            Value::Int64Array(v) => fmt_array(f, v),
            Value::UInt8Array(v) => fmt_array(f, v),
            Value::UInt16Array(v) => fmt_array(f, v),
            Value::UInt32Array(v) => fmt_array(f, v),
            Value::UInt64Array(v) => fmt_array(f, v),
            Value::BoolArray(v) => fmt_array(f, v),
            Value::StrArray(v) => fmt_array(f, v),
            Value::StateArray(v) => {
                let labels: Vec<&'static str> =
                    v.iter().map(|code| state_label(*code)).collect();
                fmt_array(f, &labels)
            }
        }
    }
}
