//! Conversion between device wire values and bridge values.
//!
//! Reads collapse every supported integer width onto a signed 32-bit
//! number. Wider integers, floating point, structures and arrays are
//! rejected on the read path. Writes accept the full elementary type set and check both
//! the shape (scalar or array) and the range before anything is sent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cip::{RawValue, WireType, WireValue};
use crate::directory::Tag;
use crate::messages::ReadResponseData;

/// A single JSON-compatible value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    fn kind(&self) -> &'static str {
        match self {
            ScalarValue::Bool(_) => "boolean",
            ScalarValue::Int(_) | ScalarValue::UInt(_) => "integer",
            ScalarValue::Float(_) => "float",
            ScalarValue::Text(_) => "string",
        }
    }
}

/// A bridge-side tag value: null, a scalar or a flat array of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum TagValue {
    #[default]
    Null,
    Scalar(ScalarValue),
    Array(Vec<ScalarValue>),
}

impl TagValue {
    pub fn kind(&self) -> &'static str {
        match self {
            TagValue::Null => "null",
            TagValue::Scalar(scalar) => scalar.kind(),
            TagValue::Array(_) => "array",
        }
    }
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        TagValue::Scalar(ScalarValue::Bool(v))
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Scalar(ScalarValue::Int(v))
    }
}

impl From<i32> for TagValue {
    fn from(v: i32) -> Self {
        TagValue::Scalar(ScalarValue::Int(v.into()))
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Scalar(ScalarValue::Float(v))
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Scalar(ScalarValue::Text(v.to_string()))
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Scalar(ScalarValue::Text(v))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("unsupported data type: 0x{:02X}", .0.code())]
    UnsupportedType(WireType),

    #[error("unsupported data type: array of 0x{:02X}", .0.code())]
    UnsupportedArray(WireType),

    #[error("cannot convert {found} to {wire_type}: expected {expected}")]
    TypeMismatch {
        wire_type: WireType,
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected {expected} value, got {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} out of range for {wire_type}")]
    OutOfRange { value: String, wire_type: WireType },

    #[error("insufficient data for {wire_type}: need {needed} bytes, got {got}")]
    Truncated {
        wire_type: WireType,
        needed: usize,
        got: usize,
    },

    #[error("character {0:?} cannot be encoded in a STRING")]
    InvalidCharacter(char),

    #[error("cannot write an empty array")]
    EmptyArray,

    #[error("array of {0} elements is too large")]
    TooManyElements(usize),

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        source: Box<CodecError>,
    },
}

/// Convert a raw device value into a bridge value.
pub fn decode(raw: &RawValue) -> Result<TagValue, CodecError> {
    let wire_type = raw.wire_type;
    let data = raw.data.as_slice();

    let value = match wire_type {
        WireType::Null => TagValue::Null,
        WireType::Bool => TagValue::from(fixed::<1>(wire_type, data)?[0] != 0),
        WireType::Sint => int(i8::from_le_bytes(fixed(wire_type, data)?)),
        WireType::Usint => int(u8::from_le_bytes(fixed(wire_type, data)?)),
        WireType::Int => int(i16::from_le_bytes(fixed(wire_type, data)?)),
        WireType::Uint => int(u16::from_le_bytes(fixed(wire_type, data)?)),
        WireType::Dint => int(i32::from_le_bytes(fixed(wire_type, data)?)),
        WireType::Udint => {
            let v = u32::from_le_bytes(fixed(wire_type, data)?);
            let v = i32::try_from(v).map_err(|_| CodecError::OutOfRange {
                value: v.to_string(),
                wire_type,
            })?;
            int(v)
        }
        WireType::String => TagValue::from(decode_string(data)?),
        WireType::Lint
        | WireType::Ulint
        | WireType::Real
        | WireType::Lreal
        | WireType::Structured
        | WireType::Unknown(_) => return Err(CodecError::UnsupportedType(wire_type)),
    };

    Ok(value)
}

/// Decode a value read from `tag` and stamp the capture time.
///
/// Array tags fail: a read returns only their first element.
pub fn decode_sample(tag: &Tag, raw: &RawValue) -> Result<ReadResponseData, CodecError> {
    if tag.is_array() {
        return Err(CodecError::UnsupportedArray(tag.wire_type));
    }
    Ok(ReadResponseData {
        value: decode(raw)?,
        source_timestamp: zensight_common::rfc3339_now(),
    })
}

fn int(v: impl Into<i32>) -> TagValue {
    let v: i32 = v.into();
    TagValue::from(v)
}

fn fixed<const N: usize>(wire_type: WireType, data: &[u8]) -> Result<[u8; N], CodecError> {
    data.get(..N)
        .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
        .ok_or(CodecError::Truncated {
            wire_type,
            needed: N,
            got: data.len(),
        })
}

// STRING: u16 length followed by single-byte characters.
fn decode_string(data: &[u8]) -> Result<String, CodecError> {
    let len = u16::from_le_bytes(fixed(WireType::String, data)?) as usize;
    let chars = data.get(2..2 + len).ok_or(CodecError::Truncated {
        wire_type: WireType::String,
        needed: 2 + len,
        got: data.len(),
    })?;
    Ok(chars.iter().map(|b| char::from(*b)).collect())
}

/// Convert a bridge value into the wire form of `tag`'s declared type.
///
/// Nothing is written on error, and an array fails as a whole on its first
/// bad element.
pub fn encode(tag: &Tag, value: &TagValue) -> Result<WireValue, CodecError> {
    let wire_type = tag.wire_type;
    let mut data = Vec::new();

    let elements = match (value, tag.is_array()) {
        (TagValue::Array(items), true) => {
            if items.is_empty() {
                return Err(CodecError::EmptyArray);
            }
            for (index, item) in items.iter().enumerate() {
                encode_scalar(wire_type, item, &mut data).map_err(|e| CodecError::Element {
                    index,
                    source: Box::new(e),
                })?;
            }
            u16::try_from(items.len()).map_err(|_| CodecError::TooManyElements(items.len()))?
        }
        (TagValue::Array(_), false) => {
            return Err(CodecError::ShapeMismatch {
                expected: "scalar",
                found: "array",
            });
        }
        (other, true) => {
            return Err(CodecError::ShapeMismatch {
                expected: "array",
                found: other.kind(),
            });
        }
        (TagValue::Null, false) => {
            return Err(CodecError::TypeMismatch {
                wire_type,
                expected: expected_kind(wire_type),
                found: "null",
            });
        }
        (TagValue::Scalar(scalar), false) => {
            encode_scalar(wire_type, scalar, &mut data)?;
            1
        }
    };

    Ok(WireValue {
        wire_type,
        elements,
        data,
    })
}

fn expected_kind(wire_type: WireType) -> &'static str {
    match wire_type {
        WireType::Bool => "boolean",
        WireType::Real | WireType::Lreal => "number",
        WireType::String => "string",
        _ => "integer",
    }
}

fn encode_scalar(
    wire_type: WireType,
    value: &ScalarValue,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    match wire_type {
        WireType::Bool => match value {
            ScalarValue::Bool(b) => out.push(if *b { 0xFF } else { 0x00 }),
            other => return Err(mismatch(wire_type, other)),
        },
        WireType::Sint => out.extend(narrow::<i8>(wire_type, value)?.to_le_bytes()),
        WireType::Usint => out.extend(narrow::<u8>(wire_type, value)?.to_le_bytes()),
        WireType::Int => out.extend(narrow::<i16>(wire_type, value)?.to_le_bytes()),
        WireType::Uint => out.extend(narrow::<u16>(wire_type, value)?.to_le_bytes()),
        WireType::Dint => out.extend(narrow::<i32>(wire_type, value)?.to_le_bytes()),
        WireType::Udint => out.extend(narrow::<u32>(wire_type, value)?.to_le_bytes()),
        WireType::Lint => out.extend(narrow::<i64>(wire_type, value)?.to_le_bytes()),
        WireType::Ulint => out.extend(narrow::<u64>(wire_type, value)?.to_le_bytes()),
        WireType::Real => {
            let v = float(wire_type, value)?;
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                return Err(CodecError::OutOfRange {
                    value: v.to_string(),
                    wire_type,
                });
            }
            out.extend((v as f32).to_le_bytes());
        }
        WireType::Lreal => out.extend(float(wire_type, value)?.to_le_bytes()),
        WireType::String => match value {
            ScalarValue::Text(text) => encode_string(text, out)?,
            other => return Err(mismatch(wire_type, other)),
        },
        WireType::Null | WireType::Structured | WireType::Unknown(_) => {
            return Err(CodecError::UnsupportedType(wire_type));
        }
    }
    Ok(())
}

fn mismatch(wire_type: WireType, value: &ScalarValue) -> CodecError {
    CodecError::TypeMismatch {
        wire_type,
        expected: expected_kind(wire_type),
        found: value.kind(),
    }
}

// 2^53: beyond it not every integer has an exact f64.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Whole-number view of a value. Floats are accepted only without a
/// fraction and below 2^53 in magnitude.
fn integer(wire_type: WireType, value: &ScalarValue) -> Result<i128, CodecError> {
    match value {
        ScalarValue::Int(v) => Ok(i128::from(*v)),
        ScalarValue::UInt(v) => Ok(i128::from(*v)),
        ScalarValue::Float(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_FLOAT => {
            Ok(*v as i128)
        }
        ScalarValue::Float(v) => Err(CodecError::OutOfRange {
            value: v.to_string(),
            wire_type,
        }),
        other => Err(mismatch(wire_type, other)),
    }
}

fn narrow<T: TryFrom<i128>>(wire_type: WireType, value: &ScalarValue) -> Result<T, CodecError> {
    let v = integer(wire_type, value)?;
    T::try_from(v).map_err(|_| CodecError::OutOfRange {
        value: v.to_string(),
        wire_type,
    })
}

fn float(wire_type: WireType, value: &ScalarValue) -> Result<f64, CodecError> {
    match value {
        ScalarValue::Float(v) => Ok(*v),
        ScalarValue::Int(v) => Ok(*v as f64),
        ScalarValue::UInt(v) => Ok(*v as f64),
        other => Err(mismatch(wire_type, other)),
    }
}

fn encode_string(text: &str, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let bytes = text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| CodecError::InvalidCharacter(c)))
        .collect::<Result<Vec<u8>, _>>()?;
    let len = u16::try_from(bytes.len()).map_err(|_| CodecError::OutOfRange {
        value: format!("string of {} characters", bytes.len()),
        wire_type: WireType::String,
    })?;

    out.extend(len.to_le_bytes());
    out.extend(bytes);
    Ok(())
}
