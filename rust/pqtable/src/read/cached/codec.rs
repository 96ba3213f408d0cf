//! Byte layout of cells held in the column stores of a cached table.
//!
//! Every item starts with a presence byte (0 for null, 1 otherwise). Fixed-width
//! scalars follow with their little-endian value; a null is padded with zeroes
//! to the full item size so that the column fits a fixed-size store. Strings and
//! byte strings follow with their raw bytes. Arrays follow with a `u32` element
//! count and the elements; booleans take one byte each, and string elements are
//! a presence byte plus, when present, a `u32` length and the UTF-8 bytes.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use pqtable_common::{Error, Result, verify_data};

use crate::value::{Cell, ContentKind, ScalarKind, Value};

const NULL: u8 = 0;
const PRESENT: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemCodec {
    kind: ContentKind,
}

impl ItemCodec {
    pub fn new(kind: ContentKind) -> ItemCodec {
        ItemCodec { kind }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// Size of every encoded item, when it does not depend on the value.
    pub fn item_size(&self) -> Option<usize> {
        match self.kind {
            ContentKind::Scalar(kind) => kind.fixed_width().map(|width| width + 1),
            ContentKind::Array(_) => None,
        }
    }

    /// Appends the encoding of `value` to `out`.
    pub fn encode(&self, value: Option<&Value>, out: &mut Vec<u8>) -> Result<()> {
        let Some(value) = value else {
            out.push(NULL);
            if let Some(size) = self.item_size() {
                out.resize(out.len() + size - 1, 0);
            }
            return Ok(());
        };
        if value.kind() != self.kind {
            return Err(Error::invalid_arg(
                "value",
                format!("{} value in a {} column", value.kind(), self.kind),
            ));
        }
        out.push(PRESENT);
        match value {
            Value::Boolean(v) => out.push(*v as u8),
            Value::Byte(v) => out.write_i8(*v)?,
            Value::Short(v) => out.write_i16::<LittleEndian>(*v)?,
            Value::Int(v) => out.write_i32::<LittleEndian>(*v)?,
            Value::Long(v) => out.write_i64::<LittleEndian>(*v)?,
            Value::Float(v) => out.write_f32::<LittleEndian>(*v)?,
            Value::Double(v) => out.write_f64::<LittleEndian>(*v)?,
            Value::String(v) => out.extend_from_slice(v.as_bytes()),
            Value::Bytes(v) => out.extend_from_slice(v),
            Value::BooleanArray(v) => {
                write_count(out, v.len())?;
                out.extend(v.iter().map(|&b| b as u8));
            }
            Value::ByteArray(v) => {
                write_count(out, v.len())?;
                out.extend(v.iter().map(|&b| b as u8));
            }
            Value::ShortArray(v) => {
                write_count(out, v.len())?;
                for &x in v {
                    out.write_i16::<LittleEndian>(x)?;
                }
            }
            Value::IntArray(v) => {
                write_count(out, v.len())?;
                for &x in v {
                    out.write_i32::<LittleEndian>(x)?;
                }
            }
            Value::LongArray(v) => {
                write_count(out, v.len())?;
                for &x in v {
                    out.write_i64::<LittleEndian>(x)?;
                }
            }
            Value::FloatArray(v) => {
                write_count(out, v.len())?;
                for &x in v {
                    out.write_f32::<LittleEndian>(x)?;
                }
            }
            Value::DoubleArray(v) => {
                write_count(out, v.len())?;
                for &x in v {
                    out.write_f64::<LittleEndian>(x)?;
                }
            }
            Value::StringArray(v) => {
                write_count(out, v.len())?;
                for s in v {
                    match s {
                        Some(s) => {
                            out.push(PRESENT);
                            write_count(out, s.len())?;
                            out.extend_from_slice(s.as_bytes());
                        }
                        None => out.push(NULL),
                    }
                }
            }
        }
        Ok(())
    }

    pub fn decode(&self, item: &[u8]) -> Result<Cell> {
        let mut r = item;
        if r.read_u8().map_err(truncated)? == NULL {
            return Ok(None);
        }
        let value = match self.kind {
            ContentKind::Scalar(kind) => decode_scalar(kind, &mut r)?,
            ContentKind::Array(kind) => decode_array(kind, &mut r)?,
        };
        verify_data!(item, r.is_empty());
        Ok(Some(value))
    }
}

fn decode_scalar(kind: ScalarKind, r: &mut &[u8]) -> Result<Value> {
    let value = match kind {
        ScalarKind::Boolean => Value::Boolean(r.read_u8().map_err(truncated)? != 0),
        ScalarKind::Byte => Value::Byte(r.read_i8().map_err(truncated)?),
        ScalarKind::Short => Value::Short(r.read_i16::<LittleEndian>().map_err(truncated)?),
        ScalarKind::Int => Value::Int(r.read_i32::<LittleEndian>().map_err(truncated)?),
        ScalarKind::Long => Value::Long(r.read_i64::<LittleEndian>().map_err(truncated)?),
        ScalarKind::Float => Value::Float(r.read_f32::<LittleEndian>().map_err(truncated)?),
        ScalarKind::Double => Value::Double(r.read_f64::<LittleEndian>().map_err(truncated)?),
        ScalarKind::String => Value::String(String::from_utf8_lossy(take_rest(r)).into_owned()),
        ScalarKind::Bytes => Value::Bytes(take_rest(r).to_vec()),
    };
    Ok(value)
}

fn decode_array(kind: ScalarKind, r: &mut &[u8]) -> Result<Value> {
    let count = r.read_u32::<LittleEndian>().map_err(truncated)? as usize;
    // Every element takes at least one byte.
    verify_data!(count, count <= r.len());
    let value = match kind {
        ScalarKind::Boolean => Value::BooleanArray(
            (0..count)
                .map(|_| r.read_u8().map(|b| b != 0))
                .collect::<std::io::Result<_>>()
                .map_err(truncated)?,
        ),
        ScalarKind::Byte => Value::ByteArray(
            (0..count)
                .map(|_| r.read_i8())
                .collect::<std::io::Result<_>>()
                .map_err(truncated)?,
        ),
        ScalarKind::Short => Value::ShortArray(
            (0..count)
                .map(|_| r.read_i16::<LittleEndian>())
                .collect::<std::io::Result<_>>()
                .map_err(truncated)?,
        ),
        ScalarKind::Int => Value::IntArray(
            (0..count)
                .map(|_| r.read_i32::<LittleEndian>())
                .collect::<std::io::Result<_>>()
                .map_err(truncated)?,
        ),
        ScalarKind::Long => Value::LongArray(
            (0..count)
                .map(|_| r.read_i64::<LittleEndian>())
                .collect::<std::io::Result<_>>()
                .map_err(truncated)?,
        ),
        ScalarKind::Float => Value::FloatArray(
            (0..count)
                .map(|_| r.read_f32::<LittleEndian>())
                .collect::<std::io::Result<_>>()
                .map_err(truncated)?,
        ),
        ScalarKind::Double => Value::DoubleArray(
            (0..count)
                .map(|_| r.read_f64::<LittleEndian>())
                .collect::<std::io::Result<_>>()
                .map_err(truncated)?,
        ),
        ScalarKind::String => {
            let mut elements = Vec::with_capacity(count);
            for _ in 0..count {
                if r.read_u8().map_err(truncated)? == NULL {
                    elements.push(None);
                    continue;
                }
                let len = r.read_u32::<LittleEndian>().map_err(truncated)? as usize;
                verify_data!(len, len <= r.len());
                let data = *r;
                let (bytes, rest) = data.split_at(len);
                elements.push(Some(String::from_utf8_lossy(bytes).into_owned()));
                *r = rest;
            }
            Value::StringArray(elements)
        }
        ScalarKind::Bytes => {
            return Err(Error::invalid_operation("decoding an array of byte strings"));
        }
    };
    Ok(value)
}

fn write_count(out: &mut Vec<u8>, count: usize) -> Result<()> {
    let count = u32::try_from(count)
        .map_err(|_| Error::invalid_arg("count", format!("{count} does not fit a cached item")))?;
    out.write_u32::<LittleEndian>(count)?;
    Ok(())
}

fn take_rest<'a>(r: &mut &'a [u8]) -> &'a [u8] {
    std::mem::take(r)
}

#[cold]
fn truncated(_: std::io::Error) -> Error {
    Error::invalid_format("cached item", "item is truncated")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(codec: &ItemCodec, value: Option<&Value>) -> Vec<u8> {
        let mut out = Vec::new();
        codec.encode(value, &mut out).unwrap();
        out
    }

    #[test]
    fn test_fixed_items_have_constant_size() {
        let codec = ItemCodec::new(ContentKind::Scalar(ScalarKind::Double));
        assert_eq!(codec.item_size(), Some(9));
        let present = encoded(&codec, Some(&Value::Double(-1.5)));
        let null = encoded(&codec, None);
        assert_eq!(present.len(), 9);
        assert_eq!(null, vec![0; 9]);
        assert_eq!(codec.decode(&present).unwrap(), Some(Value::Double(-1.5)));
        assert_eq!(codec.decode(&null).unwrap(), None);
    }

    #[test]
    fn test_variable_items() {
        let cases = [
            (ContentKind::Scalar(ScalarKind::String), Value::String("héllo".into())),
            (ContentKind::Scalar(ScalarKind::String), Value::String(String::new())),
            (ContentKind::Scalar(ScalarKind::Bytes), Value::Bytes(vec![0, 1, 255])),
            (ContentKind::Array(ScalarKind::Boolean), Value::BooleanArray(vec![true, false, true])),
            (ContentKind::Array(ScalarKind::Long), Value::LongArray(vec![i64::MIN, 0, 7])),
            (ContentKind::Array(ScalarKind::Int), Value::IntArray(vec![])),
            (
                ContentKind::Array(ScalarKind::String),
                Value::StringArray(vec![Some("a".into()), None, Some(String::new())]),
            ),
        ];
        for (kind, value) in cases {
            let codec = ItemCodec::new(kind);
            assert_eq!(codec.item_size(), None);
            let bytes = encoded(&codec, Some(&value));
            assert_eq!(codec.decode(&bytes).unwrap(), Some(value));
            assert_eq!(codec.decode(&encoded(&codec, None)).unwrap(), None);
        }
    }

    #[test]
    fn test_null_and_empty_arrays_differ() {
        let codec = ItemCodec::new(ContentKind::Array(ScalarKind::Float));
        let empty = encoded(&codec, Some(&Value::FloatArray(vec![])));
        let null = encoded(&codec, None);
        assert_ne!(empty, null);
        assert_eq!(codec.decode(&empty).unwrap(), Some(Value::FloatArray(vec![])));
    }

    #[test]
    fn test_kind_mismatch_and_damage() {
        let codec = ItemCodec::new(ContentKind::Scalar(ScalarKind::Int));
        let mut out = Vec::new();
        assert!(codec.encode(Some(&Value::Long(1)), &mut out).is_err());

        let codec = ItemCodec::new(ContentKind::Array(ScalarKind::Short));
        let bytes = encoded(&codec, Some(&Value::ShortArray(vec![1, 2, 3])));
        assert!(codec.decode(&bytes[..bytes.len() - 1]).is_err());
        assert!(codec.decode(&[]).is_err());
    }
}
