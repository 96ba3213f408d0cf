//! Decoding of per-cell definition/repetition level sequences into cell values.
//!
//! A [`LevelReader`] exposes the level entries of one leaf column; [`decode_cell`]
//! walks the entries belonging to the next record and feeds them to a [`Decoder`],
//! which accumulates them into a [`Value`].
//!
//! For every entry of a record:
//! - `def == max_def`: a value is present, `read_item`;
//! - `def == null_level`: the leaf is null, `read_null`;
//! - `def < present_level` on the first entry: the whole array is null, `read_absent`;
//! - anything else: an empty array or an absent intermediate group, no decoder call.

mod array;
mod cursor;
mod scalar;

use pqtable_common::{Error, Result};

use crate::{mapper::LeafRead, mapper::LevelLayout, value::Value};

pub use array::ArrayDecoder;
pub use cursor::ColumnCursor;
pub use scalar::ScalarDecoder;

/// One physical value as stored in a parquet column chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhysicalValue<'a> {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Binary(&'a [u8]),
}

impl PhysicalValue<'_> {
    pub fn type_name(&self) -> &'static str {
        match self {
            PhysicalValue::Boolean(_) => "BOOLEAN",
            PhysicalValue::Int32(_) => "INT32",
            PhysicalValue::Int64(_) => "INT64",
            PhysicalValue::Float(_) => "FLOAT",
            PhysicalValue::Double(_) => "DOUBLE",
            PhysicalValue::Binary(_) => "BYTE_ARRAY",
        }
    }
}

/// Positioned access to the level entries of a single leaf column.
pub trait LevelReader {
    /// Makes sure a current entry is available, fetching more data if needed.
    /// Returns `false` once the column chunk is exhausted.
    fn has_current(&mut self) -> Result<bool>;

    fn def_level(&self) -> i16;

    fn rep_level(&self) -> i16;

    /// The value of the current entry. Only valid when its definition level is
    /// the maximum one.
    fn value(&self) -> Result<PhysicalValue<'_>>;

    /// Moves past the current entry.
    fn consume(&mut self);

    /// Skips `count` whole records without decoding them. Returns the number
    /// of records actually skipped.
    fn skip_records(&mut self, count: usize) -> Result<usize>;
}

/// Accumulation state shared by all decoders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeState {
    /// Cleared, nothing read yet.
    Empty,
    /// At least one entry read since the last clear.
    Accumulating,
    /// Value materialized and memoized until the next clear.
    Ready,
}

/// Per-column decoder, owned by exactly one reading context.
#[derive(Debug)]
pub enum Decoder {
    Scalar(ScalarDecoder),
    Array(ArrayDecoder),
}

impl Decoder {
    pub fn scalar(read: LeafRead) -> Decoder {
        Decoder::Scalar(ScalarDecoder::new(read))
    }

    pub fn array(read: LeafRead) -> Decoder {
        Decoder::Array(ArrayDecoder::new(read))
    }

    pub fn state(&self) -> DecodeState {
        match self {
            Decoder::Scalar(d) => d.state(),
            Decoder::Array(d) => d.state(),
        }
    }

    /// Starts a new accumulation cycle.
    pub fn clear(&mut self) {
        match self {
            Decoder::Scalar(d) => d.clear(),
            Decoder::Array(d) => d.clear(),
        }
    }

    pub fn read_item(&mut self, value: PhysicalValue<'_>) -> Result<()> {
        match self {
            Decoder::Scalar(d) => d.read_item(value),
            Decoder::Array(d) => d.read_item(value),
        }
    }

    pub fn read_null(&mut self) {
        match self {
            Decoder::Scalar(d) => d.read_null(),
            Decoder::Array(d) => d.read_null(),
        }
    }

    /// Records that the cell itself is absent (a null array).
    pub fn read_absent(&mut self) {
        match self {
            Decoder::Scalar(d) => d.read_null(),
            Decoder::Array(d) => d.read_absent(),
        }
    }

    /// Returns the accumulated value, `None` for a null cell. Repeated calls
    /// without an intervening [`clear`](Self::clear) return the same value.
    pub fn value(&mut self) -> Option<&Value> {
        match self {
            Decoder::Scalar(d) => d.value(),
            Decoder::Array(d) => d.value(),
        }
    }
}

/// Decodes the next record of `reader` into `decoder`.
pub fn decode_cell<R: LevelReader + ?Sized>(
    reader: &mut R,
    decoder: &mut Decoder,
    layout: &LevelLayout,
) -> Result<()> {
    decoder.clear();
    let mut first = true;
    loop {
        if !reader.has_current()? {
            if first {
                return Err(Error::invalid_format(
                    "column levels",
                    "level stream ended before the requested row",
                ));
            }
            break;
        }
        if !first && reader.rep_level() == 0 {
            break;
        }
        let def = reader.def_level();
        if def == layout.max_def {
            decoder.read_item(reader.value()?)?;
        } else if Some(def) == layout.null_level {
            decoder.read_null();
        } else if first && def < layout.present_level {
            decoder.read_absent();
        }
        reader.consume();
        first = false;
        if layout.max_rep == 0 {
            break;
        }
    }
    Ok(())
}

#[cold]
pub(crate) fn type_mismatch(expected: &str, value: &PhysicalValue<'_>) -> Error {
    Error::invalid_format(
        "column value",
        format!("expected {expected}, found {}", value.type_name()),
    )
}
