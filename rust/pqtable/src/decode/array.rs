use bit_vec::BitVec;
use pqtable_common::Result;

use crate::{mapper::LeafRead, value::Value};

use super::{DecodeState, PhysicalValue, type_mismatch};

/// Element accumulator, one variant per element kind.
#[derive(Debug)]
enum ElementBuffer {
    Boolean(BitVec),
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    /// Signed INT64 values, or INT32 values read as unsigned.
    Long { values: Vec<i64>, unsigned_int32: bool },
    Float(Vec<f32>),
    Double(Vec<f64>),
    String(Vec<Option<String>>),
}

impl ElementBuffer {
    fn new(read: LeafRead) -> ElementBuffer {
        match read {
            LeafRead::Boolean => ElementBuffer::Boolean(BitVec::new()),
            LeafRead::Byte => ElementBuffer::Byte(Vec::new()),
            LeafRead::Short => ElementBuffer::Short(Vec::new()),
            LeafRead::Int => ElementBuffer::Int(Vec::new()),
            LeafRead::UnsignedInt => ElementBuffer::Long {
                values: Vec::new(),
                unsigned_int32: true,
            },
            LeafRead::Long => ElementBuffer::Long {
                values: Vec::new(),
                unsigned_int32: false,
            },
            LeafRead::Float => ElementBuffer::Float(Vec::new()),
            LeafRead::Double => ElementBuffer::Double(Vec::new()),
            // The mapper never builds binary arrays.
            LeafRead::Utf8 | LeafRead::Binary => ElementBuffer::String(Vec::new()),
        }
    }

    fn clear(&mut self) {
        match self {
            ElementBuffer::Boolean(b) => b.truncate(0),
            ElementBuffer::Byte(b) => b.clear(),
            ElementBuffer::Short(b) => b.clear(),
            ElementBuffer::Int(b) => b.clear(),
            ElementBuffer::Long { values, .. } => values.clear(),
            ElementBuffer::Float(b) => b.clear(),
            ElementBuffer::Double(b) => b.clear(),
            ElementBuffer::String(b) => b.clear(),
        }
    }

    fn push(&mut self, value: PhysicalValue<'_>) -> Result<()> {
        match (self, value) {
            (ElementBuffer::Boolean(b), PhysicalValue::Boolean(v)) => b.push(v),
            (ElementBuffer::Byte(b), PhysicalValue::Int32(v)) => b.push(v as i8),
            (ElementBuffer::Short(b), PhysicalValue::Int32(v)) => b.push(v as i16),
            (ElementBuffer::Int(b), PhysicalValue::Int32(v)) => b.push(v),
            (
                ElementBuffer::Long {
                    values,
                    unsigned_int32: true,
                },
                PhysicalValue::Int32(v),
            ) => values.push(v as u32 as i64),
            (
                ElementBuffer::Long {
                    values,
                    unsigned_int32: false,
                },
                PhysicalValue::Int64(v),
            ) => values.push(v),
            (ElementBuffer::Float(b), PhysicalValue::Float(v)) => b.push(v),
            (ElementBuffer::Double(b), PhysicalValue::Double(v)) => b.push(v),
            (ElementBuffer::String(b), PhysicalValue::Binary(v)) => {
                b.push(Some(String::from_utf8_lossy(v).into_owned()))
            }
            (buffer, value) => return Err(type_mismatch(buffer.element_name(), &value)),
        }
        Ok(())
    }

    fn push_null(&mut self) {
        match self {
            ElementBuffer::Boolean(b) => b.push(false),
            ElementBuffer::Byte(b) => b.push(i8::MIN),
            ElementBuffer::Short(b) => b.push(i16::MIN),
            ElementBuffer::Int(b) => b.push(i32::MIN),
            ElementBuffer::Long { values, .. } => values.push(i64::MIN),
            ElementBuffer::Float(b) => b.push(f32::NAN),
            ElementBuffer::Double(b) => b.push(f64::NAN),
            ElementBuffer::String(b) => b.push(None),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ElementBuffer::Boolean(b) => Value::BooleanArray(b.iter().collect()),
            ElementBuffer::Byte(b) => Value::ByteArray(b.clone()),
            ElementBuffer::Short(b) => Value::ShortArray(b.clone()),
            ElementBuffer::Int(b) => Value::IntArray(b.clone()),
            ElementBuffer::Long { values, .. } => Value::LongArray(values.clone()),
            ElementBuffer::Float(b) => Value::FloatArray(b.clone()),
            ElementBuffer::Double(b) => Value::DoubleArray(b.clone()),
            ElementBuffer::String(b) => Value::StringArray(b.clone()),
        }
    }

    fn element_name(&self) -> &'static str {
        match self {
            ElementBuffer::Boolean(_) => "boolean element",
            ElementBuffer::Byte(_) => "byte element",
            ElementBuffer::Short(_) => "short element",
            ElementBuffer::Int(_) => "int element",
            ElementBuffer::Long { .. } => "long element",
            ElementBuffer::Float(_) => "float element",
            ElementBuffer::Double(_) => "double element",
            ElementBuffer::String(_) => "string element",
        }
    }
}

/// Decoder for array columns: one level entry per element, plus the entries
/// standing for empty or null arrays.
#[derive(Debug)]
pub struct ArrayDecoder {
    elements: ElementBuffer,
    absent: bool,
    state: DecodeState,
    snapshot: Option<Value>,
}

impl ArrayDecoder {
    pub fn new(read: LeafRead) -> ArrayDecoder {
        ArrayDecoder {
            elements: ElementBuffer::new(read),
            absent: false,
            state: DecodeState::Empty,
            snapshot: None,
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.absent = false;
        self.snapshot = None;
        self.state = DecodeState::Empty;
    }

    pub fn read_item(&mut self, value: PhysicalValue<'_>) -> Result<()> {
        self.elements.push(value)?;
        self.state = DecodeState::Accumulating;
        Ok(())
    }

    /// Appends a null element.
    pub fn read_null(&mut self) {
        self.elements.push_null();
        self.state = DecodeState::Accumulating;
    }

    /// Marks the array itself as null.
    pub fn read_absent(&mut self) {
        self.absent = true;
        self.state = DecodeState::Accumulating;
    }

    /// Returns `None` for a null array, and an (possibly empty) array otherwise.
    pub fn value(&mut self) -> Option<&Value> {
        if self.state != DecodeState::Ready {
            self.snapshot = (!self.absent).then(|| self.elements.to_value());
            self.state = DecodeState::Ready;
        }
        self.snapshot.as_ref()
    }
}
