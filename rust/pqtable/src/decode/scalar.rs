use pqtable_common::Result;

use crate::{mapper::LeafRead, value::Value};

use super::{DecodeState, PhysicalValue, type_mismatch};

/// Decoder for scalar columns: each cell is made of exactly one level entry.
#[derive(Debug)]
pub struct ScalarDecoder {
    read: LeafRead,
    value: Option<Value>,
    state: DecodeState,
}

impl ScalarDecoder {
    pub fn new(read: LeafRead) -> ScalarDecoder {
        ScalarDecoder {
            read,
            value: None,
            state: DecodeState::Empty,
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    pub fn clear(&mut self) {
        self.value = None;
        self.state = DecodeState::Empty;
    }

    pub fn read_item(&mut self, value: PhysicalValue<'_>) -> Result<()> {
        self.value = Some(convert_scalar(self.read, value)?);
        self.state = DecodeState::Accumulating;
        Ok(())
    }

    pub fn read_null(&mut self) {
        debug_assert_eq!(self.state, DecodeState::Empty);
        self.value = None;
        self.state = DecodeState::Accumulating;
    }

    pub fn value(&mut self) -> Option<&Value> {
        self.state = DecodeState::Ready;
        self.value.as_ref()
    }
}

pub(crate) fn convert_scalar(read: LeafRead, value: PhysicalValue<'_>) -> Result<Value> {
    let result = match (read, value) {
        (LeafRead::Boolean, PhysicalValue::Boolean(v)) => Value::Boolean(v),
        (LeafRead::Byte, PhysicalValue::Int32(v)) => Value::Byte(v as i8),
        (LeafRead::Short, PhysicalValue::Int32(v)) => Value::Short(v as i16),
        (LeafRead::Int, PhysicalValue::Int32(v)) => Value::Int(v),
        (LeafRead::UnsignedInt, PhysicalValue::Int32(v)) => Value::Long(v as u32 as i64),
        (LeafRead::Long, PhysicalValue::Int64(v)) => Value::Long(v),
        (LeafRead::Float, PhysicalValue::Float(v)) => Value::Float(v),
        (LeafRead::Double, PhysicalValue::Double(v)) => Value::Double(v),
        (LeafRead::Utf8, PhysicalValue::Binary(v)) => {
            Value::String(String::from_utf8_lossy(v).into_owned())
        }
        (LeafRead::Binary, PhysicalValue::Binary(v)) => Value::Bytes(v.to_vec()),
        (read, value) => return Err(type_mismatch(read.kind().name(), &value)),
    };
    Ok(result)
}
