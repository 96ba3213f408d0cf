//! Per-column conversion of cells into parquet schema fragments and record events.

use std::{borrow::Cow, sync::Arc};

use parquet::{
    basic::{LogicalType, Repetition, TimeUnit as ParquetTimeUnit, Type as PhysicalType},
    format::{MicroSeconds, MilliSeconds, NanoSeconds},
    schema::types::{Type, TypePtr},
};
use pqtable_common::{Error, Result};

use crate::{
    options::ArrayEncoding,
    table::ColumnInfo,
    value::{Cell, ContentKind, ScalarKind, TimeDomain, TimeUnit, Value},
};

use super::consumer::RecordConsumer;

/// Name of the repeated group of a grouped array.
pub const LIST_FIELD: &str = "list";
/// Name of the element field of a grouped array.
pub const ELEMENT_FIELD: &str = "element";

/// Writes the cells of one table column.
#[derive(Clone, Debug)]
pub struct ColumnEncoder {
    info: ColumnInfo,
    encoding: ArrayEncoding,
}

impl ColumnEncoder {
    /// Fails for columns that have no parquet representation.
    pub fn new(info: ColumnInfo, encoding: ArrayEncoding) -> Result<ColumnEncoder> {
        if info.kind == ContentKind::Array(ScalarKind::Bytes) {
            return Err(Error::invalid_arg(
                "column",
                format!("'{}': arrays of byte strings cannot be written", info.name),
            ));
        }
        Ok(ColumnEncoder { info, encoding })
    }

    pub fn info(&self) -> &ColumnInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// The schema field of this column.
    pub fn schema_type(&self) -> Result<TypePtr> {
        let info = &self.info;
        let repetition = if info.nullable {
            Repetition::OPTIONAL
        } else {
            Repetition::REQUIRED
        };
        let field = match (info.kind, self.encoding) {
            (ContentKind::Scalar(kind), _) => {
                primitive(&info.name, kind, info.time_domain, repetition)?
            }
            (ContentKind::Array(kind), ArrayEncoding::Flat) => {
                primitive(&info.name, kind, None, Repetition::REPEATED)?
            }
            (ContentKind::Array(kind), ArrayEncoding::Grouped) => {
                let element = primitive(ELEMENT_FIELD, kind, None, Repetition::OPTIONAL)?;
                let list = Type::group_type_builder(LIST_FIELD)
                    .with_repetition(Repetition::REPEATED)
                    .with_fields(vec![Arc::new(element)])
                    .build()?;
                Type::group_type_builder(&info.name)
                    .with_repetition(repetition)
                    .with_logical_type(Some(LogicalType::List))
                    .with_fields(vec![Arc::new(list)])
                    .build()?
            }
        };
        Ok(Arc::new(field))
    }

    /// Returns the cell as a value of the column's kind, widening integers and
    /// floats when no precision is lost. `None` means the cell is stored as null.
    pub fn typed_value<'a>(&self, cell: &'a Cell) -> Option<Cow<'a, Value>> {
        let value = cell.as_ref()?;
        if value.kind() == self.info.kind {
            return Some(Cow::Borrowed(value));
        }
        let widened = match (self.info.kind, value) {
            (ContentKind::Scalar(ScalarKind::Short), Value::Byte(v)) => Value::Short(*v as i16),
            (ContentKind::Scalar(ScalarKind::Int), Value::Byte(_) | Value::Short(_)) => {
                Value::Int(value.as_i64()? as i32)
            }
            (ContentKind::Scalar(ScalarKind::Long), _) => Value::Long(value.as_i64()?),
            (ContentKind::Scalar(ScalarKind::Double), Value::Float(v)) => Value::Double(*v as f64),
            _ => return None,
        };
        Some(Cow::Owned(widened))
    }

    /// Checks that a null may be stored in this column.
    pub fn check_null(&self) -> Result<()> {
        if self.info.kind.is_array() && self.encoding == ArrayEncoding::Flat {
            Err(Error::flat_array_null(&self.info.name))
        } else if !self.info.nullable {
            Err(Error::invalid_arg(
                "cell",
                format!("null in required column '{}'", self.info.name),
            ))
        } else {
            Ok(())
        }
    }

    /// Emits the content of this column's field. The caller frames it with
    /// `start_field`/`end_field`.
    pub fn write(&self, value: &Value, consumer: &mut dyn RecordConsumer) -> Result<()> {
        let Some(len) = value.array_len() else {
            return add_scalar(consumer, value);
        };
        match self.encoding {
            ArrayEncoding::Flat => {
                if let Value::StringArray(v) = value {
                    if v.iter().any(Option::is_none) {
                        return Err(Error::flat_array_null(&self.info.name));
                    }
                }
                for i in 0..len {
                    add_element(consumer, value, i)?;
                }
                Ok(())
            }
            ArrayEncoding::Grouped => {
                consumer.start_group()?;
                if len > 0 {
                    consumer.start_field(LIST_FIELD, 0)?;
                    for i in 0..len {
                        consumer.start_group()?;
                        if !is_null_element(value, i) {
                            consumer.start_field(ELEMENT_FIELD, 0)?;
                            add_element(consumer, value, i)?;
                            consumer.end_field(ELEMENT_FIELD, 0)?;
                        }
                        consumer.end_group()?;
                    }
                    consumer.end_field(LIST_FIELD, 0)?;
                }
                consumer.end_group()
            }
        }
    }
}

fn primitive(
    name: &str,
    kind: ScalarKind,
    time_domain: Option<TimeDomain>,
    repetition: Repetition,
) -> Result<Type> {
    let (physical, logical) = match kind {
        ScalarKind::Boolean => (PhysicalType::BOOLEAN, None),
        ScalarKind::Byte => (
            PhysicalType::INT32,
            Some(LogicalType::Integer {
                bit_width: 8,
                is_signed: true,
            }),
        ),
        ScalarKind::Short => (
            PhysicalType::INT32,
            Some(LogicalType::Integer {
                bit_width: 16,
                is_signed: true,
            }),
        ),
        ScalarKind::Int => (PhysicalType::INT32, date_annotation(time_domain)),
        ScalarKind::Long => (PhysicalType::INT64, timestamp_annotation(time_domain)),
        ScalarKind::Float => (PhysicalType::FLOAT, None),
        ScalarKind::Double => (PhysicalType::DOUBLE, None),
        ScalarKind::String => (PhysicalType::BYTE_ARRAY, Some(LogicalType::String)),
        ScalarKind::Bytes => (PhysicalType::BYTE_ARRAY, None),
    };
    Ok(Type::primitive_type_builder(name, physical)
        .with_repetition(repetition)
        .with_logical_type(logical)
        .build()?)
}

fn date_annotation(time_domain: Option<TimeDomain>) -> Option<LogicalType> {
    match time_domain? {
        TimeDomain::UnixDate => Some(LogicalType::Date),
        TimeDomain::UnixTime(_) => None,
    }
}

fn timestamp_annotation(time_domain: Option<TimeDomain>) -> Option<LogicalType> {
    let TimeDomain::UnixTime(unit) = time_domain? else {
        return None;
    };
    let unit = match unit {
        TimeUnit::Millis => ParquetTimeUnit::MILLIS(MilliSeconds {}),
        TimeUnit::Micros => ParquetTimeUnit::MICROS(MicroSeconds {}),
        TimeUnit::Nanos => ParquetTimeUnit::NANOS(NanoSeconds {}),
    };
    Some(LogicalType::Timestamp {
        is_adjusted_to_u_t_c: true,
        unit,
    })
}

fn add_scalar(consumer: &mut dyn RecordConsumer, value: &Value) -> Result<()> {
    match value {
        Value::Boolean(v) => consumer.add_boolean(*v),
        Value::Byte(v) => consumer.add_integer(*v as i32),
        Value::Short(v) => consumer.add_integer(*v as i32),
        Value::Int(v) => consumer.add_integer(*v),
        Value::Long(v) => consumer.add_long(*v),
        Value::Float(v) => consumer.add_float(*v),
        Value::Double(v) => consumer.add_double(*v),
        Value::String(v) => consumer.add_binary(v.as_bytes()),
        Value::Bytes(v) => consumer.add_binary(v),
        other => Err(Error::invalid_arg("value", format!("{} is not a scalar", other.kind()))),
    }
}

fn add_element(consumer: &mut dyn RecordConsumer, array: &Value, i: usize) -> Result<()> {
    match array {
        Value::BooleanArray(v) => consumer.add_boolean(v[i]),
        Value::ByteArray(v) => consumer.add_integer(v[i] as i32),
        Value::ShortArray(v) => consumer.add_integer(v[i] as i32),
        Value::IntArray(v) => consumer.add_integer(v[i]),
        Value::LongArray(v) => consumer.add_long(v[i]),
        Value::FloatArray(v) => consumer.add_float(v[i]),
        Value::DoubleArray(v) => consumer.add_double(v[i]),
        Value::StringArray(v) => match &v[i] {
            Some(s) => consumer.add_binary(s.as_bytes()),
            None => Err(Error::invalid_operation("adding a null element")),
        },
        other => Err(Error::invalid_arg("value", format!("{} is not an array", other.kind()))),
    }
}

fn is_null_element(array: &Value, i: usize) -> bool {
    matches!(array, Value::StringArray(v) if v[i].is_none())
}
