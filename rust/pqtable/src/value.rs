//! Cell values of the generic table model.

use std::fmt;

use itertools::Itertools;

/// Element class of a column: the type of a scalar cell, or of each element of an
/// array cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    /// Raw byte string. Only valid for scalar columns.
    Bytes,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Boolean => "boolean",
            ScalarKind::Byte => "byte",
            ScalarKind::Short => "short",
            ScalarKind::Int => "int",
            ScalarKind::Long => "long",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }

    /// Size in bytes of one value, for kinds with a fixed-width representation.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ScalarKind::Boolean | ScalarKind::Byte => Some(1),
            ScalarKind::Short => Some(2),
            ScalarKind::Int | ScalarKind::Float => Some(4),
            ScalarKind::Long | ScalarKind::Double => Some(8),
            ScalarKind::String | ScalarKind::Bytes => None,
        }
    }
}

/// Content class of a column: a scalar of some kind, or a one-dimensional array of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Scalar(ScalarKind),
    Array(ScalarKind),
}

impl ContentKind {
    pub fn is_array(&self) -> bool {
        matches!(self, ContentKind::Array(_))
    }

    pub fn element_kind(&self) -> ScalarKind {
        match *self {
            ContentKind::Scalar(kind) | ContentKind::Array(kind) => kind,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Scalar(kind) => f.write_str(kind.name()),
            ContentKind::Array(kind) => write!(f, "{}[]", kind.name()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

impl TimeUnit {
    pub fn per_second(&self) -> i64 {
        match self {
            TimeUnit::Millis => 1_000,
            TimeUnit::Micros => 1_000_000,
            TimeUnit::Nanos => 1_000_000_000,
        }
    }
}

/// Interpretation of an integer column as a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeDomain {
    /// Days since 1970-01-01.
    UnixDate,
    /// Sub-second units since 1970-01-01T00:00:00.
    UnixTime(TimeUnit),
}

impl TimeDomain {
    /// Converts a cell of a time-annotated column to seconds since the Unix epoch.
    pub fn to_unix_seconds(&self, value: &Value) -> Option<f64> {
        let raw = value.as_i64()?;
        match self {
            TimeDomain::UnixDate => Some(raw as f64 * 86_400.0),
            TimeDomain::UnixTime(unit) => Some(raw as f64 / unit.per_second() as f64),
        }
    }
}

/// A non-null cell value.
///
/// Null elements decoded into primitive arrays are represented with placeholder
/// values (`MIN` for integers, `NaN` for floating point, `false` for booleans);
/// string arrays keep them as `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    BooleanArray(Vec<bool>),
    ByteArray(Vec<i8>),
    ShortArray(Vec<i16>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<Option<String>>),
}

/// A table cell: `None` is a null.
pub type Cell = Option<Value>;

impl Value {
    pub fn kind(&self) -> ContentKind {
        use ContentKind::{Array, Scalar};
        match self {
            Value::Boolean(_) => Scalar(ScalarKind::Boolean),
            Value::Byte(_) => Scalar(ScalarKind::Byte),
            Value::Short(_) => Scalar(ScalarKind::Short),
            Value::Int(_) => Scalar(ScalarKind::Int),
            Value::Long(_) => Scalar(ScalarKind::Long),
            Value::Float(_) => Scalar(ScalarKind::Float),
            Value::Double(_) => Scalar(ScalarKind::Double),
            Value::String(_) => Scalar(ScalarKind::String),
            Value::Bytes(_) => Scalar(ScalarKind::Bytes),
            Value::BooleanArray(_) => Array(ScalarKind::Boolean),
            Value::ByteArray(_) => Array(ScalarKind::Byte),
            Value::ShortArray(_) => Array(ScalarKind::Short),
            Value::IntArray(_) => Array(ScalarKind::Int),
            Value::LongArray(_) => Array(ScalarKind::Long),
            Value::FloatArray(_) => Array(ScalarKind::Float),
            Value::DoubleArray(_) => Array(ScalarKind::Double),
            Value::StringArray(_) => Array(ScalarKind::String),
        }
    }

    /// Number of elements of an array value, `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::BooleanArray(v) => Some(v.len()),
            Value::ByteArray(v) => Some(v.len()),
            Value::ShortArray(v) => Some(v.len()),
            Value::IntArray(v) => Some(v.len()),
            Value::LongArray(v) => Some(v.len()),
            Value::FloatArray(v) => Some(v.len()),
            Value::DoubleArray(v) => Some(v.len()),
            Value::StringArray(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Integer scalars widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Approximate in-memory payload size, used for throughput reporting.
    pub fn data_size(&self) -> usize {
        match self {
            Value::String(s) => s.len(),
            Value::Bytes(b) => b.len(),
            Value::StringArray(v) => v.iter().flatten().map(String::len).sum(),
            other => {
                let width = other.kind().element_kind().fixed_width().unwrap_or(0);
                width * other.array_len().unwrap_or(1)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Bytes(v) => write!(f, "0x{}", v.iter().map(|b| format!("{b:02x}")).join("")),
            Value::BooleanArray(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::ByteArray(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::ShortArray(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::IntArray(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::LongArray(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::FloatArray(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::DoubleArray(v) => write!(f, "[{}]", v.iter().join(", ")),
            Value::StringArray(v) => write!(
                f,
                "[{}]",
                v.iter().map(|s| s.as_deref().unwrap_or("null")).join(", ")
            ),
        }
    }
}
