//! Command implementations for pqtable-cmd

use clap::ValueEnum;
use pqtable::{CacheMode, Cell, Value};

pub mod consume;
pub mod copy;
pub mod head;
pub mod inspect;

/// Read engine selection on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineArg {
    Auto,
    Cached,
    Sequential,
}

impl From<EngineArg> for CacheMode {
    fn from(engine: EngineArg) -> CacheMode {
        match engine {
            EngineArg::Auto => CacheMode::Auto,
            EngineArg::Cached => CacheMode::Cached,
            EngineArg::Sequential => CacheMode::Sequential,
        }
    }
}

/// Converts a cell to JSON. Byte strings become hex strings and non-finite
/// floats become `null`.
pub fn cell_to_json(cell: &Cell) -> serde_json::Value {
    use serde_json::Value as Json;

    let Some(value) = cell else {
        return Json::Null;
    };
    match value {
        Value::Boolean(v) => Json::from(*v),
        Value::Byte(v) => Json::from(*v),
        Value::Short(v) => Json::from(*v),
        Value::Int(v) => Json::from(*v),
        Value::Long(v) => Json::from(*v),
        Value::Float(v) => float_to_json(*v as f64),
        Value::Double(v) => float_to_json(*v),
        Value::String(v) => Json::from(v.as_str()),
        Value::Bytes(_) => Json::from(value.to_string()),
        Value::BooleanArray(v) => Json::from(v.clone()),
        Value::ByteArray(v) => Json::from(v.clone()),
        Value::ShortArray(v) => Json::from(v.clone()),
        Value::IntArray(v) => Json::from(v.clone()),
        Value::LongArray(v) => Json::from(v.clone()),
        Value::FloatArray(v) => v.iter().map(|&x| float_to_json(x as f64)).collect(),
        Value::DoubleArray(v) => v.iter().map(|&x| float_to_json(x)).collect(),
        Value::StringArray(v) => v
            .iter()
            .map(|s| s.as_deref().map_or(Json::Null, Json::from))
            .collect(),
    }
}

fn float_to_json(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v).map_or(serde_json::Value::Null, serde_json::Value::Number)
}
