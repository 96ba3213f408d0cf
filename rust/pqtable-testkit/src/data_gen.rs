//! Seeded generation of synthetic tables.

use pqtable::{ColumnInfo, ContentKind, MemoryTable, ScalarKind, TimeDomain, TimeUnit, Value};

/// Scalar kinds with an array counterpart.
pub const ELEMENT_KINDS: [ScalarKind; 8] = [
    ScalarKind::Boolean,
    ScalarKind::Byte,
    ScalarKind::Short,
    ScalarKind::Int,
    ScalarKind::Long,
    ScalarKind::Float,
    ScalarKind::Double,
    ScalarKind::String,
];

/// Knobs for [`generate_table`].
#[derive(Clone, Debug)]
pub struct TableGen {
    pub seed: u64,
    pub rows: usize,
    /// Probability of a null cell in nullable columns.
    pub null_probability: f64,
    /// Probability of a null element in string arrays.
    pub null_element_probability: f64,
    /// Arrays hold `0..max_array_len` elements.
    pub max_array_len: usize,
}

impl TableGen {
    pub fn new(seed: u64, rows: usize) -> TableGen {
        TableGen {
            seed,
            rows,
            null_probability: 0.2,
            null_element_probability: 0.2,
            max_array_len: 5,
        }
    }

    /// Disables null cells and null elements, as required by flat arrays.
    pub fn without_nulls(self) -> TableGen {
        TableGen {
            null_probability: 0.0,
            null_element_probability: 0.0,
            ..self
        }
    }
}

/// One column per scalar kind, one array column per element kind, and two
/// time-annotated columns.
pub fn all_kinds_columns() -> Vec<ColumnInfo> {
    let mut columns = Vec::new();
    for kind in ELEMENT_KINDS.iter().chain([&ScalarKind::Bytes]) {
        columns.push(ColumnInfo::new(
            format!("s_{}", kind.name()),
            ContentKind::Scalar(*kind),
        ));
    }
    for kind in ELEMENT_KINDS {
        columns.push(ColumnInfo::new(
            format!("a_{}", kind.name()),
            ContentKind::Array(kind),
        ));
    }
    columns.push(
        ColumnInfo::new("day", ContentKind::Scalar(ScalarKind::Int))
            .with_time_domain(Some(TimeDomain::UnixDate)),
    );
    columns.push(
        ColumnInfo::new("ts", ContentKind::Scalar(ScalarKind::Long))
            .with_time_domain(Some(TimeDomain::UnixTime(TimeUnit::Millis))),
    );
    columns.push(ColumnInfo::new("id", ContentKind::Scalar(ScalarKind::Long)).with_nullable(false));
    columns
}

/// `count` columns cycling through scalar and array kinds.
pub fn wide_columns(count: usize) -> Vec<ColumnInfo> {
    (0..count)
        .map(|i| {
            let kind = ELEMENT_KINDS[i % ELEMENT_KINDS.len()];
            let content = if (i / ELEMENT_KINDS.len()) % 2 == 0 {
                ContentKind::Scalar(kind)
            } else {
                ContentKind::Array(kind)
            };
            ColumnInfo::new(format!("c{i:02}"), content)
        })
        .collect()
}

/// Fills a table over `columns` with random cells.
pub fn generate_table(columns: Vec<ColumnInfo>, params: &TableGen) -> MemoryTable {
    let mut rng = fastrand::Rng::with_seed(params.seed);
    let mut table = MemoryTable::new(columns.clone());
    for row in 0..params.rows {
        let cells = columns
            .iter()
            .map(|info| {
                if info.nullable && rng.f64() < params.null_probability {
                    None
                } else if info.name == "id" {
                    Some(Value::Long(row as i64))
                } else {
                    Some(random_value(&mut rng, info.kind, params))
                }
            })
            .collect();
        table.push_row(cells).expect("row width");
    }
    table
}

pub fn random_value(rng: &mut fastrand::Rng, kind: ContentKind, params: &TableGen) -> Value {
    match kind {
        ContentKind::Scalar(kind) => random_scalar(rng, kind),
        ContentKind::Array(kind) => {
            let len = rng.usize(0..params.max_array_len.max(1));
            random_array(rng, kind, len, params.null_element_probability)
        }
    }
}

pub fn random_scalar(rng: &mut fastrand::Rng, kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::Boolean => Value::Boolean(rng.bool()),
        ScalarKind::Byte => Value::Byte(rng.i8(i8::MIN + 1..)),
        ScalarKind::Short => Value::Short(rng.i16(i16::MIN + 1..)),
        ScalarKind::Int => Value::Int(rng.i32(i32::MIN + 1..)),
        ScalarKind::Long => Value::Long(rng.i64(i64::MIN + 1..)),
        ScalarKind::Float => Value::Float(rng.f32() * 1000.0 - 500.0),
        ScalarKind::Double => Value::Double(rng.f64() * 1e6 - 5e5),
        ScalarKind::String => Value::String(random_string(rng)),
        ScalarKind::Bytes => {
            let len = rng.usize(0..16);
            Value::Bytes(std::iter::repeat_with(|| rng.u8(..)).take(len).collect())
        }
    }
}

/// Random array of `len` elements. Primitive arrays never hold the placeholder
/// values that stand for null elements.
pub fn random_array(
    rng: &mut fastrand::Rng,
    kind: ScalarKind,
    len: usize,
    null_element_probability: f64,
) -> Value {
    macro_rules! elements {
        ($gen:expr) => {
            std::iter::repeat_with(|| $gen).take(len).collect()
        };
    }
    match kind {
        ScalarKind::Boolean => Value::BooleanArray(elements!(rng.bool())),
        ScalarKind::Byte => Value::ByteArray(elements!(rng.i8(i8::MIN + 1..))),
        ScalarKind::Short => Value::ShortArray(elements!(rng.i16(i16::MIN + 1..))),
        ScalarKind::Int => Value::IntArray(elements!(rng.i32(i32::MIN + 1..))),
        ScalarKind::Long => Value::LongArray(elements!(rng.i64(i64::MIN + 1..))),
        ScalarKind::Float => Value::FloatArray(elements!(rng.f32() * 100.0)),
        ScalarKind::Double => Value::DoubleArray(elements!(rng.f64() * 100.0)),
        ScalarKind::String | ScalarKind::Bytes => Value::StringArray(elements!(
            (rng.f64() >= null_element_probability).then(|| random_string(rng))
        )),
    }
}

fn random_string(rng: &mut fastrand::Rng) -> String {
    let len = rng.usize(0..12);
    std::iter::repeat_with(|| rng.alphanumeric())
        .take(len)
        .collect()
}

#[cfg(test)]
mod tests {
    use pqtable::Table;

    use super::*;

    #[test]
    fn test_generation_is_seeded() {
        let params = TableGen::new(7, 50);
        let a = generate_table(all_kinds_columns(), &params);
        let b = generate_table(all_kinds_columns(), &params);
        assert_eq!(a.row_data(), b.row_data());
        assert_eq!(a.row_count(), Some(50));

        let c = generate_table(all_kinds_columns(), &TableGen::new(8, 50));
        assert_ne!(a.row_data(), c.row_data());
    }

    #[test]
    fn test_without_nulls() {
        let params = TableGen::new(1, 100).without_nulls();
        let table = generate_table(wide_columns(20), &params);
        for row in table.row_data() {
            for cell in row {
                let value = cell.as_ref().expect("no null cells");
                if let Value::StringArray(elements) = value {
                    assert!(elements.iter().all(Option::is_some));
                }
            }
        }
    }

    #[test]
    fn test_wide_columns() {
        let columns = wide_columns(50);
        assert_eq!(columns.len(), 50);
        assert_eq!(columns[0].kind, ContentKind::Scalar(ScalarKind::Boolean));
        assert_eq!(columns[8].kind, ContentKind::Array(ScalarKind::Boolean));
        assert_eq!(columns[49].name, "c49");
    }
}
