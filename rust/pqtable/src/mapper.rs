//! Maps parquet leaf columns to table columns.
//!
//! Every leaf column of the file schema is inspected once when a table is opened.
//! Supported leaves become a [`ColumnPlan`], which carries the resulting
//! [`ColumnInfo`], the level layout needed to walk the leaf's definition and
//! repetition levels, and the conversion applied to each physical value.
//! Anything else is reported as a [`DroppedColumn`] and left out of the table.
//!
//! Recognized shapes, by path length:
//! - 1: `optional|required <prim> name` (scalar) or `repeated <prim> name`
//!   (flat array);
//! - 2: `optional|required group name { repeated <prim> x }` (two-level list);
//! - 3: `optional|required group name { repeated group list {
//!   optional|required <prim> element } }`.

use parquet::{
    basic::{
        ConvertedType, LogicalType, Repetition, TimeUnit as ParquetTimeUnit, Type as PhysicalType,
    },
    schema::types::{SchemaDescriptor, Type},
};

use crate::{
    decode::Decoder,
    table::ColumnInfo,
    value::{ContentKind, ScalarKind, TimeDomain, TimeUnit},
};

/// How physical values of a leaf are turned into cell values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafRead {
    Boolean,
    /// INT32 narrowed to `i8`.
    Byte,
    /// INT32 narrowed to `i16`.
    Short,
    Int,
    /// INT32 reinterpreted as unsigned and widened to `i64`.
    UnsignedInt,
    Long,
    Float,
    Double,
    Utf8,
    Binary,
}

impl LeafRead {
    pub fn kind(&self) -> ScalarKind {
        match self {
            LeafRead::Boolean => ScalarKind::Boolean,
            LeafRead::Byte => ScalarKind::Byte,
            LeafRead::Short => ScalarKind::Short,
            LeafRead::Int => ScalarKind::Int,
            LeafRead::UnsignedInt | LeafRead::Long => ScalarKind::Long,
            LeafRead::Float => ScalarKind::Float,
            LeafRead::Double => ScalarKind::Double,
            LeafRead::Utf8 => ScalarKind::String,
            LeafRead::Binary => ScalarKind::Bytes,
        }
    }
}

/// Definition and repetition level structure of one leaf column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelLayout {
    pub max_def: i16,
    pub max_rep: i16,
    /// Level marking a null leaf value. Only set when the leaf itself is optional,
    /// in which case it is `max_def - 1`.
    pub null_level: Option<i16>,
    /// Lowest definition level at which an array cell is present. Lower levels on
    /// the first entry of a record mean a null array. Always 0 for scalars.
    pub present_level: i16,
}

/// Everything needed to read one table column from its parquet leaf.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnPlan {
    pub info: ColumnInfo,
    /// Index of the leaf among the file's leaf columns.
    pub leaf_index: usize,
    pub layout: LevelLayout,
    pub read: LeafRead,
}

impl ColumnPlan {
    /// Creates a fresh decoder for one traversal of this column.
    pub fn create_decoder(&self) -> Decoder {
        if self.info.kind.is_array() {
            Decoder::array(self.read)
        } else {
            Decoder::scalar(self.read)
        }
    }
}

/// A leaf column that could not be mapped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedColumn {
    pub path: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct SchemaMapping {
    pub plans: Vec<ColumnPlan>,
    pub dropped: Vec<DroppedColumn>,
}

/// Maps every leaf of `schema`, logging a warning for each unsupported one.
pub fn map_schema(schema: &SchemaDescriptor) -> SchemaMapping {
    let mut mapping = SchemaMapping::default();
    for leaf in 0..schema.num_columns() {
        match map_column(schema, leaf) {
            Ok(plan) => mapping.plans.push(plan),
            Err(reason) => {
                let path = schema.column(leaf).path().string();
                log::warn!("ignoring unsupported parquet column '{path}': {reason}");
                mapping.dropped.push(DroppedColumn { path, reason });
            }
        }
    }
    mapping
}

/// Maps a single leaf column. `Err` carries the reason the column is unsupported.
pub fn map_column(schema: &SchemaDescriptor, leaf: usize) -> Result<ColumnPlan, String> {
    let descr = schema.column(leaf);
    let path = path_types(schema.root_schema(), descr.path().parts())
        .ok_or_else(|| "column path does not resolve in the schema".to_string())?;
    let top = path[0];
    let max_def = descr.max_def_level();
    let max_rep = descr.max_rep_level();

    let (is_array, name, nullable, present_level, null_level) = match path.as_slice() {
        [prim] if repetition(prim) != Repetition::REPEATED => {
            let optional = repetition(prim) == Repetition::OPTIONAL;
            (false, prim.name(), optional, 0, optional.then_some(max_def - 1))
        }
        [prim] => (true, prim.name(), false, 0, None),
        [group, prim]
            if is_list_root(group)
                && prim.is_primitive()
                && repetition(prim) == Repetition::REPEATED =>
        {
            let optional = repetition(group) == Repetition::OPTIONAL;
            (true, group.name(), optional, optional as i16, None)
        }
        [group, list, prim]
            if is_list_root(group)
                && list.is_group()
                && repetition(list) == Repetition::REPEATED
                && prim.is_primitive()
                && repetition(prim) != Repetition::REPEATED =>
        {
            let optional = repetition(group) == Repetition::OPTIONAL;
            let null_level = (repetition(prim) == Repetition::OPTIONAL).then_some(max_def - 1);
            (true, group.name(), optional, optional as i16, null_level)
        }
        _ => return Err(format!("unsupported nesting under '{}'", top.name())),
    };

    let leaf_type = descr.self_type();
    let read = leaf_read(leaf_type)?;
    if is_array && read == LeafRead::Binary {
        return Err("arrays of non-string binary values".to_string());
    }
    let kind = if is_array {
        ContentKind::Array(read.kind())
    } else {
        ContentKind::Scalar(read.kind())
    };
    let time_domain = if is_array { None } else { time_domain(leaf_type) };
    Ok(ColumnPlan {
        info: ColumnInfo::new(name, kind)
            .with_nullable(nullable)
            .with_time_domain(time_domain),
        leaf_index: leaf,
        layout: LevelLayout {
            max_def,
            max_rep,
            null_level,
            present_level,
        },
        read,
    })
}

/// Resolves the content class of an annotated integer.
///
/// An unsigned N-bit value goes to the smallest signed type holding N + 1 bits;
/// unsigned 32-bit values and any other unsigned width go to `long`. Signed
/// widths other than 8, 16 and 32 are not representable in INT32.
pub fn resolve_integer(bit_width: i8, is_signed: bool) -> Option<ScalarKind> {
    match (bit_width, is_signed) {
        (8, true) => Some(ScalarKind::Byte),
        (16, true) | (8, false) => Some(ScalarKind::Short),
        (32, true) | (16, false) => Some(ScalarKind::Int),
        (_, false) => Some(ScalarKind::Long),
        _ => None,
    }
}

fn leaf_read(leaf: &Type) -> Result<LeafRead, String> {
    match leaf.get_physical_type() {
        PhysicalType::BOOLEAN => Ok(LeafRead::Boolean),
        PhysicalType::INT32 => {
            let (bit_width, is_signed) = integer_annotation(leaf).unwrap_or((32, true));
            match resolve_integer(bit_width, is_signed) {
                Some(ScalarKind::Byte) => Ok(LeafRead::Byte),
                Some(ScalarKind::Short) => Ok(LeafRead::Short),
                Some(ScalarKind::Int) => Ok(LeafRead::Int),
                Some(_) => Ok(LeafRead::UnsignedInt),
                None => Err(format!("INT32 annotated as signed {bit_width}-bit integer")),
            }
        }
        PhysicalType::INT64 => Ok(LeafRead::Long),
        PhysicalType::FLOAT => Ok(LeafRead::Float),
        PhysicalType::DOUBLE => Ok(LeafRead::Double),
        PhysicalType::BYTE_ARRAY if is_string_like(leaf) => Ok(LeafRead::Utf8),
        PhysicalType::BYTE_ARRAY => Ok(LeafRead::Binary),
        other => Err(format!("physical type {other} is not supported")),
    }
}

fn integer_annotation(leaf: &Type) -> Option<(i8, bool)> {
    let info = leaf.get_basic_info();
    if let Some(LogicalType::Integer {
        bit_width,
        is_signed,
    }) = info.logical_type()
    {
        return Some((bit_width, is_signed));
    }
    match info.converted_type() {
        ConvertedType::INT_8 => Some((8, true)),
        ConvertedType::INT_16 => Some((16, true)),
        ConvertedType::INT_32 => Some((32, true)),
        ConvertedType::INT_64 => Some((64, true)),
        ConvertedType::UINT_8 => Some((8, false)),
        ConvertedType::UINT_16 => Some((16, false)),
        ConvertedType::UINT_32 => Some((32, false)),
        ConvertedType::UINT_64 => Some((64, false)),
        _ => None,
    }
}

fn is_string_like(leaf: &Type) -> bool {
    let info = leaf.get_basic_info();
    match info.logical_type() {
        Some(LogicalType::String | LogicalType::Json | LogicalType::Enum) => true,
        Some(_) => false,
        None => matches!(
            info.converted_type(),
            ConvertedType::UTF8 | ConvertedType::JSON | ConvertedType::ENUM
        ),
    }
}

fn time_domain(leaf: &Type) -> Option<TimeDomain> {
    let info = leaf.get_basic_info();
    match (leaf.get_physical_type(), info.logical_type()) {
        (PhysicalType::INT32, Some(LogicalType::Date)) => Some(TimeDomain::UnixDate),
        (PhysicalType::INT64, Some(LogicalType::Timestamp { unit, .. })) => {
            let unit = match unit {
                ParquetTimeUnit::MILLIS(_) => TimeUnit::Millis,
                ParquetTimeUnit::MICROS(_) => TimeUnit::Micros,
                ParquetTimeUnit::NANOS(_) => TimeUnit::Nanos,
            };
            Some(TimeDomain::UnixTime(unit))
        }
        (PhysicalType::INT32, None) if info.converted_type() == ConvertedType::DATE => {
            Some(TimeDomain::UnixDate)
        }
        (PhysicalType::INT64, None) => match info.converted_type() {
            ConvertedType::TIMESTAMP_MILLIS => Some(TimeDomain::UnixTime(TimeUnit::Millis)),
            ConvertedType::TIMESTAMP_MICROS => Some(TimeDomain::UnixTime(TimeUnit::Micros)),
            _ => None,
        },
        _ => None,
    }
}

/// Walks `parts` from the root group, returning the type of every path element.
fn path_types<'a>(root: &'a Type, parts: &[String]) -> Option<Vec<&'a Type>> {
    let mut current = root;
    let mut types = Vec::with_capacity(parts.len());
    for part in parts {
        if !current.is_group() {
            return None;
        }
        current = current
            .get_fields()
            .iter()
            .find(|field| field.name() == part)?
            .as_ref();
        types.push(current);
    }
    (!types.is_empty()).then_some(types)
}

fn repetition(t: &Type) -> Repetition {
    let info = t.get_basic_info();
    if info.has_repetition() {
        info.repetition()
    } else {
        Repetition::REQUIRED
    }
}

fn is_list_root(t: &Type) -> bool {
    t.is_group() && repetition(t) != Repetition::REPEATED
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parquet::schema::{parser::parse_message_type, types::SchemaDescriptor};

    use super::*;

    fn schema(message: &str) -> SchemaDescriptor {
        SchemaDescriptor::new(Arc::new(parse_message_type(message).unwrap()))
    }

    #[test]
    fn test_integer_promotion_table() {
        assert_eq!(resolve_integer(8, true), Some(ScalarKind::Byte));
        assert_eq!(resolve_integer(8, false), Some(ScalarKind::Short));
        assert_eq!(resolve_integer(16, true), Some(ScalarKind::Short));
        assert_eq!(resolve_integer(16, false), Some(ScalarKind::Int));
        assert_eq!(resolve_integer(32, true), Some(ScalarKind::Int));
        assert_eq!(resolve_integer(32, false), Some(ScalarKind::Long));
        assert_eq!(resolve_integer(64, false), Some(ScalarKind::Long));
        assert_eq!(resolve_integer(64, true), None);
    }

    #[test]
    fn test_annotated_int32_columns() {
        let schema = schema(
            "message m {
                required int32 i8 (INTEGER(8,true));
                required int32 u8 (INTEGER(8,false));
                required int32 i16 (INTEGER(16,true));
                required int32 u16 (INTEGER(16,false));
                optional int32 i32 (INTEGER(32,true));
                optional int32 u32 (INTEGER(32,false));
                optional int32 plain;
                optional int32 legacy (UINT_16);
                optional int32 day (DATE);
            }",
        );
        let mapping = map_schema(&schema);
        assert!(mapping.dropped.is_empty());
        let kinds: Vec<_> = mapping.plans.iter().map(|p| p.info.kind).collect();
        use ContentKind::Scalar;
        assert_eq!(
            kinds,
            vec![
                Scalar(ScalarKind::Byte),
                Scalar(ScalarKind::Short),
                Scalar(ScalarKind::Short),
                Scalar(ScalarKind::Int),
                Scalar(ScalarKind::Int),
                Scalar(ScalarKind::Long),
                Scalar(ScalarKind::Int),
                Scalar(ScalarKind::Int),
                Scalar(ScalarKind::Int),
            ]
        );
        assert_eq!(mapping.plans[5].read, LeafRead::UnsignedInt);
        assert!(!mapping.plans[0].info.nullable);
        assert!(mapping.plans[4].info.nullable);
        assert_eq!(mapping.plans[8].info.time_domain, Some(TimeDomain::UnixDate));
    }

    #[test]
    fn test_scalar_layout() {
        let schema = schema(
            "message m {
                optional double x;
                required binary name (UTF8);
                optional binary blob;
                optional int64 t (TIMESTAMP(MICROS,true));
            }",
        );
        let plans = map_schema(&schema).plans;
        assert_eq!(
            plans[0].layout,
            LevelLayout {
                max_def: 1,
                max_rep: 0,
                null_level: Some(0),
                present_level: 0
            }
        );
        assert_eq!(plans[1].layout.null_level, None);
        assert_eq!(plans[1].info.kind, ContentKind::Scalar(ScalarKind::String));
        assert_eq!(plans[2].info.kind, ContentKind::Scalar(ScalarKind::Bytes));
        assert_eq!(
            plans[3].info.time_domain,
            Some(TimeDomain::UnixTime(TimeUnit::Micros))
        );
    }

    #[test]
    fn test_array_shapes() {
        let schema = schema(
            "message m {
                repeated int32 flat;
                optional group two (LIST) { repeated float item; }
                optional group three (LIST) {
                    repeated group list { optional binary element (UTF8); }
                }
                required group three_req (LIST) {
                    repeated group list { required boolean element; }
                }
            }",
        );
        let mapping = map_schema(&schema);
        assert!(mapping.dropped.is_empty());
        let plans = mapping.plans;
        assert_eq!(plans.len(), 4);

        assert_eq!(plans[0].info.name, "flat");
        assert_eq!(plans[0].info.kind, ContentKind::Array(ScalarKind::Int));
        assert!(!plans[0].info.nullable);
        assert_eq!(plans[0].layout.null_level, None);
        assert_eq!(plans[0].layout.present_level, 0);

        assert_eq!(plans[1].info.name, "two");
        assert_eq!(plans[1].layout.max_def, 2);
        assert_eq!(plans[1].layout.null_level, None);
        assert_eq!(plans[1].layout.present_level, 1);

        assert_eq!(plans[2].info.name, "three");
        assert_eq!(plans[2].info.kind, ContentKind::Array(ScalarKind::String));
        assert_eq!(plans[2].layout.max_def, 3);
        assert_eq!(plans[2].layout.null_level, Some(2));
        assert_eq!(plans[2].layout.present_level, 1);

        assert!(!plans[3].info.nullable);
        assert_eq!(plans[3].layout.max_def, 1);
        assert_eq!(plans[3].layout.null_level, None);
        assert_eq!(plans[3].layout.present_level, 0);
    }

    #[test]
    fn test_unsupported_columns() {
        let schema = schema(
            "message m {
                optional int32 ok;
                optional int96 legacy_time;
                optional fixed_len_byte_array(16) uuid;
                optional group nested (LIST) {
                    repeated group list {
                        optional group element (LIST) {
                            repeated group list { optional int32 element; }
                        }
                    }
                }
                optional group point { required double x; required double y; }
                repeated binary blobs;
            }",
        );
        let mapping = map_schema(&schema);
        assert_eq!(mapping.plans.len(), 1);
        assert_eq!(mapping.plans[0].info.name, "ok");
        let dropped: Vec<_> = mapping.dropped.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            dropped,
            vec![
                "legacy_time",
                "uuid",
                "nested.list.element.list.element",
                "point.x",
                "point.y",
                "blobs",
            ]
        );
    }
}
