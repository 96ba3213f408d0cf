use std::sync::Arc;

use bytes::Bytes;
use parquet::{
    data_type::{ByteArray, ByteArrayType, Int32Type, Int96, Int96Type},
    file::writer::SerializedFileWriter,
    schema::parser::parse_message_type,
};
use pqtable::{
    ContentKind, MemoryTable, ParquetTableReader, ReadOptions, ScalarKind, Table, Value,
};

/// A file with a single required INT32 column `v`.
fn int32_file(annotation: &str, values: &[i32]) -> Bytes {
    let schema = format!("message m {{ required int32 v {annotation}; }}");
    let schema = Arc::new(parse_message_type(&schema).unwrap());
    let mut buf = Vec::new();
    let mut writer = SerializedFileWriter::new(&mut buf, schema, Default::default()).unwrap();
    let mut row_group = writer.next_row_group().unwrap();
    let mut column = row_group.next_column().unwrap().unwrap();
    column
        .typed::<Int32Type>()
        .write_batch(values, None, None)
        .unwrap();
    column.close().unwrap();
    row_group.close().unwrap();
    writer.close().unwrap();
    Bytes::from(buf)
}

#[test]
fn test_integer_promotion() {
    let cases = [
        ("(INT_8)", -5, ScalarKind::Byte, Value::Byte(-5)),
        ("(UINT_8)", 200, ScalarKind::Short, Value::Short(200)),
        ("(INT_16)", -300, ScalarKind::Short, Value::Short(-300)),
        ("(UINT_16)", 65_000, ScalarKind::Int, Value::Int(65_000)),
        ("(INT_32)", i32::MIN + 1, ScalarKind::Int, Value::Int(i32::MIN + 1)),
        ("(UINT_32)", -1, ScalarKind::Long, Value::Long(u32::MAX as i64)),
        ("", 7, ScalarKind::Int, Value::Int(7)),
    ];
    for (annotation, raw, kind, expected) in cases {
        let data = int32_file(annotation, &[raw, 0]);
        let reader = ParquetTableReader::open(data, ReadOptions::default()).unwrap();
        assert_eq!(reader.columns()[0].kind, ContentKind::Scalar(kind), "{annotation}");
        assert!(!reader.columns()[0].nullable);

        let table = MemoryTable::from_table(&reader).unwrap();
        assert_eq!(table.cell(0, 0), Some(&Some(expected.clone())), "{annotation}");
        let cached = MemoryTable::from_table(&reader.build_cache().unwrap()).unwrap();
        assert_eq!(cached.row_data(), table.row_data(), "{annotation}");
    }
}

#[test]
fn test_unsupported_column_is_skipped() {
    let schema = "
        message m {
            required int32 id;
            optional group nested (LIST) {
                repeated group list {
                    optional group element (LIST) {
                        repeated group list {
                            optional int32 element;
                        }
                    }
                }
            }
            optional binary name (UTF8);
        }";
    let schema = Arc::new(parse_message_type(schema).unwrap());
    let mut buf = Vec::new();
    let mut writer = SerializedFileWriter::new(&mut buf, schema, Default::default()).unwrap();
    let mut row_group = writer.next_row_group().unwrap();

    let mut column = row_group.next_column().unwrap().unwrap();
    column
        .typed::<Int32Type>()
        .write_batch(&[1, 2, 3], None, None)
        .unwrap();
    column.close().unwrap();

    let mut column = row_group.next_column().unwrap().unwrap();
    column
        .typed::<Int32Type>()
        .write_batch(&[10, 11], Some(&[5, 5, 0, 1]), Some(&[0, 2, 0, 0]))
        .unwrap();
    column.close().unwrap();

    let mut column = row_group.next_column().unwrap().unwrap();
    column
        .typed::<ByteArrayType>()
        .write_batch(
            &[ByteArray::from("a"), ByteArray::from("c")],
            Some(&[1, 0, 1]),
            None,
        )
        .unwrap();
    column.close().unwrap();
    row_group.close().unwrap();
    writer.close().unwrap();

    let reader = ParquetTableReader::open(Bytes::from(buf), ReadOptions::default()).unwrap();
    let names: Vec<_> = reader.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name"]);
    assert_eq!(reader.dropped_columns().len(), 1);

    let expected = vec![
        vec![Some(Value::Int(1)), Some(Value::String("a".into()))],
        vec![Some(Value::Int(2)), None],
        vec![Some(Value::Int(3)), Some(Value::String("c".into()))],
    ];
    let table = MemoryTable::from_table(&reader).unwrap();
    assert_eq!(table.row_data(), expected.as_slice());
    let cached = MemoryTable::from_table(&reader.build_cache().unwrap()).unwrap();
    assert_eq!(cached.row_data(), expected.as_slice());
}

#[test]
fn test_two_level_list_and_int96() {
    let schema = "
        message m {
            optional group xs (LIST) {
                repeated int32 item;
            }
            required int96 legacy_ts;
        }";
    let schema = Arc::new(parse_message_type(schema).unwrap());
    let mut buf = Vec::new();
    let mut writer = SerializedFileWriter::new(&mut buf, schema, Default::default()).unwrap();
    let mut row_group = writer.next_row_group().unwrap();

    let mut column = row_group.next_column().unwrap().unwrap();
    column
        .typed::<Int32Type>()
        .write_batch(&[1, 2], Some(&[2, 2, 0, 1]), Some(&[0, 1, 0, 0]))
        .unwrap();
    column.close().unwrap();

    let mut ts = Int96::new();
    ts.set_data(0, 0, 2_440_588);
    let mut column = row_group.next_column().unwrap().unwrap();
    column
        .typed::<Int96Type>()
        .write_batch(&[ts.clone(), ts.clone(), ts], None, None)
        .unwrap();
    column.close().unwrap();
    row_group.close().unwrap();
    writer.close().unwrap();

    let reader = ParquetTableReader::open(Bytes::from(buf), ReadOptions::default()).unwrap();
    assert_eq!(reader.columns().len(), 1);
    assert_eq!(reader.columns()[0].kind, ContentKind::Array(ScalarKind::Int));
    assert_eq!(reader.dropped_columns()[0].path, "legacy_ts");

    let expected = vec![
        vec![Some(Value::IntArray(vec![1, 2]))],
        vec![None],
        vec![Some(Value::IntArray(vec![]))],
    ];
    let table = MemoryTable::from_table(&reader).unwrap();
    assert_eq!(table.row_data(), expected.as_slice());
    let cached = MemoryTable::from_table(&reader.build_cache().unwrap()).unwrap();
    assert_eq!(cached.row_data(), expected.as_slice());
}

#[test]
fn test_not_a_parquet_file() {
    let data = Bytes::from_static(b"definitely not a parquet file");
    let err = ParquetTableReader::open(data, ReadOptions::default()).err().unwrap();
    assert!(err.is_format_error());

    let err = ParquetTableReader::open(Bytes::from_static(b"PAR"), ReadOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err.kind(), pqtable::ErrorKind::NotParquet { .. }));
}
