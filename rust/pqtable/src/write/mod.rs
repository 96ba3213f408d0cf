//! Writing tables to parquet.

pub mod consumer;
pub mod encoder;
pub mod shredder;

use std::{fs::File, io::Write, path::Path, sync::Arc};

use parquet::{
    column::writer::ColumnWriter,
    file::writer::SerializedFileWriter,
    schema::types::Type,
};
use pqtable_common::{Error, Result, verify_arg};

use crate::{
    options::WriteOptions,
    table::{ColumnInfo, Table},
    value::Cell,
};

use consumer::RecordConsumer;
use encoder::ColumnEncoder;
use shredder::{ColumnData, LeafValues, LevelShredder};

/// Name of the schema root group.
const SCHEMA_ROOT: &str = "schema";

/// Row-at-a-time parquet writer.
///
/// Rows are shredded into level buffers and flushed as one row group every
/// `row_group_rows` rows. Columns without a parquet representation are left
/// out with a warning.
pub struct ParquetWriter<W: Write + Send> {
    writer: SerializedFileWriter<W>,
    /// Encoders of the written columns, with the index of their input column.
    encoders: Vec<(usize, ColumnEncoder)>,
    input_columns: usize,
    shredder: LevelShredder,
    row_group_rows: usize,
    rows_written: u64,
}

impl<W: Write + Send> ParquetWriter<W> {
    pub fn new(
        sink: W,
        columns: &[ColumnInfo],
        options: &WriteOptions,
    ) -> Result<ParquetWriter<W>> {
        let mut encoders = Vec::with_capacity(columns.len());
        let mut fields = Vec::with_capacity(columns.len());
        for (icol, info) in columns.iter().enumerate() {
            let field = ColumnEncoder::new(info.clone(), options.array_encoding())
                .and_then(|encoder| Ok((encoder.schema_type()?, encoder)));
            match field {
                Ok((field, encoder)) => {
                    fields.push(field);
                    encoders.push((icol, encoder));
                }
                Err(e) => log::warn!("not writing column '{}': {e}", info.name),
            }
        }
        let schema = Type::group_type_builder(SCHEMA_ROOT)
            .with_fields(fields)
            .build()?;
        let shredder = LevelShredder::new(&schema)?;
        let writer = SerializedFileWriter::new(
            sink,
            Arc::new(schema),
            Arc::new(options.writer_properties()),
        )?;
        Ok(ParquetWriter {
            writer,
            encoders,
            input_columns: columns.len(),
            shredder,
            row_group_rows: options.row_group_rows(),
            rows_written: 0,
        })
    }

    /// Columns actually written, in file order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.encoders.iter().map(|(_, encoder)| encoder.info())
    }

    /// Rows accepted so far, flushed or not.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Appends one row. On error nothing of the row is kept.
    pub fn write_row(&mut self, row: &[Cell]) -> Result<()> {
        verify_arg!(row, row.len() == self.input_columns);
        self.shredder.start_message()?;
        let result = self.write_fields(row).and_then(|()| self.shredder.end_message());
        if let Err(e) = result {
            self.shredder.abort_message();
            return Err(e);
        }
        self.rows_written += 1;
        if self.shredder.buffered_records() >= self.row_group_rows {
            self.flush_row_group()?;
        }
        Ok(())
    }

    fn write_fields(&mut self, row: &[Cell]) -> Result<()> {
        for (index, (icol, encoder)) in self.encoders.iter().enumerate() {
            match encoder.typed_value(&row[*icol]) {
                Some(value) => {
                    self.shredder.start_field(encoder.name(), index)?;
                    encoder.write(&value, &mut self.shredder)?;
                    self.shredder.end_field(encoder.name(), index)?;
                }
                None => encoder.check_null()?,
            }
        }
        Ok(())
    }

    fn flush_row_group(&mut self) -> Result<()> {
        if self.shredder.buffered_records() == 0 {
            return Ok(());
        }
        let mut row_group = self.writer.next_row_group()?;
        for icol in 0..self.shredder.column_count() {
            let Some(mut column) = row_group.next_column()? else {
                return Err(Error::invalid_operation("writer schema has fewer columns"));
            };
            write_column(column.untyped(), self.shredder.column(icol))?;
            column.close()?;
        }
        row_group.close()?;
        self.shredder.clear();
        Ok(())
    }

    /// Flushes the buffered rows and writes the footer. Returns the number of
    /// rows in the file.
    pub fn close(mut self) -> Result<u64> {
        self.flush_row_group()?;
        self.writer.close()?;
        Ok(self.rows_written)
    }
}

fn write_column(writer: &mut ColumnWriter<'_>, data: ColumnData<'_>) -> Result<()> {
    let defs = (data.max_def > 0).then_some(data.def_levels);
    let reps = (data.max_rep > 0).then_some(data.rep_levels);
    match (writer, data.values) {
        (ColumnWriter::BoolColumnWriter(w), LeafValues::Boolean(v)) => {
            w.write_batch(v, defs, reps)?
        }
        (ColumnWriter::Int32ColumnWriter(w), LeafValues::Int32(v)) => w.write_batch(v, defs, reps)?,
        (ColumnWriter::Int64ColumnWriter(w), LeafValues::Int64(v)) => w.write_batch(v, defs, reps)?,
        (ColumnWriter::FloatColumnWriter(w), LeafValues::Float(v)) => w.write_batch(v, defs, reps)?,
        (ColumnWriter::DoubleColumnWriter(w), LeafValues::Double(v)) => {
            w.write_batch(v, defs, reps)?
        }
        (ColumnWriter::ByteArrayColumnWriter(w), LeafValues::Binary(v)) => {
            w.write_batch(v, defs, reps)?
        }
        _ => {
            return Err(Error::invalid_operation(
                "column writer does not match the buffered values",
            ));
        }
    };
    Ok(())
}

/// Writes every row of `table` to `sink`. Returns the number of rows written.
pub fn write_table<W: Write + Send>(
    table: &dyn Table,
    sink: W,
    options: &WriteOptions,
) -> Result<u64> {
    let mut writer = ParquetWriter::new(sink, table.columns(), options)?;
    let mut rows = table.rows()?;
    while rows.next()? {
        writer.write_row(&rows.row()?)?;
    }
    writer.close()
}

/// Writes `table` to a new file at `path`. The file is removed again if
/// writing fails.
pub fn write_table_to_path(
    table: &dyn Table,
    path: impl AsRef<Path>,
    options: &WriteOptions,
) -> Result<u64> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    let result = write_table(table, file, options);
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("failed to remove {} after a failed write: {e}", path.display());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use pqtable_common::ErrorKind;

    use super::*;
    use crate::{
        options::ArrayEncoding,
        read::ParquetTableReader,
        table::{MemoryTable, RowSequence},
        value::{ContentKind, ScalarKind, Value},
    };

    fn write_to_bytes(table: &MemoryTable, options: &WriteOptions) -> Result<Bytes> {
        let mut buf = Vec::new();
        write_table(table, &mut buf, options)?;
        Ok(Bytes::from(buf))
    }

    #[test]
    fn test_row_groups_and_dropped_columns() {
        let mut table = MemoryTable::new(vec![
            ColumnInfo::new("id", ContentKind::Scalar(ScalarKind::Int)).with_nullable(false),
            ColumnInfo::new("blobs", ContentKind::Array(ScalarKind::Bytes)),
            ColumnInfo::new("name", ContentKind::Scalar(ScalarKind::String)),
        ]);
        for i in 0..10 {
            let name = (i % 3 != 0).then(|| Value::String(format!("n{i}")));
            table
                .push_row(vec![Some(Value::Int(i)), None, name])
                .unwrap();
        }
        let options = WriteOptions::new().with_row_group_rows(4);
        let data = write_to_bytes(&table, &options).unwrap();

        let reader = ParquetTableReader::open(data, Default::default()).unwrap();
        assert_eq!(reader.metadata().num_row_groups(), 3);
        assert_eq!(reader.row_count(), 10);
        let names: Vec<_> = reader.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);

        let mut rows = reader.sequential().unwrap();
        let mut count = 0;
        while rows.next().unwrap() {
            let i = count as i32;
            assert_eq!(rows.cell(0).unwrap(), Some(Value::Int(i)));
            let expected = (i % 3 != 0).then(|| Value::String(format!("n{i}")));
            assert_eq!(rows.cell(1).unwrap(), expected);
            count += 1;
        }
        assert_eq!(count, 10);
    }

    #[test]
    fn test_failed_row_is_not_written() {
        let mut table = MemoryTable::new(vec![
            ColumnInfo::new("id", ContentKind::Scalar(ScalarKind::Long)).with_nullable(false),
            ColumnInfo::new("xs", ContentKind::Array(ScalarKind::String)),
        ]);
        table.push_row(vec![Some(Value::Long(1)), None]).unwrap();

        let options = WriteOptions::new().with_array_encoding(ArrayEncoding::Flat);
        let mut buf = Vec::new();
        let mut writer = ParquetWriter::new(&mut buf, table.columns(), &options).unwrap();
        let err = writer.write_row(&table.row_data()[0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FlatArrayNull { .. }));
        assert!(writer.write_row(&[None, Some(Value::StringArray(vec![]))]).is_err());
        assert!(writer.write_row(&[Some(Value::Long(2))]).is_err());
        writer
            .write_row(&[Some(Value::Long(3)), Some(Value::StringArray(vec![Some("z".into())]))])
            .unwrap();
        assert_eq!(writer.close().unwrap(), 1);

        let reader = ParquetTableReader::open(Bytes::from(buf), Default::default()).unwrap();
        let rows: Vec<_> = reader
            .sequential()
            .unwrap()
            .into_rows()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![vec![
                Some(Value::Long(3)),
                Some(Value::StringArray(vec![Some("z".into())]))
            ]]
        );
    }
}
