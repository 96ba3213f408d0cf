use parquet::{
    column::reader::{ColumnReader, ColumnReaderImpl},
    data_type::{
        BoolType, ByteArray, ByteArrayType, DataType, DoubleType, FloatType, Int32Type, Int64Type,
    },
};
use pqtable_common::{Error, Result, verify_data};

use crate::mapper::LevelLayout;

use super::{LevelReader, PhysicalValue};

enum TypedReader {
    Boolean(ColumnReaderImpl<BoolType>, Vec<bool>),
    Int32(ColumnReaderImpl<Int32Type>, Vec<i32>),
    Int64(ColumnReaderImpl<Int64Type>, Vec<i64>),
    Float(ColumnReaderImpl<FloatType>, Vec<f32>),
    Double(ColumnReaderImpl<DoubleType>, Vec<f64>),
    Binary(ColumnReaderImpl<ByteArrayType>, Vec<ByteArray>),
}

/// Buffered [`LevelReader`] over one column chunk.
///
/// Records are fetched `batch_records` at a time. Each fetch returns whole
/// records, so the buffer always ends on a record boundary.
pub struct ColumnCursor {
    reader: TypedReader,
    def_levels: Vec<i16>,
    rep_levels: Vec<i16>,
    max_def: i16,
    max_rep: i16,
    batch_records: usize,
    level_count: usize,
    level_pos: usize,
    value_pos: usize,
}

impl ColumnCursor {
    pub fn new(
        column: ColumnReader,
        layout: &LevelLayout,
        batch_records: usize,
    ) -> Result<ColumnCursor> {
        let reader = match column {
            ColumnReader::BoolColumnReader(r) => TypedReader::Boolean(r, Vec::new()),
            ColumnReader::Int32ColumnReader(r) => TypedReader::Int32(r, Vec::new()),
            ColumnReader::Int64ColumnReader(r) => TypedReader::Int64(r, Vec::new()),
            ColumnReader::FloatColumnReader(r) => TypedReader::Float(r, Vec::new()),
            ColumnReader::DoubleColumnReader(r) => TypedReader::Double(r, Vec::new()),
            ColumnReader::ByteArrayColumnReader(r) => TypedReader::Binary(r, Vec::new()),
            ColumnReader::Int96ColumnReader(_) | ColumnReader::FixedLenByteArrayColumnReader(_) => {
                return Err(Error::invalid_operation("reading an unsupported physical type"));
            }
        };
        Ok(ColumnCursor {
            reader,
            def_levels: Vec::with_capacity(batch_records),
            rep_levels: Vec::with_capacity(batch_records),
            max_def: layout.max_def,
            max_rep: layout.max_rep,
            batch_records: batch_records.max(1),
            level_count: 0,
            level_pos: 0,
            value_pos: 0,
        })
    }

    fn fill(&mut self) -> Result<bool> {
        self.def_levels.clear();
        self.rep_levels.clear();
        let batch = self.batch_records;
        let (defs, reps) = (&mut self.def_levels, &mut self.rep_levels);
        let (records, values, levels) = match &mut self.reader {
            TypedReader::Boolean(r, buf) => read_batch(r, batch, defs, reps, buf)?,
            TypedReader::Int32(r, buf) => read_batch(r, batch, defs, reps, buf)?,
            TypedReader::Int64(r, buf) => read_batch(r, batch, defs, reps, buf)?,
            TypedReader::Float(r, buf) => read_batch(r, batch, defs, reps, buf)?,
            TypedReader::Double(r, buf) => read_batch(r, batch, defs, reps, buf)?,
            TypedReader::Binary(r, buf) => read_batch(r, batch, defs, reps, buf)?,
        };
        self.level_count = if self.max_def == 0 && self.max_rep == 0 {
            values
        } else {
            levels
        };
        self.level_pos = 0;
        self.value_pos = 0;
        if self.max_def > 0 {
            verify_data!(def_levels, self.def_levels.len() == self.level_count);
            let present = self.def_levels.iter().filter(|&&d| d == self.max_def).count();
            verify_data!(values, present == values);
        }
        if self.max_rep > 0 {
            verify_data!(rep_levels, self.rep_levels.len() == self.level_count);
        }
        Ok(records > 0 || self.level_count > 0)
    }

    fn buffered(&self) -> bool {
        self.level_pos < self.level_count
    }
}

fn read_batch<T: DataType>(
    reader: &mut ColumnReaderImpl<T>,
    batch_records: usize,
    def_levels: &mut Vec<i16>,
    rep_levels: &mut Vec<i16>,
    values: &mut Vec<T::T>,
) -> Result<(usize, usize, usize)> {
    values.clear();
    Ok(reader.read_records(batch_records, Some(def_levels), Some(rep_levels), values)?)
}

impl LevelReader for ColumnCursor {
    fn has_current(&mut self) -> Result<bool> {
        if self.buffered() {
            return Ok(true);
        }
        Ok(self.fill()? && self.buffered())
    }

    fn def_level(&self) -> i16 {
        if self.max_def == 0 {
            0
        } else {
            self.def_levels[self.level_pos]
        }
    }

    fn rep_level(&self) -> i16 {
        if self.max_rep == 0 {
            0
        } else {
            self.rep_levels[self.level_pos]
        }
    }

    fn value(&self) -> Result<PhysicalValue<'_>> {
        let pos = self.value_pos;
        let value = match &self.reader {
            TypedReader::Boolean(_, v) => v.get(pos).map(|&x| PhysicalValue::Boolean(x)),
            TypedReader::Int32(_, v) => v.get(pos).map(|&x| PhysicalValue::Int32(x)),
            TypedReader::Int64(_, v) => v.get(pos).map(|&x| PhysicalValue::Int64(x)),
            TypedReader::Float(_, v) => v.get(pos).map(|&x| PhysicalValue::Float(x)),
            TypedReader::Double(_, v) => v.get(pos).map(|&x| PhysicalValue::Double(x)),
            TypedReader::Binary(_, v) => v.get(pos).map(|x| PhysicalValue::Binary(x.data())),
        };
        value.ok_or_else(|| {
            Error::invalid_format("column values", "fewer values than present levels")
        })
    }

    fn consume(&mut self) {
        if self.def_level() == self.max_def {
            self.value_pos += 1;
        }
        self.level_pos += 1;
    }

    fn skip_records(&mut self, count: usize) -> Result<usize> {
        let mut skipped = 0;
        while skipped < count && self.buffered() {
            self.consume();
            while self.buffered() && self.rep_level() > 0 {
                self.consume();
            }
            skipped += 1;
        }
        if skipped < count {
            let remaining = count - skipped;
            skipped += match &mut self.reader {
                TypedReader::Boolean(r, _) => r.skip_records(remaining)?,
                TypedReader::Int32(r, _) => r.skip_records(remaining)?,
                TypedReader::Int64(r, _) => r.skip_records(remaining)?,
                TypedReader::Float(r, _) => r.skip_records(remaining)?,
                TypedReader::Double(r, _) => r.skip_records(remaining)?,
                TypedReader::Binary(r, _) => r.skip_records(remaining)?,
            };
        }
        Ok(skipped)
    }
}
