//! Generic table abstraction: column metadata and row iteration contracts.

use pqtable_common::{Error, Result, try_or_ret_some_err, verify_arg};

use crate::value::{Cell, ContentKind, TimeDomain};

/// Name, content class and nullability of one table column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ContentKind,
    pub nullable: bool,
    pub time_domain: Option<TimeDomain>,
}

impl ColumnInfo {
    /// Creates a nullable column without time annotation.
    pub fn new(name: impl Into<String>, kind: ContentKind) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            kind,
            nullable: true,
            time_domain: None,
        }
    }

    pub fn with_nullable(self, nullable: bool) -> ColumnInfo {
        ColumnInfo { nullable, ..self }
    }

    pub fn with_time_domain(self, time_domain: Option<TimeDomain>) -> ColumnInfo {
        ColumnInfo {
            time_domain,
            ..self
        }
    }
}

/// Forward-only row cursor.
///
/// A freshly created sequence is positioned before the first row; [`next`](Self::next)
/// must return `true` before any cell can be read.
pub trait RowSequence {
    fn column_count(&self) -> usize;

    /// Advances to the next row. Returns `false` once the rows are exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Returns the cell of column `icol` in the current row.
    fn cell(&mut self, icol: usize) -> Result<Cell>;

    /// Returns all cells of the current row.
    fn row(&mut self) -> Result<Vec<Cell>> {
        (0..self.column_count()).map(|icol| self.cell(icol)).collect()
    }

    /// Turns the sequence into an iterator over whole rows.
    fn into_rows(self) -> Rows<Self>
    where
        Self: Sized,
    {
        Rows { seq: self }
    }
}

impl<S: RowSequence + ?Sized> RowSequence for Box<S> {
    fn column_count(&self) -> usize {
        (**self).column_count()
    }

    fn next(&mut self) -> Result<bool> {
        (**self).next()
    }

    fn cell(&mut self, icol: usize) -> Result<Cell> {
        (**self).cell(icol)
    }

    fn row(&mut self) -> Result<Vec<Cell>> {
        (**self).row()
    }
}

/// Iterator adapter returned by [`RowSequence::into_rows`].
pub struct Rows<S> {
    seq: S,
}

impl<S: RowSequence> Iterator for Rows<S> {
    type Item = Result<Vec<Cell>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !try_or_ret_some_err!(self.seq.next()) {
            return None;
        }
        Some(self.seq.row())
    }
}

/// A table: column metadata plus the ability to start a row sequence.
pub trait Table {
    fn columns(&self) -> &[ColumnInfo];

    /// Number of rows, if known up front.
    fn row_count(&self) -> Option<u64>;

    /// Starts a new sequential pass over the rows.
    fn rows(&self) -> Result<Box<dyn RowSequence + '_>>;
}

/// A table supporting random access to any cell, safe for concurrent readers.
pub trait RandomAccess: Table + Send + Sync {
    fn cell_at(&self, row: u64, icol: usize) -> Result<Cell>;

    fn row_at(&self, row: u64) -> Result<Vec<Cell>> {
        (0..self.columns().len())
            .map(|icol| self.cell_at(row, icol))
            .collect()
    }
}

/// Table held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryTable {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Cell>>,
}

impl MemoryTable {
    pub fn new(columns: Vec<ColumnInfo>) -> MemoryTable {
        MemoryTable {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        verify_arg!(row, row.len() == self.columns.len());
        self.rows.push(row);
        Ok(())
    }

    /// Reads every row of `table` into memory.
    pub fn from_table(table: &dyn Table) -> Result<MemoryTable> {
        let mut result = MemoryTable::new(table.columns().to_vec());
        let mut rows = table.rows()?;
        while rows.next()? {
            result.rows.push(rows.row()?);
        }
        Ok(result)
    }

    pub fn row_data(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, icol: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(icol))
    }
}

impl Table for MemoryTable {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn row_count(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }

    fn rows(&self) -> Result<Box<dyn RowSequence + '_>> {
        Ok(Box::new(MemoryRows {
            table: self,
            pos: None,
        }))
    }
}

struct MemoryRows<'a> {
    table: &'a MemoryTable,
    pos: Option<usize>,
}

impl RowSequence for MemoryRows<'_> {
    fn column_count(&self) -> usize {
        self.table.columns.len()
    }

    fn next(&mut self) -> Result<bool> {
        let next = self.pos.map_or(0, |pos| pos + 1);
        if next < self.table.rows.len() {
            self.pos = Some(next);
            Ok(true)
        } else {
            self.pos = Some(self.table.rows.len());
            Ok(false)
        }
    }

    fn cell(&mut self, icol: usize) -> Result<Cell> {
        let row = self
            .pos
            .and_then(|pos| self.table.rows.get(pos))
            .ok_or_else(|| Error::invalid_operation("cell read outside of a row"))?;
        row.get(icol)
            .cloned()
            .ok_or_else(|| Error::invalid_arg("icol", format!("no column {icol}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ScalarKind, Value};

    #[test]
    fn test_memory_table_rows() {
        let mut table = MemoryTable::new(vec![
            ColumnInfo::new("a", ContentKind::Scalar(ScalarKind::Int)),
            ColumnInfo::new("b", ContentKind::Array(ScalarKind::Double)),
        ]);
        table.push_row(vec![Some(Value::Int(1)), None]).unwrap();
        table
            .push_row(vec![None, Some(Value::DoubleArray(vec![0.5]))])
            .unwrap();
        assert!(table.push_row(vec![None]).is_err());

        let mut rows = table.rows().unwrap();
        assert!(rows.cell(0).is_err());
        assert!(rows.next().unwrap());
        assert_eq!(rows.cell(0).unwrap(), Some(Value::Int(1)));
        assert!(rows.cell(2).is_err());

        let all = table.rows().unwrap().into_rows().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1][1], Some(Value::DoubleArray(vec![0.5])));

        let copy = MemoryTable::from_table(&table).unwrap();
        assert_eq!(copy.row_data(), table.row_data());
    }
}
