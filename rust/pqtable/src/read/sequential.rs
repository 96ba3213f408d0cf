//! Single-pass, forward-only row cursor over a parquet file.

use std::sync::Arc;

use parquet::file::{
    reader::{ChunkReader, FileReader},
    serialized_reader::SerializedFileReader,
};
use pqtable_common::{Error, Result, verify_data};

use crate::{
    decode::{ColumnCursor, Decoder, LevelReader, decode_cell},
    mapper::ColumnPlan,
    table::RowSequence,
    value::Cell,
};

/// Streams the rows of a set of row groups.
///
/// Each column is decoded only when one of its cells is requested. Cells of
/// rows the caller never looked at are skipped without materialization. Once
/// the cursor moves past a row, that row cannot be read again.
pub struct SequentialTable<R: ChunkReader + 'static> {
    reader: SerializedFileReader<R>,
    plans: Arc<[ColumnPlan]>,
    row_groups: Vec<usize>,
    next_group: usize,
    state: CursorState,
    batch_records: usize,
}

enum CursorState {
    BeforeFirstRow,
    WithinRowGroup(RowGroupCursor),
    Exhausted,
}

/// Per row group reading context, rebuilt as a whole on every row group switch.
struct RowGroupCursor {
    row_group: usize,
    row_count: u64,
    /// Current row, relative to the start of the row group.
    row: u64,
    columns: Vec<ColumnSlot>,
}

struct ColumnSlot {
    cursor: ColumnCursor,
    decoder: Decoder,
    /// Last row decoded into `decoder`.
    last_row: Option<u64>,
}

impl<R: ChunkReader + 'static> SequentialTable<R> {
    pub(crate) fn new(
        reader: SerializedFileReader<R>,
        plans: Arc<[ColumnPlan]>,
        row_groups: Vec<usize>,
        batch_records: usize,
    ) -> SequentialTable<R> {
        SequentialTable {
            reader,
            plans,
            row_groups,
            next_group: 0,
            state: CursorState::BeforeFirstRow,
            batch_records,
        }
    }

    /// Total number of rows covered by this cursor.
    pub fn row_count(&self) -> u64 {
        let metadata = self.reader.metadata();
        self.row_groups
            .iter()
            .map(|&rg| metadata.row_group(rg).num_rows() as u64)
            .sum()
    }

    /// Row groups visited by this cursor, in order.
    pub fn row_groups(&self) -> &[usize] {
        &self.row_groups
    }

    /// Index of the row group holding the current row.
    pub fn current_row_group(&self) -> Option<usize> {
        match &self.state {
            CursorState::WithinRowGroup(group) => Some(group.row_group),
            _ => None,
        }
    }

    fn open_row_group(&self, row_group: usize, row_count: u64) -> Result<RowGroupCursor> {
        let reader = self.reader.get_row_group(row_group)?;
        let columns = self
            .plans
            .iter()
            .map(|plan| {
                let column = reader.get_column_reader(plan.leaf_index)?;
                Ok(ColumnSlot {
                    cursor: ColumnCursor::new(column, &plan.layout, self.batch_records)?,
                    decoder: plan.create_decoder(),
                    last_row: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!("loaded row group {row_group} ({row_count} rows)");
        Ok(RowGroupCursor {
            row_group,
            row_count,
            row: 0,
            columns,
        })
    }
}

impl<R: ChunkReader + 'static> RowSequence for SequentialTable<R> {
    fn column_count(&self) -> usize {
        self.plans.len()
    }

    fn next(&mut self) -> Result<bool> {
        match &mut self.state {
            CursorState::Exhausted => return Ok(false),
            CursorState::WithinRowGroup(group) if group.row + 1 < group.row_count => {
                group.row += 1;
                return Ok(true);
            }
            _ => (),
        }
        while let Some(&row_group) = self.row_groups.get(self.next_group) {
            self.next_group += 1;
            let row_count = self.reader.metadata().row_group(row_group).num_rows() as u64;
            if row_count == 0 {
                continue;
            }
            let group = self.open_row_group(row_group, row_count)?;
            self.state = CursorState::WithinRowGroup(group);
            return Ok(true);
        }
        self.state = CursorState::Exhausted;
        Ok(false)
    }

    fn cell(&mut self, icol: usize) -> Result<Cell> {
        let CursorState::WithinRowGroup(group) = &mut self.state else {
            return Err(Error::invalid_operation("cell read outside of a row"));
        };
        let (Some(plan), Some(slot)) = (self.plans.get(icol), group.columns.get_mut(icol)) else {
            return Err(Error::invalid_arg("icol", format!("no column {icol}")));
        };
        let row = group.row;
        if slot.last_row != Some(row) {
            let pending = row - slot.last_row.map_or(0, |last| last + 1);
            if pending > 0 {
                let skipped = slot.cursor.skip_records(pending as usize)?;
                verify_data!(skipped, skipped as u64 == pending);
            }
            decode_cell(&mut slot.cursor, &mut slot.decoder, &plan.layout)?;
            slot.last_row = Some(row);
        }
        Ok(slot.decoder.value().cloned())
    }
}
