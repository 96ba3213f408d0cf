//! Random-access tables materialized from a parquet file.
//!
//! Every column is decoded once, by its own task on a dedicated worker pool, into
//! a scratch [`ItemStore`]. Tasks share nothing but the cancellation flag, the
//! scratch directory and the parsed footer; each one opens its own handle on the
//! source and only reads the pages of its column.

mod codec;

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use parquet::file::{
    metadata::ParquetMetaData,
    properties::{ReaderProperties, ReaderPropertiesPtr},
    reader::RowGroupReader,
    serialized_reader::SerializedRowGroupReader,
};
use pqtable_common::{Error, Result, verify_arg};
use pqtable_io::{
    ItemStore, ScratchDir,
    store::{create_fixed, create_indexed},
};
use rayon::prelude::*;

use crate::{
    decode::{ColumnCursor, decode_cell},
    mapper::ColumnPlan,
    options::ReadOptions,
    source::ParquetSource,
    table::{ColumnInfo, RandomAccess, RowSequence, Table},
    value::Cell,
};

pub use codec::ItemCodec;

/// Rows decoded between two checks of the cancellation flag.
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// A fully materialized table, safe for any number of concurrent readers.
///
/// The column stores live in a scratch directory owned by the table and
/// deleted when the table is dropped.
pub struct CachedTable {
    columns: Vec<ColumnInfo>,
    codecs: Vec<ItemCodec>,
    stores: Vec<Arc<dyn ItemStore>>,
    row_count: u64,
    // Dropped last, after every store has closed its files.
    scratch: ScratchDir,
}

impl CachedTable {
    /// Decodes the columns described by `plans` from `source`, whose footer
    /// has already been parsed into `metadata`.
    ///
    /// Any failure cancels the remaining column tasks, deletes every scratch
    /// file written so far and is reported as a `CacheBuild` error naming the
    /// failed column.
    pub fn build<S: ParquetSource + ?Sized>(
        source: &S,
        metadata: &ParquetMetaData,
        plans: &[ColumnPlan],
        options: &ReadOptions,
    ) -> Result<CachedTable> {
        let started = Instant::now();
        let row_count = metadata.file_metadata().num_rows() as u64;
        let props: ReaderPropertiesPtr = Arc::new(ReaderProperties::builder().build());
        let scratch = ScratchDir::create(options.temp_dir())
            .map_err(|e| Error::io("creating the scratch directory", e))?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.worker_count())
            .thread_name(|i| format!("pqtable_cache_{i}"))
            .build()
            .map_err(|e| Error::invalid_operation(format!("starting the cache workers: {e}")))?;

        let cancel = AtomicBool::new(false);
        let results: Vec<Result<Arc<dyn ItemStore>>> = pool.install(|| {
            plans
                .par_iter()
                .enumerate()
                .map(|(icol, plan)| {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(Error::cancelled());
                    }
                    let task = ColumnTask {
                        metadata,
                        props: &props,
                        scratch: &scratch,
                        cancel: &cancel,
                        options,
                    };
                    let result = task.materialize(source, icol, plan);
                    if result.is_err() {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    result
                })
                .collect()
        });

        let mut stores = Vec::with_capacity(plans.len());
        let mut failure: Option<(&str, Error)> = None;
        for (plan, result) in plans.iter().zip(results) {
            match result {
                Ok(store) => stores.push(store),
                Err(e) => {
                    // The root cause wins over the cancellations it triggered.
                    let replace = match &failure {
                        None => true,
                        Some((_, first)) => first.is_cancelled() && !e.is_cancelled(),
                    };
                    if replace {
                        failure = Some((plan.info.name.as_str(), e));
                    }
                }
            }
        }
        if let Some((column, e)) = failure {
            drop(stores);
            drop(scratch);
            return Err(Error::cache_build(column, e));
        }

        for (plan, store) in plans.iter().zip(&stores) {
            verify_data_len(&plan.info.name, store.len(), row_count)?;
        }
        log::info!(
            "cached {} columns, {row_count} rows in {:?}",
            plans.len(),
            started.elapsed()
        );
        Ok(CachedTable {
            columns: plans.iter().map(|plan| plan.info.clone()).collect(),
            codecs: plans.iter().map(|plan| ItemCodec::new(plan.info.kind)).collect(),
            stores,
            row_count,
            scratch,
        })
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Raw store of one column.
    pub fn column_store(&self, icol: usize) -> Option<&dyn ItemStore> {
        self.stores.get(icol).map(|store| &**store)
    }

    fn read_cell(&self, row: u64, icol: usize) -> Result<Cell> {
        verify_arg!(icol, icol < self.stores.len());
        verify_arg!(row, row < self.row_count);
        let item = self.stores[icol]
            .read_item(row)
            .map_err(|e| Error::io(format!("cached column '{}'", self.columns[icol].name), e))?;
        self.codecs[icol].decode(&item)
    }

    /// Total size of the scratch stores, in bytes.
    pub fn stored_size(&self) -> u64 {
        self.stores.iter().map(|store| store.stored_size()).sum()
    }
}

fn verify_data_len(column: &str, len: u64, row_count: u64) -> Result<()> {
    if len == row_count {
        Ok(())
    } else {
        Err(Error::invalid_format(
            column,
            format!("decoded {len} cells, the file has {row_count} rows"),
        ))
    }
}

/// Shared context of the per-column tasks of one cache build.
struct ColumnTask<'a> {
    metadata: &'a ParquetMetaData,
    props: &'a ReaderPropertiesPtr,
    scratch: &'a ScratchDir,
    cancel: &'a AtomicBool,
    options: &'a ReadOptions,
}

impl ColumnTask<'_> {
    fn materialize<S: ParquetSource + ?Sized>(
        &self,
        source: &S,
        icol: usize,
        plan: &ColumnPlan,
    ) -> Result<Arc<dyn ItemStore>> {
        let started = Instant::now();
        let chunks = Arc::new(source.open()?);
        let codec = ItemCodec::new(plan.info.kind);
        let store_name = format!("col{icol:05}");
        let store_error =
            |e: std::io::Error| Error::io(format!("cache store of column '{}'", plan.info.name), e);
        let mut writer = match codec.item_size() {
            Some(size) => create_fixed(self.scratch, &store_name, size),
            None => create_indexed(self.scratch, &store_name),
        }
        .map_err(store_error)?;

        let mut decoder = plan.create_decoder();
        let mut item = Vec::new();
        for (irg, rg_meta) in self.metadata.row_groups().iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(Error::cancelled());
            }
            let context = || format!("column '{}', row group {irg}", plan.info.name);
            let column =
                SerializedRowGroupReader::new(chunks.clone(), rg_meta, None, self.props.clone())
                    .and_then(|row_group| row_group.get_column_reader(plan.leaf_index))
                    .map_err(|e| Error::parquet(context(), e))?;
            let mut cursor =
                ColumnCursor::new(column, &plan.layout, self.options.batch_records())?;
            for row in 0..rg_meta.num_rows() as u64 {
                if row % CANCEL_CHECK_INTERVAL == CANCEL_CHECK_INTERVAL - 1
                    && self.cancel.load(Ordering::Relaxed)
                {
                    return Err(Error::cancelled());
                }
                decode_cell(&mut cursor, &mut decoder, &plan.layout)?;
                item.clear();
                codec.encode(decoder.value(), &mut item)?;
                writer.push(&item).map_err(store_error)?;
            }
        }

        let store = writer.seal().map_err(store_error)?;
        log::debug!(
            "cached column '{}': {} rows, {} bytes in {:?}",
            plan.info.name,
            store.len(),
            store.stored_size(),
            started.elapsed()
        );
        Ok(store)
    }
}

impl Table for CachedTable {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn row_count(&self) -> Option<u64> {
        Some(self.row_count)
    }

    fn rows(&self) -> Result<Box<dyn RowSequence + '_>> {
        Ok(Box::new(CachedRows {
            table: self,
            row: None,
        }))
    }
}

impl RandomAccess for CachedTable {
    fn cell_at(&self, row: u64, icol: usize) -> Result<Cell> {
        self.read_cell(row, icol)
    }
}

/// Sequential view over a [`CachedTable`].
struct CachedRows<'a> {
    table: &'a CachedTable,
    row: Option<u64>,
}

impl RowSequence for CachedRows<'_> {
    fn column_count(&self) -> usize {
        self.table.columns.len()
    }

    fn next(&mut self) -> Result<bool> {
        let next = self.row.map_or(0, |row| row + 1);
        self.row = Some(next.min(self.table.row_count));
        Ok(next < self.table.row_count)
    }

    fn cell(&mut self, icol: usize) -> Result<Cell> {
        match self.row {
            Some(row) if row < self.table.row_count => self.table.read_cell(row, icol),
            _ => Err(Error::invalid_operation("cell read outside of a row")),
        }
    }
}
