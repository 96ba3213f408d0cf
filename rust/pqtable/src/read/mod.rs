//! Parquet table access.

mod cached;
mod sequential;

use std::{path::Path, sync::Arc};

use parquet::file::{metadata::ParquetMetaData, reader::FileReader};
use pqtable_common::{Error, ErrorKind, Result};

use crate::{
    mapper::{ColumnPlan, DroppedColumn, map_schema},
    options::{CacheMode, ReadOptions},
    source::{ParquetSource, open_file_reader},
    table::{ColumnInfo, RandomAccess, RowSequence, Table},
};

pub use cached::{CachedTable, ItemCodec};
pub use sequential::SequentialTable;

/// An opened parquet file: footer, mapped columns and read configuration.
///
/// Opening parses the footer and maps the schema once. Row data is only read
/// by the engines created from the reader.
pub struct ParquetTableReader<S: ParquetSource> {
    source: S,
    metadata: Arc<ParquetMetaData>,
    plans: Arc<[ColumnPlan]>,
    columns: Vec<ColumnInfo>,
    dropped: Vec<DroppedColumn>,
    options: ReadOptions,
}

impl<S: ParquetSource> ParquetTableReader<S> {
    pub fn open(source: S, options: ReadOptions) -> Result<ParquetTableReader<S>> {
        let reader = open_file_reader(&source)?;
        let metadata = Arc::new(reader.metadata().clone());
        let mapping = map_schema(metadata.file_metadata().schema_descr());
        let columns = mapping.plans.iter().map(|plan| plan.info.clone()).collect();
        Ok(ParquetTableReader {
            source,
            metadata,
            plans: mapping.plans.into(),
            columns,
            dropped: mapping.dropped,
            options,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn metadata(&self) -> &Arc<ParquetMetaData> {
        &self.metadata
    }

    /// Leaf columns left out of the table, with the reason.
    pub fn dropped_columns(&self) -> &[DroppedColumn] {
        &self.dropped
    }

    pub fn column_plans(&self) -> &[ColumnPlan] {
        &self.plans
    }

    pub fn row_count(&self) -> u64 {
        self.metadata.file_metadata().num_rows() as u64
    }

    /// Key/value pairs of the file footer.
    pub fn key_value_metadata(&self) -> Vec<(String, Option<String>)> {
        self.metadata
            .file_metadata()
            .key_value_metadata()
            .map(|kv| {
                kv.iter()
                    .map(|entry| (entry.key.clone(), entry.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Starts a forward-only pass over all rows, on a fresh file handle.
    pub fn sequential(&self) -> Result<SequentialTable<S::Reader>> {
        let reader = open_file_reader(&self.source)?;
        let row_groups = (0..reader.num_row_groups()).collect();
        Ok(SequentialTable::new(
            reader,
            self.plans.clone(),
            row_groups,
            self.options.batch_records(),
        ))
    }

    /// One independent cursor per row group, for parallel consumption.
    /// Their rows, concatenated in order, are the rows of the file.
    pub fn row_group_splits(&self) -> Result<Vec<SequentialTable<S::Reader>>> {
        (0..self.metadata.num_row_groups())
            .map(|row_group| {
                let reader = open_file_reader(&self.source)?;
                Ok(SequentialTable::new(
                    reader,
                    self.plans.clone(),
                    vec![row_group],
                    self.options.batch_records(),
                ))
            })
            .collect()
    }

    /// Materializes every column into a random-access table.
    pub fn build_cache(&self) -> Result<CachedTable> {
        CachedTable::build(&self.source, &self.metadata, &self.plans, &self.options)
    }

    /// Creates the table selected by the configured [`CacheMode`].
    ///
    /// In `Auto` mode, a failed cache build falls back to sequential access
    /// unless the file content itself is at fault.
    pub fn into_table(self) -> Result<ParquetTable<S>> {
        match self.options.cache_mode() {
            CacheMode::Sequential => Ok(ParquetTable::Sequential(self)),
            CacheMode::Cached => Ok(ParquetTable::Cached(self.build_cache()?)),
            CacheMode::Auto => match self.build_cache() {
                Ok(table) => Ok(ParquetTable::Cached(table)),
                Err(e) if caused_by_content(&e) => Err(e),
                Err(e) => {
                    log::warn!(
                        "falling back to sequential access for {}: {e}",
                        self.source.name()
                    );
                    Ok(ParquetTable::Sequential(self))
                }
            },
        }
    }
}

fn caused_by_content(e: &Error) -> bool {
    match e.kind() {
        ErrorKind::CacheBuild { source, .. } => source.is_format_error(),
        _ => e.is_format_error(),
    }
}

impl<S: ParquetSource> Table for ParquetTableReader<S> {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn row_count(&self) -> Option<u64> {
        Some(ParquetTableReader::row_count(self))
    }

    fn rows(&self) -> Result<Box<dyn RowSequence + '_>> {
        Ok(Box::new(self.sequential()?))
    }
}

/// A parquet table as returned by [`open_table`]: cached when possible.
pub enum ParquetTable<S: ParquetSource> {
    Cached(CachedTable),
    Sequential(ParquetTableReader<S>),
}

impl<S: ParquetSource> ParquetTable<S> {
    pub fn is_cached(&self) -> bool {
        matches!(self, ParquetTable::Cached(_))
    }

    /// Random access to the cells, available for cached tables only.
    pub fn random_access(&self) -> Option<&dyn RandomAccess> {
        match self {
            ParquetTable::Cached(table) => Some(table),
            ParquetTable::Sequential(_) => None,
        }
    }
}

impl<S: ParquetSource> Table for ParquetTable<S> {
    fn columns(&self) -> &[ColumnInfo] {
        match self {
            ParquetTable::Cached(table) => table.columns(),
            ParquetTable::Sequential(reader) => reader.columns(),
        }
    }

    fn row_count(&self) -> Option<u64> {
        match self {
            ParquetTable::Cached(table) => Table::row_count(table),
            ParquetTable::Sequential(reader) => Table::row_count(reader),
        }
    }

    fn rows(&self) -> Result<Box<dyn RowSequence + '_>> {
        match self {
            ParquetTable::Cached(table) => table.rows(),
            ParquetTable::Sequential(reader) => reader.rows(),
        }
    }
}

/// Opens `source` and builds the table selected by `options`.
pub fn open_table<S: ParquetSource>(source: S, options: ReadOptions) -> Result<ParquetTable<S>> {
    ParquetTableReader::open(source, options)?.into_table()
}

/// Opens a local parquet file.
pub fn open_path(
    path: impl AsRef<Path>,
    options: ReadOptions,
) -> Result<ParquetTable<std::path::PathBuf>> {
    open_table(path.as_ref().to_path_buf(), options)
}
