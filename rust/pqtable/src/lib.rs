//! Parquet-backed tables.
//!
//! Maps parquet files to a generic table model of named, typed columns holding
//! scalars or one-dimensional arrays, and back:
//! - [`read::SequentialTable`] streams rows forward, decoding only the cells
//!   that are actually requested;
//! - [`read::CachedTable`] materializes every column in parallel into scratch
//!   stores and then serves random access to any cell;
//! - [`write::ParquetWriter`] shreds rows into definition/repetition levels and
//!   writes them out.

pub mod decode;
pub mod mapper;
pub mod options;
pub mod read;
pub mod source;
pub mod table;
pub mod value;
pub mod write;

pub use options::{ArrayEncoding, CacheMode, ReadOptions, WriteOptions};
pub use read::{
    CachedTable, ParquetTable, ParquetTableReader, SequentialTable, open_path, open_table,
};
pub use source::ParquetSource;
pub use table::{ColumnInfo, MemoryTable, RandomAccess, RowSequence, Table};
pub use value::{Cell, ContentKind, ScalarKind, TimeDomain, TimeUnit, Value};
pub use write::{ParquetWriter, write_table, write_table_to_path};

pub use pqtable_common::{Error, ErrorKind, Result};
