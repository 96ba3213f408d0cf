//! Read and write configuration.

use std::path::{Path, PathBuf};

use parquet::{basic::Compression, file::properties::WriterProperties, format::KeyValue};

/// Selects the read engine used by
/// [`ParquetTableReader::into_table`](crate::read::ParquetTableReader::into_table).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Build the cached table, falling back to sequential access if that fails.
    #[default]
    Auto,
    /// Build the cached table; a failure is an error.
    Cached,
    /// Sequential, single-pass access only.
    Sequential,
}

#[derive(Clone, Debug)]
pub struct ReadOptions {
    cache_mode: CacheMode,
    worker_count: Option<usize>,
    temp_dir: Option<PathBuf>,
    batch_records: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            cache_mode: CacheMode::Auto,
            worker_count: None,
            temp_dir: None,
            batch_records: 1024,
        }
    }
}

impl ReadOptions {
    pub fn new() -> ReadOptions {
        Default::default()
    }

    pub fn with_cache_mode(self, cache_mode: CacheMode) -> Self {
        Self { cache_mode, ..self }
    }

    /// Number of threads used to build a cached table.
    pub fn with_worker_count(self, worker_count: usize) -> Self {
        Self {
            worker_count: Some(worker_count.max(1)),
            ..self
        }
    }

    /// Parent directory of the per-table scratch directories.
    pub fn with_temp_dir(self, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: Some(temp_dir.into()),
            ..self
        }
    }

    /// Number of records fetched from a column chunk at once.
    pub fn with_batch_records(self, batch_records: usize) -> Self {
        Self {
            batch_records: batch_records.max(1),
            ..self
        }
    }

    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    pub fn batch_records(&self) -> usize {
        self.batch_records
    }

    /// The configured worker count, or one less than the available parallelism.
    pub fn worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        })
    }
}

/// Physical layout of array columns in written files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArrayEncoding {
    /// `optional group (LIST) { repeated group list { optional element } }`:
    /// supports null arrays and null elements.
    #[default]
    Grouped,
    /// Bare `repeated` primitive field: smaller, but cannot hold nulls.
    Flat,
}

#[derive(Clone, Debug)]
pub struct WriteOptions {
    array_encoding: ArrayEncoding,
    row_group_rows: usize,
    compression: Compression,
    key_value_metadata: Vec<(String, Option<String>)>,
    created_by: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            array_encoding: ArrayEncoding::Grouped,
            row_group_rows: 64 * 1024,
            compression: Compression::SNAPPY,
            key_value_metadata: Vec::new(),
            created_by: None,
        }
    }
}

impl WriteOptions {
    pub fn new() -> WriteOptions {
        Default::default()
    }

    pub fn with_array_encoding(self, array_encoding: ArrayEncoding) -> Self {
        Self {
            array_encoding,
            ..self
        }
    }

    pub fn with_row_group_rows(self, row_group_rows: usize) -> Self {
        Self {
            row_group_rows: row_group_rows.max(1),
            ..self
        }
    }

    pub fn with_compression(self, compression: Compression) -> Self {
        Self {
            compression,
            ..self
        }
    }

    pub fn with_key_value(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.key_value_metadata.push((key.into(), value));
        self
    }

    pub fn with_created_by(self, created_by: impl Into<String>) -> Self {
        Self {
            created_by: Some(created_by.into()),
            ..self
        }
    }

    pub fn array_encoding(&self) -> ArrayEncoding {
        self.array_encoding
    }

    pub fn row_group_rows(&self) -> usize {
        self.row_group_rows
    }

    pub(crate) fn writer_properties(&self) -> WriterProperties {
        let mut builder = WriterProperties::builder().set_compression(self.compression);
        if let Some(created_by) = &self.created_by {
            builder = builder.set_created_by(created_by.clone());
        }
        if !self.key_value_metadata.is_empty() {
            let kv = self
                .key_value_metadata
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
                .collect();
            builder = builder.set_key_value_metadata(Some(kv));
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_options() {
        let options = ReadOptions::new()
            .with_worker_count(0)
            .with_batch_records(16)
            .with_cache_mode(CacheMode::Cached);
        assert_eq!(options.worker_count(), 1);
        assert_eq!(options.batch_records(), 16);
        assert_eq!(options.cache_mode(), CacheMode::Cached);
        assert!(ReadOptions::default().worker_count() >= 1);
    }

    #[test]
    fn test_writer_properties() {
        let props = WriteOptions::new()
            .with_compression(Compression::UNCOMPRESSED)
            .with_key_value("origin", Some("test".to_string()))
            .writer_properties();
        assert_eq!(props.key_value_metadata().map(|kv| kv.len()), Some(1));
    }
}
