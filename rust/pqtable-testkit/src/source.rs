//! Parquet sources for tests.

use std::{
    io,
    ops::Range,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use bytes::Bytes;
use parquet::{
    errors::ParquetError,
    file::reader::{ChunkReader, Length},
};
use pqtable::{Error, ParquetSource, Result, Table, WriteOptions, write_table};

/// In-memory parquet file with injected failures.
///
/// Opens are numbered from 1. The first one is taken by the footer read, so
/// `fail_from(data, 2)` lets a table open and breaks every worker of a cached
/// build. Failures either reject the open itself or hand out a handle whose
/// reads all fail.
pub struct FailingSource {
    data: Bytes,
    failing: Range<usize>,
    failing_reads: Range<usize>,
    opens: AtomicUsize,
}

impl FailingSource {
    /// Fails the `n`-th and every later open.
    pub fn fail_from(data: Bytes, n: usize) -> FailingSource {
        FailingSource::fail_opens(data, n..usize::MAX)
    }

    /// Fails the opens numbered in `failing`.
    pub fn fail_opens(data: Bytes, failing: Range<usize>) -> FailingSource {
        FailingSource {
            data,
            failing,
            failing_reads: 0..0,
            opens: AtomicUsize::new(0),
        }
    }

    /// Lets every open succeed, but the handles returned by the opens numbered
    /// in `failing` fail on every read.
    pub fn fail_reads(data: Bytes, failing: Range<usize>) -> FailingSource {
        FailingSource {
            data,
            failing: 0..0,
            failing_reads: failing,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ParquetSource for FailingSource {
    type Reader = FailingReader;

    fn name(&self) -> String {
        "failing-source".to_string()
    }

    fn open(&self) -> Result<FailingReader> {
        let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.contains(&n) {
            return Err(Error::io(
                self.name(),
                io::Error::other(format!("injected failure on open #{n}")),
            ));
        }
        Ok(FailingReader {
            data: self.data.clone(),
            broken_open: self.failing_reads.contains(&n).then_some(n),
        })
    }
}

/// Handle opened by a [`FailingSource`].
pub struct FailingReader {
    data: Bytes,
    broken_open: Option<usize>,
}

impl FailingReader {
    fn check(&self) -> parquet::errors::Result<()> {
        match self.broken_open {
            Some(n) => Err(ParquetError::External(Box::new(io::Error::other(format!(
                "injected read failure on open #{n}"
            ))))),
            None => Ok(()),
        }
    }
}

impl Length for FailingReader {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

impl ChunkReader for FailingReader {
    type T = <Bytes as ChunkReader>::T;

    fn get_read(&self, start: u64) -> parquet::errors::Result<Self::T> {
        self.check()?;
        self.data.get_read(start)
    }

    fn get_bytes(&self, start: u64, length: usize) -> parquet::errors::Result<Bytes> {
        self.check()?;
        self.data.get_bytes(start, length)
    }
}

/// Writes `table` to memory.
pub fn write_to_bytes(table: &dyn Table, options: &WriteOptions) -> Result<Bytes> {
    let mut buf = Vec::new();
    write_table(table, &mut buf, options)?;
    Ok(Bytes::from(buf))
}

/// Writes `table` into a new temporary file under `dir`.
pub fn write_to_temp_file(
    table: &dyn Table,
    dir: &Path,
    options: &WriteOptions,
) -> Result<tempfile::TempPath> {
    let file = tempfile::Builder::new()
        .suffix(".parquet")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir.display().to_string(), e))?;
    let (file, path) = file.into_parts();
    write_table(table, file, options)?;
    Ok(path)
}
