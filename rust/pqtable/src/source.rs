//! Re-openable parquet inputs.

use std::{fs::File, path::PathBuf};

use bytes::Bytes;
use parquet::file::{
    reader::ChunkReader,
    serialized_reader::SerializedFileReader,
};
use pqtable_common::{Error, Result};

const MAGIC: &[u8; 4] = b"PAR1";

/// Header magic, footer length and footer magic.
const MIN_FILE_SIZE: u64 = 12;

/// A parquet file that can be opened any number of times.
///
/// The cached engine opens one independent handle per column task, so opening
/// must be cheap and must not disturb handles opened earlier.
pub trait ParquetSource: Send + Sync {
    type Reader: ChunkReader + 'static;

    /// Human-readable name, used in errors and log messages.
    fn name(&self) -> String;

    fn open(&self) -> Result<Self::Reader>;
}

impl ParquetSource for PathBuf {
    type Reader = File;

    fn name(&self) -> String {
        self.display().to_string()
    }

    fn open(&self) -> Result<File> {
        File::open(self).map_err(|e| Error::io(self.name(), e))
    }
}

impl ParquetSource for Bytes {
    type Reader = Bytes;

    fn name(&self) -> String {
        format!("<{} bytes in memory>", self.len())
    }

    fn open(&self) -> Result<Bytes> {
        Ok(self.clone())
    }
}

/// Opens `source` and parses its footer.
///
/// Inputs lacking the parquet magic are reported as `NotParquet`; everything the
/// parquet library rejects after that is `Malformed`.
pub fn open_file_reader<S: ParquetSource + ?Sized>(
    source: &S,
) -> Result<SerializedFileReader<S::Reader>> {
    let reader = source.open()?;
    check_magic(&reader, source)?;
    SerializedFileReader::new(reader)
        .map_err(|e| Error::parquet(format!("footer of {}", source.name()), e))
}

fn check_magic<R: ChunkReader, S: ParquetSource + ?Sized>(reader: &R, source: &S) -> Result<()> {
    let len = reader.len();
    if len < MIN_FILE_SIZE {
        return Err(Error::not_parquet(
            source.name(),
            format!("too short ({len} bytes)"),
        ));
    }
    let read = |start: u64| {
        reader
            .get_bytes(start, MAGIC.len())
            .map_err(|e| Error::parquet(source.name(), e))
    };
    if read(0)?.as_ref() != MAGIC {
        return Err(Error::not_parquet(source.name(), "no leading magic number"));
    }
    if read(len - MAGIC.len() as u64)?.as_ref() != MAGIC {
        return Err(Error::not_parquet(source.name(), "no trailing magic number"));
    }
    Ok(())
}
