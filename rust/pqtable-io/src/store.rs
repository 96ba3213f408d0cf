//! Append-only, then read-only, random-access item stores backed by scratch files.
//!
//! Two layouts are provided:
//! - fixed: every item has the same encoded size, item `i` lives at `i * item_size`;
//! - indexed: items are concatenated into a data file, and a second file holds
//!   `count + 1` little-endian `u64` offsets delimiting them.
//!
//! A writer is sealed exactly once, which turns it into an [`ItemStore`] that can
//! be shared between threads and read concurrently.

use std::{io, path::PathBuf, sync::Arc};

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::{
    ReadAt, ScratchDir, SealingWrite,
    file::{AppendFile, SealedFile},
};

const OFFSET_SIZE: u64 = 8;

/// Sealed, immutable sequence of byte items.
pub trait ItemStore: Send + Sync + 'static {
    /// Number of items in the store.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the item at `index`.
    fn read_item(&self, index: u64) -> io::Result<Bytes>;

    /// Total number of bytes occupied by the store files.
    fn stored_size(&self) -> u64;
}

/// Appends items to a store under construction.
pub trait ItemStoreWriter: Send {
    fn push(&mut self, item: &[u8]) -> io::Result<()>;

    /// Number of items pushed so far.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes the written data and reopens it for random access.
    fn seal(self: Box<Self>) -> io::Result<Arc<dyn ItemStore>>;
}

/// Creates a writer for items of exactly `item_size` bytes.
///
/// The backing file is registered with `scratch` before it is created.
pub fn create_fixed(
    scratch: &ScratchDir,
    name: &str,
    item_size: usize,
) -> io::Result<Box<dyn ItemStoreWriter>> {
    if item_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "fixed-size store items must not be empty",
        ));
    }
    let path = scratch.register(&format!("{name}.fix"));
    let file = AppendFile::create(&path)?;
    Ok(Box::new(FixedItemWriter {
        file,
        path,
        item_size,
        count: 0,
    }))
}

/// Creates a writer for items of arbitrary size.
pub fn create_indexed(scratch: &ScratchDir, name: &str) -> io::Result<Box<dyn ItemStoreWriter>> {
    let data_path = scratch.register(&format!("{name}.dat"));
    let index_path = scratch.register(&format!("{name}.idx"));
    let data = AppendFile::create(&data_path)?;
    let mut index = AppendFile::create(&index_path)?;
    index.write_all(&0u64.to_le_bytes())?;
    Ok(Box::new(IndexedItemWriter {
        data,
        index,
        data_path,
        index_path,
        count: 0,
    }))
}

fn out_of_range(index: u64, count: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("item {index} out of range, store holds {count}"),
    )
}

fn damaged(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

struct FixedItemWriter {
    file: AppendFile,
    path: PathBuf,
    item_size: usize,
    count: u64,
}

impl ItemStoreWriter for FixedItemWriter {
    fn push(&mut self, item: &[u8]) -> io::Result<()> {
        if item.len() != self.item_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("item of {} bytes in a store of {}-byte items", item.len(), self.item_size),
            ));
        }
        self.file.write_all(item)?;
        self.count += 1;
        Ok(())
    }

    fn len(&self) -> u64 {
        self.count
    }

    fn seal(mut self: Box<Self>) -> io::Result<Arc<dyn ItemStore>> {
        self.file.seal()?;
        Ok(Arc::new(FixedItemStore {
            file: SealedFile::open(&self.path)?,
            item_size: self.item_size as u64,
            count: self.count,
        }))
    }
}

pub struct FixedItemStore {
    file: SealedFile,
    item_size: u64,
    count: u64,
}

impl ItemStore for FixedItemStore {
    fn len(&self) -> u64 {
        self.count
    }

    fn read_item(&self, index: u64) -> io::Result<Bytes> {
        if index >= self.count {
            return Err(out_of_range(index, self.count));
        }
        let start = index * self.item_size;
        let item = self.file.read_at(start..start + self.item_size)?;
        if item.len() as u64 != self.item_size {
            return Err(damaged(format!("item {index} is truncated")));
        }
        Ok(item)
    }

    fn stored_size(&self) -> u64 {
        self.count * self.item_size
    }
}

struct IndexedItemWriter {
    data: AppendFile,
    index: AppendFile,
    data_path: PathBuf,
    index_path: PathBuf,
    count: u64,
}

impl ItemStoreWriter for IndexedItemWriter {
    fn push(&mut self, item: &[u8]) -> io::Result<()> {
        self.data.write_all(item)?;
        self.index.write_all(&self.data.written().to_le_bytes())?;
        self.count += 1;
        Ok(())
    }

    fn len(&self) -> u64 {
        self.count
    }

    fn seal(mut self: Box<Self>) -> io::Result<Arc<dyn ItemStore>> {
        self.data.seal()?;
        self.index.seal()?;
        Ok(Arc::new(IndexedItemStore {
            data: SealedFile::open(&self.data_path)?,
            index: SealedFile::open(&self.index_path)?,
            data_size: self.data.written(),
            count: self.count,
        }))
    }
}

pub struct IndexedItemStore {
    data: SealedFile,
    index: SealedFile,
    data_size: u64,
    count: u64,
}

impl ItemStore for IndexedItemStore {
    fn len(&self) -> u64 {
        self.count
    }

    fn read_item(&self, index: u64) -> io::Result<Bytes> {
        if index >= self.count {
            return Err(out_of_range(index, self.count));
        }
        let pos = index * OFFSET_SIZE;
        let offsets = self.index.read_at(pos..pos + 2 * OFFSET_SIZE)?;
        if offsets.len() as u64 != 2 * OFFSET_SIZE {
            return Err(damaged(format!("offsets of item {index} are truncated")));
        }
        let start = LittleEndian::read_u64(&offsets[..8]);
        let end = LittleEndian::read_u64(&offsets[8..]);
        if start > end || end > self.data_size {
            return Err(damaged(format!("item {index} spans {start}..{end}")));
        }
        self.data.read_at(start..end)
    }

    fn stored_size(&self) -> u64 {
        self.data_size + (self.count + 1) * OFFSET_SIZE
    }
}

#[cfg(test)]
mod tests {
    use crate::ScratchDir;

    use super::{create_fixed, create_indexed};

    #[test]
    fn test_fixed_store() {
        let scratch = ScratchDir::create(None).unwrap();
        let mut writer = create_fixed(&scratch, "c0", 4).unwrap();
        for i in 0u32..1000 {
            writer.push(&i.to_le_bytes()).unwrap();
        }
        assert!(writer.push(b"toolong").is_err());
        let store = writer.seal().unwrap();
        assert_eq!(store.len(), 1000);
        assert_eq!(store.stored_size(), 4000);
        for i in [0u32, 1, 517, 999] {
            assert_eq!(store.read_item(i as u64).unwrap().as_ref(), &i.to_le_bytes());
        }
        assert!(store.read_item(1000).is_err());
    }

    #[test]
    fn test_indexed_store() {
        let scratch = ScratchDir::create(None).unwrap();
        let mut writer = create_indexed(&scratch, "c1").unwrap();
        let items: Vec<Vec<u8>> = (0..300).map(|i| vec![i as u8; i % 17]).collect();
        for item in &items {
            writer.push(item).unwrap();
        }
        let store = writer.seal().unwrap();
        assert_eq!(store.len(), items.len() as u64);
        for (i, item) in items.iter().enumerate().rev() {
            assert_eq!(store.read_item(i as u64).unwrap().as_ref(), item.as_slice());
        }
        assert_eq!(scratch.registered_files().len(), 2);
    }

    #[test]
    fn test_empty_stores() {
        let scratch = ScratchDir::create(None).unwrap();
        let store = create_indexed(&scratch, "e").unwrap().seal().unwrap();
        assert!(store.is_empty());
        assert!(store.read_item(0).is_err());
        let store = create_fixed(&scratch, "f", 2).unwrap().seal().unwrap();
        assert!(store.is_empty());
    }
}
