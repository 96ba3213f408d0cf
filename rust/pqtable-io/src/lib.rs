//! Scratch storage for the cached table engine.
//!
//! A [`ScratchDir`] owns a temporary directory for one cached table and removes
//! it on drop. Column stores ([`store`]) are written once through
//! [`SealingWrite`] files and then read concurrently through [`ReadAt`].

use std::ops::Range;

use bytes::Bytes;

pub mod file;
pub mod scratch;
pub mod store;

pub use scratch::ScratchDir;
pub use store::{ItemStore, ItemStoreWriter};

/// Positional, shareable reader over an immutable byte source.
pub trait ReadAt: Send + Sync + 'static {
    fn size(&self) -> std::io::Result<u64>;

    /// Reads `range`. The result is shorter than requested only when the
    /// range extends past the end of the source.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes>;
}

/// Append-only writer that must be sealed before its output is read back.
pub trait SealingWrite: Send {
    /// Appends `buf`. Fails once the writer has been sealed.
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Flushes buffered data. No writes are accepted afterwards.
    fn seal(&mut self) -> std::io::Result<()>;
}
