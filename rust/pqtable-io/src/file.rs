//! Scratch file access: buffered appends while a store is being built,
//! positional reads once it has been sealed.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    ops::Range,
    path::Path,
};

use bytes::{Bytes, BytesMut};

use crate::{ReadAt, SealingWrite};

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Append-only scratch file. Fails to create files that already exist, so two
/// stores can never share a backing file.
pub struct AppendFile {
    writer: Option<BufWriter<File>>,
    written: u64,
}

impl AppendFile {
    pub fn create(path: &Path) -> io::Result<AppendFile> {
        let file = File::create_new(path)?;
        Ok(AppendFile {
            writer: Some(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file)),
            written: 0,
        })
    }

    /// Bytes appended so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("scratch file is already sealed"))
    }
}

impl SealingWrite for AppendFile {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer()?.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    fn seal(&mut self) -> io::Result<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::other("scratch file is already sealed"))?;
        writer.flush()
    }
}

/// Read-only view of a sealed scratch file. The size is taken once at open
/// time, since sealed files never change.
pub struct SealedFile {
    file: File,
    size: u64,
}

impl SealedFile {
    pub fn open(path: &Path) -> io::Result<SealedFile> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(SealedFile { file, size })
    }
}

impl ReadAt for SealedFile {
    fn size(&self) -> io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, range: Range<u64>) -> io::Result<Bytes> {
        if range.end < range.start {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("inverted range {range:?}"),
            ));
        }
        let end = range.end.min(self.size);
        if range.start >= end {
            return Ok(Bytes::new());
        }
        let mut buf = BytesMut::zeroed((end - range.start) as usize);
        read_exact_at(&self.file, range.start, &mut buf)?;
        Ok(buf.freeze())
    }
}

fn read_exact_at(file: &File, pos: u64, buf: &mut [u8]) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_exact_at(buf, pos)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        let mut done = 0;
        while done < buf.len() {
            match file.seek_read(&mut buf[done..], pos + done as u64)? {
                0 => return Err(io::ErrorKind::UnexpectedEof.into()),
                n => done += n,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.bin");
        let mut file = AppendFile::create(&path).unwrap();
        for i in 0..10u8 {
            file.write_all(&[i; 8]).unwrap();
        }
        assert_eq!(file.written(), 80);
        file.seal().unwrap();
        assert!(file.write_all(b"x").is_err());
        assert!(file.seal().is_err());
        assert!(AppendFile::create(&path).is_err());

        let sealed = SealedFile::open(&path).unwrap();
        assert_eq!(sealed.size().unwrap(), 80);
        assert_eq!(sealed.read_at(16..20).unwrap().as_ref(), &[2; 4]);
        assert_eq!(sealed.read_at(76..100).unwrap().as_ref(), &[9; 4]);
        assert!(sealed.read_at(100..120).unwrap().is_empty());
        assert!(sealed.read_at(5..5).unwrap().is_empty());
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = sealed.read_at(8..4);
        assert!(inverted.is_err());
    }
}
