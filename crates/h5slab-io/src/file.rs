//! File-backed chunk stream.
//!
//! A [`FileStream`] covers the region of a file that starts at
//! `base_address`; `SeekOrigin::Begin` is relative to that address. Reads and
//! writes are positional, so several streams may share one file handle's
//! underlying file without fighting over the OS cursor.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use h5slab_format::stream::{
    BoundedSeek, ReadStreamProvider, SeekOrigin, SourceStream, WriteStream, WriteStreamProvider,
};
use h5slab_format::Result;
use log::debug;

use crate::memory::seek_position;

/// Positional stream over a region of a file.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    base_address: u64,
    position: u64,
}

impl FileStream {
    /// Open an existing file read-only.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        debug!("open {} read-only", path.display());
        Ok(Self::from_file(File::open(path)?, 0))
    }

    /// Create (or truncate) a file for reading and writing.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        debug!("create {}", path.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::from_file(file, 0))
    }

    /// Wrap an open file; the stream starts at `base_address`.
    pub fn from_file(file: File, base_address: u64) -> Self {
        Self {
            file,
            base_address,
            position: base_address,
        }
    }

    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// Absolute file position of the cursor.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> File {
        self.file
    }
}

impl BoundedSeek for FileStream {
    fn seek(&mut self, offset: i32, origin: SeekOrigin) -> Result<()> {
        let position = seek_position(self.position, self.base_address, offset, origin)?;
        if position < self.base_address {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek to {position} before base address {}", self.base_address),
            )
            .into());
        }
        self.position = position;
        Ok(())
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = read_at(&self.file, buf, self.position)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = write_at(&self.file, buf, self.position)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Contiguous storage: the whole dataset is chunk 0.
fn contiguous(chunk_index: u64) -> io::Result<()> {
    if chunk_index == 0 {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("contiguous file storage has no chunk {chunk_index}"),
        ))
    }
}

impl WriteStreamProvider for FileStream {
    fn resolve_write_stream(&mut self, chunk_index: u64) -> Result<&mut dyn WriteStream> {
        contiguous(chunk_index)?;
        Ok(self)
    }
}

impl<T> ReadStreamProvider<T> for FileStream {
    fn resolve_read_stream(&mut self, chunk_index: u64) -> Result<SourceStream<'_, T>> {
        contiguous(chunk_index)?;
        Ok(SourceStream::Raw(self))
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(unix)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::write_at(file, buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, offset)
}

#[cfg(windows)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_write(file, buf, offset)
}

#[cfg(not(any(unix, windows)))]
fn read_at(mut file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::Start(offset))?;
    file.read(buf)
}

#[cfg(not(any(unix, windows)))]
fn write_at(mut file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::Start(offset))?;
    file.write(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use h5slab_format::SlabError;

    #[test]
    fn write_then_read_back() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut stream = FileStream::create(tmp.path()).unwrap();
        stream.write_all(b"hello world").unwrap();
        stream.seek(6, SeekOrigin::Begin).unwrap();
        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn begin_is_relative_to_base_address() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"headerPAYLOAD").unwrap();
        let file = File::open(tmp.path()).unwrap();
        let mut stream = FileStream::from_file(file, 6);

        stream.seek(2, SeekOrigin::Begin).unwrap();
        assert_eq!(stream.position(), 8);
        let mut buf = [0u8; 3];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"YLO");

        assert!(matches!(stream.seek(-6, SeekOrigin::Current).unwrap_err(), SlabError::Io(_)));
        assert_eq!(stream.position(), 11);
    }

    #[test]
    fn end_origin_unsupported() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut stream = FileStream::open(tmp.path()).unwrap();
        assert!(matches!(
            stream.seek(0, SeekOrigin::End).unwrap_err(),
            SlabError::UnsupportedSeekOrigin(SeekOrigin::End)
        ));
    }

    #[test]
    fn only_chunk_zero_resolves() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut stream = FileStream::create(tmp.path()).unwrap();
        assert!(stream.resolve_write_stream(0).is_ok());
        assert!(matches!(stream.resolve_write_stream(1), Err(SlabError::Io(_))));
    }
}
