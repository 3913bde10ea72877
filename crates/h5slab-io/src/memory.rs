//! In-memory chunk streams and a chunk store built from them.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use h5slab_format::stream::{
    BoundedSeek, ReadStreamProvider, SeekOrigin, SourceStream, WriteStream, WriteStreamProvider,
};
use h5slab_format::{Result, SlabError};
use log::trace;

// ---------------------------------------------------------------------------
// MemoryStream
// ---------------------------------------------------------------------------

/// Growable byte stream with an explicit cursor.
///
/// Supports `Begin` and `Current` seeks. Writes past the end grow the buffer,
/// zero-filling any gap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStream {
    data: Vec<u8>,
    position: u64,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream of `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Apply a bounded seek to `position`; `base` is where `Begin` points.
pub(crate) fn seek_position(position: u64, base: u64, offset: i32, origin: SeekOrigin) -> Result<u64> {
    let from = match origin {
        SeekOrigin::Begin => base,
        SeekOrigin::Current => position,
        SeekOrigin::End => return Err(SlabError::UnsupportedSeekOrigin(origin)),
    };
    from.checked_add_signed(offset as i64).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("seek by {offset} from {from} leaves the stream"),
        )
        .into()
    })
}

impl BoundedSeek for MemoryStream {
    fn seek(&mut self, offset: i32, origin: SeekOrigin) -> Result<()> {
        self.position = seek_position(self.position, 0, offset, origin)?;
        Ok(())
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = (self.position as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let start = usize::try_from(self.position)
            .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "stream position exceeds memory"))?;
        let end = start + buf.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(buf);
        self.position = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryChunkStore
// ---------------------------------------------------------------------------

/// Chunked storage held in memory, keyed by linear chunk index.
///
/// Chunks are allocated zero-filled on first write. Reading a chunk that was
/// never written yields zeros (the default fill value) without allocating it.
#[derive(Debug, Clone, Default)]
pub struct MemoryChunkStore {
    chunk_bytes: usize,
    chunks: HashMap<u64, MemoryStream>,
    fill: MemoryStream,
    resolutions: u64,
}

impl MemoryChunkStore {
    /// A store whose chunks each hold `chunk_bytes` bytes.
    pub fn new(chunk_bytes: usize) -> Self {
        Self {
            chunk_bytes,
            ..Self::default()
        }
    }

    /// Store for chunks of `chunk_dims` elements of `type_size` bytes.
    pub fn for_chunks(chunk_dims: &[u64], type_size: usize) -> Self {
        let elements: u64 = chunk_dims.iter().product();
        Self::new(elements as usize * type_size)
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    /// Raw bytes of an allocated chunk.
    pub fn chunk(&self, chunk_index: u64) -> Option<&[u8]> {
        self.chunks.get(&chunk_index).map(MemoryStream::as_bytes)
    }

    /// Replace the content of a chunk.
    pub fn insert(&mut self, chunk_index: u64, data: Vec<u8>) {
        self.chunks.insert(chunk_index, MemoryStream::from_vec(data));
    }

    /// Number of allocated chunks.
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// How many times a stream was resolved, for read and write combined.
    pub fn resolutions(&self) -> u64 {
        self.resolutions
    }
}

impl WriteStreamProvider for MemoryChunkStore {
    fn resolve_write_stream(&mut self, chunk_index: u64) -> Result<&mut dyn WriteStream> {
        self.resolutions += 1;
        let chunk_bytes = self.chunk_bytes;
        let stream = self.chunks.entry(chunk_index).or_insert_with(|| {
            trace!("allocate chunk {chunk_index} ({chunk_bytes} bytes)");
            MemoryStream::zeroed(chunk_bytes)
        });
        Ok(stream)
    }
}

impl<T> ReadStreamProvider<T> for MemoryChunkStore {
    fn resolve_read_stream(&mut self, chunk_index: u64) -> Result<SourceStream<'_, T>> {
        self.resolutions += 1;
        match self.chunks.get_mut(&chunk_index) {
            Some(stream) => Ok(SourceStream::Raw(stream)),
            None => {
                trace!("chunk {chunk_index} not allocated, reading fill value");
                self.fill = MemoryStream::zeroed(self.chunk_bytes);
                Ok(SourceStream::Raw(&mut self.fill))
            }
        }
    }
}
