//! Virtual dataset streams.
//!
//! A virtual dataset has no stored bytes of its own. Each [`VirtualSource`]
//! maps a run of the virtual dataset's linear element range onto values taken
//! from a backing dataset; elements no source covers read as the fill value.

use std::io::{self, Read};

use h5slab_format::stream::{
    BoundedSeek, ReadStreamProvider, SeekOrigin, SourceStream, VirtualDatasetStream,
};
use h5slab_format::Result;

use crate::memory::seek_position;

/// Elements `[start, start + values.len())` of the virtual dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualSource<T> {
    pub start: u64,
    pub values: Vec<T>,
}

impl<T> VirtualSource<T> {
    pub fn new(start: u64, values: Vec<T>) -> Self {
        Self { start, values }
    }

    fn end(&self) -> u64 {
        self.start + self.values.len() as u64
    }
}

/// Element-addressed stream over a virtual dataset of `len` elements.
#[derive(Debug, Clone)]
pub struct VirtualStream<T> {
    len: u64,
    fill: T,
    /// Sorted by `start`, non-overlapping.
    sources: Vec<VirtualSource<T>>,
    position: u64,
}

impl<T: Clone> VirtualStream<T> {
    pub fn new(len: u64, fill: T) -> Self {
        Self {
            len,
            fill,
            sources: Vec::new(),
            position: 0,
        }
    }

    /// Map another source into the virtual dataset.
    pub fn with_source(mut self, source: VirtualSource<T>) -> io::Result<Self> {
        if source.end() > self.len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "virtual source {}..{} exceeds dataset of {} elements",
                    source.start,
                    source.end(),
                    self.len
                ),
            ));
        }

        let at = self.sources.partition_point(|s| s.start < source.start);
        let clashes_before = at > 0 && self.sources[at - 1].end() > source.start;
        let clashes_after = self.sources.get(at).is_some_and(|s| s.start < source.end());
        if !source.values.is_empty() && (clashes_before || clashes_after) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("virtual source at {} overlaps another source", source.start),
            ));
        }

        self.sources.insert(at, source);
        Ok(self)
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current element position.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn sources(&self) -> &[VirtualSource<T>] {
        &self.sources
    }
}

impl<T> BoundedSeek for VirtualStream<T> {
    fn seek(&mut self, offset: i32, origin: SeekOrigin) -> Result<()> {
        self.position = seek_position(self.position, 0, offset, origin)?;
        Ok(())
    }
}

/// Virtual datasets are read element-wise through
/// [`VirtualDatasetStream::read_virtual`], never as raw bytes.
impl<T> Read for VirtualStream<T> {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "virtual datasets have no raw byte representation",
        ))
    }
}

impl<T: Clone> VirtualDatasetStream<T> for VirtualStream<T> {
    fn read_virtual(&mut self, target: &mut [T]) -> Result<()> {
        let end = self.position + target.len() as u64;
        if end > self.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read of {end} elements past virtual dataset of {}", self.len),
            )
            .into());
        }

        let mut filled = 0usize;
        while filled < target.len() {
            let pos = self.position + filled as u64;
            let wanted = target.len() - filled;
            // last source starting at or before `pos`
            let at = self.sources.partition_point(|s| s.start <= pos);
            let covering = at
                .checked_sub(1)
                .map(|i| &self.sources[i])
                .filter(|s| s.end() > pos);

            let n = match covering {
                Some(source) => {
                    let from = (pos - source.start) as usize;
                    let n = wanted.min(source.values.len() - from);
                    target[filled..filled + n].clone_from_slice(&source.values[from..from + n]);
                    n
                }
                None => {
                    let gap_end = self.sources.get(at).map_or(end, |s| s.start.min(end));
                    let n = (gap_end - pos) as usize;
                    target[filled..filled + n].fill(self.fill.clone());
                    n
                }
            };
            filled += n;
        }

        self.position = end;
        Ok(())
    }
}

/// Virtual datasets are not chunked; the whole dataset is chunk 0.
impl<T: Clone> ReadStreamProvider<T> for VirtualStream<T> {
    fn resolve_read_stream(&mut self, chunk_index: u64) -> Result<SourceStream<'_, T>> {
        if chunk_index != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("virtual dataset has no chunk {chunk_index}"),
            )
            .into());
        }
        Ok(SourceStream::Virtual(self))
    }
}
