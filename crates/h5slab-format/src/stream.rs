//! Stream and provider traits the transfer engine drives.
//!
//! The engine never opens, caches or closes storage itself. Chunk storage
//! layers implement the provider traits below and hand out streams or
//! buffers per chunk index; the engine only borrows them while it copies the
//! elements of consecutive steps that land in the same chunk.
//!
//! Seeks are bounded to the 32-bit signed range. Absolute byte positions of
//! large datasets do not fit in that range, so [`seek_to`] reaches them with a
//! sequence of bounded relative seeks.

use std::io;

use log::trace;

use crate::error::{Result, SlabError};

/// Reference point of a [`BoundedSeek::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

/// Seeking restricted to 32-bit signed offsets.
pub trait BoundedSeek {
    /// Move the stream position by `offset` relative to `origin`.
    ///
    /// Streams that do not implement an origin return
    /// [`SlabError::UnsupportedSeekOrigin`].
    fn seek(&mut self, offset: i32, origin: SeekOrigin) -> Result<()>;
}

/// A readable chunk stream.
pub trait ReadStream: BoundedSeek + io::Read {}

impl<S: BoundedSeek + io::Read + ?Sized> ReadStream for S {}

/// A writable chunk stream.
pub trait WriteStream: BoundedSeek + io::Write {}

impl<S: BoundedSeek + io::Write + ?Sized> WriteStream for S {}

/// A stream over a virtual dataset, whose elements are composited from other
/// datasets when read.
///
/// Positions on a virtual stream count elements, not bytes.
pub trait VirtualDatasetStream<T>: ReadStream {
    /// Fill `target` with the elements starting at the current position and
    /// advance past them.
    fn read_virtual(&mut self, target: &mut [T]) -> Result<()>;
}

/// What a read provider resolves a chunk index to.
pub enum SourceStream<'s, T> {
    /// Stored bytes, decoded by the element decoder.
    Raw(&'s mut dyn ReadStream),
    /// A composited view that reads its own elements.
    Virtual(&'s mut dyn VirtualDatasetStream<T>),
}

/// Resolves chunk indices to readable streams.
pub trait ReadStreamProvider<T> {
    fn resolve_read_stream(&mut self, chunk_index: u64) -> Result<SourceStream<'_, T>>;
}

/// Resolves chunk indices to writable streams.
pub trait WriteStreamProvider {
    fn resolve_write_stream(&mut self, chunk_index: u64) -> Result<&mut dyn WriteStream>;
}

/// Resolves chunk indices to in-memory element buffers.
pub trait BufferProvider<T> {
    fn resolve_buffer(&self, chunk_index: u64) -> Result<&[T]>;
}

impl<T, P: ReadStreamProvider<T> + ?Sized> ReadStreamProvider<T> for &mut P {
    fn resolve_read_stream(&mut self, chunk_index: u64) -> Result<SourceStream<'_, T>> {
        (**self).resolve_read_stream(chunk_index)
    }
}

impl<P: WriteStreamProvider + ?Sized> WriteStreamProvider for &mut P {
    fn resolve_write_stream(&mut self, chunk_index: u64) -> Result<&mut dyn WriteStream> {
        (**self).resolve_write_stream(chunk_index)
    }
}

impl<T, P: BufferProvider<T> + ?Sized> BufferProvider<T> for &P {
    fn resolve_buffer(&self, chunk_index: u64) -> Result<&[T]> {
        (**self).resolve_buffer(chunk_index)
    }
}

/// A flat slice is a single chunk; every index resolves to the whole slice.
impl<T> BufferProvider<T> for [T] {
    fn resolve_buffer(&self, _chunk_index: u64) -> Result<&[T]> {
        Ok(self)
    }
}

impl<T> BufferProvider<T> for Vec<T> {
    fn resolve_buffer(&self, _chunk_index: u64) -> Result<&[T]> {
        Ok(self.as_slice())
    }
}

/// Position `stream` at absolute `position` using only bounded seeks.
///
/// Rewinds to the start, then walks forward in relative steps of at most
/// `max_step`.
pub fn seek_to<S: BoundedSeek + ?Sized>(stream: &mut S, position: u64, max_step: i32) -> Result<()> {
    let max_step = max_step.max(1);
    stream.seek(0, SeekOrigin::Begin)?;

    let step = max_step as u64;
    let full_steps = position / step;
    if full_steps > 0 {
        trace!("seek to {position} in {full_steps} steps of {step}");
    }
    for _ in 0..full_steps {
        stream.seek(max_step, SeekOrigin::Current)?;
    }

    let remainder = (position % step) as i32;
    if remainder != 0 {
        stream.seek(remainder, SeekOrigin::Current)?;
    }
    Ok(())
}

/// Byte position of element `offset` for elements of `type_size` bytes.
pub fn byte_position(offset: u64, type_size: usize) -> Result<u64> {
    let type_size = type_size as u64;
    offset
        .checked_mul(type_size)
        .ok_or(SlabError::SeekOverflow { offset, type_size })
}
