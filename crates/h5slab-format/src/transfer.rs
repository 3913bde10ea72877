//! Dual-walker transfer engine.
//!
//! [`encode`] and [`decode`] copy elements between a source region and a
//! target region that each have their own rank, shape, chunk layout and
//! selection. Both sides are walked independently and reconciled purely by
//! element count: the target walker drives, and source steps are pulled on
//! demand until the current target step is satisfied.
//!
//! Streams and buffers are resolved through the providers in
//! [`crate::stream`] and reused for as long as consecutive steps stay in the
//! same chunk.

use core::cmp::min;
use core::ops::Range;

use log::{debug, trace};

use crate::error::{Result, SlabError, Side};
use crate::props::TransferProps;
use crate::selection::Selection;
use crate::stream::{
    byte_position, seek_to, BufferProvider, ReadStream, ReadStreamProvider, SourceStream,
    WriteStream, WriteStreamProvider,
};
use crate::walker::{walk, RelativeStep, Walker};

/// Everything one read needs: chunked (possibly virtual) storage in, flat
/// memory out.
pub struct DecodeInfo<'a, P, D> {
    pub source_dims: &'a [u64],
    pub source_chunk_dims: &'a [u64],
    pub target_dims: &'a [u64],
    pub target_chunk_dims: &'a [u64],
    pub source_selection: &'a Selection,
    pub target_selection: &'a Selection,
    /// Resolves a source chunk index to its stream.
    pub source_streams: P,
    /// Decodes the leading elements of a stream into a target slice.
    pub decoder: D,
    /// Bytes per element in the source stream.
    pub source_type_size: usize,
    /// Target values per element.
    pub target_type_size_factor: usize,
    pub props: TransferProps,
}

/// Everything one write needs: memory in, chunked storage out.
pub struct EncodeInfo<'a, B, W, E> {
    pub source_dims: &'a [u64],
    pub source_chunk_dims: &'a [u64],
    pub target_dims: &'a [u64],
    pub target_chunk_dims: &'a [u64],
    pub source_selection: &'a Selection,
    pub target_selection: &'a Selection,
    /// Resolves a source chunk index to its element buffer.
    pub source_buffers: B,
    /// Resolves a target chunk index to its stream.
    pub target_streams: W,
    /// Encodes a slice of source values onto a stream.
    pub encoder: E,
    /// Source values per element.
    pub source_type_size_factor: usize,
    /// Bytes per element in the target stream.
    pub target_type_size: usize,
    pub props: TransferProps,
}

/// One side of a transfer as seen by the validation and walker setup.
struct Geometry<'a> {
    rank: usize,
    dims: &'a [u64],
    chunk_dims: &'a [u64],
    selection: &'a Selection,
}

impl<'a> Geometry<'a> {
    fn check_rank(&self) -> Result<()> {
        for len in [self.dims.len(), self.chunk_dims.len()] {
            if len != self.rank {
                return Err(SlabError::RankMismatch {
                    expected: self.rank,
                    got: len,
                });
            }
        }
        Ok(())
    }

    fn walker(&self, allow_bulk_copy: bool) -> Result<Walker<'a>> {
        walk(
            self.rank,
            self.dims,
            self.chunk_dims,
            self.selection,
            allow_bulk_copy,
        )
    }
}

/// Validate both sides before any provider is touched; returns the element
/// count.
fn validate(source: &Geometry<'_>, target: &Geometry<'_>) -> Result<u64> {
    let source_len = source.selection.num_elements(source.dims);
    let target_len = target.selection.num_elements(target.dims);
    if source_len != target_len {
        return Err(SlabError::SelectionLengthMismatch {
            source_len,
            target_len,
        });
    }
    source.check_rank()?;
    target.check_rank()?;
    Ok(source_len)
}

/// Value range `[offset, offset + length) * factor` inside a buffer of
/// `available` values.
fn value_range(offset: u64, length: u64, factor: usize, available: usize) -> Result<Range<usize>> {
    let factor = factor as u64;
    let bounds = offset
        .checked_add(length)
        .and_then(|end| end.checked_mul(factor))
        .map(|end| (offset * factor, end));

    match bounds {
        Some((start, end)) if end <= available as u64 => Ok(start as usize..end as usize),
        Some((_, end)) => Err(SlabError::BufferTooSmall {
            required: end,
            available: available as u64,
        }),
        None => Err(SlabError::BufferTooSmall {
            required: u64::MAX,
            available: available as u64,
        }),
    }
}

/// Next non-empty source step, or an underrun.
fn pull<S: Iterator<Item = RelativeStep>>(steps: &mut S) -> Result<RelativeStep> {
    match steps.next() {
        Some(step) if step.length > 0 => Ok(step),
        _ => Err(SlabError::WalkerUnderrun(Side::Source)),
    }
}

/// Element sizes of both sides: bytes on the stream side, values on the
/// memory side.
#[derive(Debug, Clone, Copy)]
struct Sizes {
    source: usize,
    target: usize,
    seek_step: i32,
}

/// Write the elements selected in memory into chunked storage.
pub fn encode<T, B, W, E>(
    source_rank: usize,
    target_rank: usize,
    info: EncodeInfo<'_, B, W, E>,
) -> Result<()>
where
    B: BufferProvider<T>,
    W: WriteStreamProvider,
    E: FnMut(&[T], &mut dyn WriteStream) -> Result<()>,
{
    let EncodeInfo {
        source_dims,
        source_chunk_dims,
        target_dims,
        target_chunk_dims,
        source_selection,
        target_selection,
        source_buffers,
        mut target_streams,
        mut encoder,
        source_type_size_factor,
        target_type_size,
        props,
    } = info;

    let source = Geometry {
        rank: source_rank,
        dims: source_dims,
        chunk_dims: source_chunk_dims,
        selection: source_selection,
    };
    let target = Geometry {
        rank: target_rank,
        dims: target_dims,
        chunk_dims: target_chunk_dims,
        selection: target_selection,
    };
    let total = validate(&source, &target)?;

    let source_walker = source.walker(props.allow_bulk_copy)?;
    let target_walker = target.walker(props.allow_bulk_copy)?;
    debug!(
        "encode {total} elements: source {source_dims:?}/{source_chunk_dims:?} (bulk: {}), target {target_dims:?}/{target_chunk_dims:?} (bulk: {})",
        source_walker.is_bulk_copy(),
        target_walker.is_bulk_copy(),
    );

    let sizes = Sizes {
        source: source_type_size_factor,
        target: target_type_size,
        seek_step: props.seek_step_i32(),
    };
    encode_steps(
        source_walker,
        target_walker,
        &source_buffers,
        &mut target_streams,
        &mut encoder,
        sizes,
    )
}

fn encode_steps<T, S, G, B, W, E>(
    mut source_steps: S,
    target_steps: G,
    source_buffers: &B,
    target_streams: &mut W,
    encoder: &mut E,
    sizes: Sizes,
) -> Result<()>
where
    S: Iterator<Item = RelativeStep>,
    G: Iterator<Item = RelativeStep>,
    B: BufferProvider<T>,
    W: WriteStreamProvider,
    E: FnMut(&[T], &mut dyn WriteStream) -> Result<()>,
{
    let mut target_stream: Option<&mut dyn WriteStream> = None;
    let mut last_target_chunk = 0u64;

    let mut source_buffer: Option<&[T]> = None;
    let mut last_source_chunk = 0u64;
    let mut current_source: &[T] = &[];
    let mut source_remaining = 0u64;

    for target_step in target_steps {
        if target_stream.is_none() || target_step.chunk_index != last_target_chunk {
            trace!("resolve target chunk {}", target_step.chunk_index);
            target_stream = Some(target_streams.resolve_write_stream(target_step.chunk_index)?);
            last_target_chunk = target_step.chunk_index;
        }
        let Some(stream) = target_stream.as_mut() else {
            return Err(SlabError::WalkerUnderrun(Side::Target));
        };

        let mut offset = target_step.offset;
        let mut remaining = target_step.length;

        while remaining > 0 {
            if source_remaining == 0 {
                let step = pull(&mut source_steps)?;

                let buffer = match source_buffer {
                    Some(buffer) if step.chunk_index == last_source_chunk => buffer,
                    _ => {
                        trace!("resolve source buffer {}", step.chunk_index);
                        let buffer = source_buffers.resolve_buffer(step.chunk_index)?;
                        source_buffer = Some(buffer);
                        last_source_chunk = step.chunk_index;
                        buffer
                    }
                };

                let range = value_range(step.offset, step.length, sizes.source, buffer.len())?;
                current_source = &buffer[range];
                source_remaining = step.length;
            }

            let length = min(remaining, source_remaining);
            let values = length as usize * sizes.source;
            let (head, tail) = current_source.split_at(values);

            seek_to(&mut **stream, byte_position(offset, sizes.target)?, sizes.seek_step)?;
            encoder(head, &mut **stream)?;

            current_source = tail;
            source_remaining -= length;
            offset += length;
            remaining -= length;
        }
    }

    if source_remaining > 0 || source_steps.next().is_some() {
        return Err(SlabError::WalkerUnderrun(Side::Target));
    }
    Ok(())
}

/// Read the elements selected in chunked storage into `target_buffer`.
///
/// `target_buffer` is the whole target dataset as one contiguous chunk, so the
/// target chunk dims must equal the target dims; target step offsets index the
/// buffer directly.
pub fn decode<T, P, D>(
    source_rank: usize,
    target_rank: usize,
    info: DecodeInfo<'_, P, D>,
    target_buffer: &mut [T],
) -> Result<()>
where
    P: ReadStreamProvider<T>,
    D: FnMut(&mut dyn ReadStream, &mut [T]) -> Result<()>,
{
    let DecodeInfo {
        source_dims,
        source_chunk_dims,
        target_dims,
        target_chunk_dims,
        source_selection,
        target_selection,
        mut source_streams,
        mut decoder,
        source_type_size,
        target_type_size_factor,
        props,
    } = info;

    let source = Geometry {
        rank: source_rank,
        dims: source_dims,
        chunk_dims: source_chunk_dims,
        selection: source_selection,
    };
    let target = Geometry {
        rank: target_rank,
        dims: target_dims,
        chunk_dims: target_chunk_dims,
        selection: target_selection,
    };
    let total = validate(&source, &target)?;
    if target_chunk_dims != target_dims {
        return Err(SlabError::ChunkedDecodeTarget {
            dims: target_dims.to_vec(),
            chunk_dims: target_chunk_dims.to_vec(),
        });
    }

    let source_walker = source.walker(props.allow_bulk_copy)?;
    let target_walker = target.walker(props.allow_bulk_copy)?;
    debug!(
        "decode {total} elements: source {source_dims:?}/{source_chunk_dims:?} (bulk: {}), target {target_dims:?}/{target_chunk_dims:?} (bulk: {})",
        source_walker.is_bulk_copy(),
        target_walker.is_bulk_copy(),
    );

    let sizes = Sizes {
        source: source_type_size,
        target: target_type_size_factor,
        seek_step: props.seek_step_i32(),
    };
    decode_steps(
        source_walker,
        target_walker,
        &mut source_streams,
        &mut decoder,
        sizes,
        target_buffer,
    )
}

fn decode_steps<T, S, G, P, D>(
    mut source_steps: S,
    target_steps: G,
    source_streams: &mut P,
    decoder: &mut D,
    sizes: Sizes,
    target_buffer: &mut [T],
) -> Result<()>
where
    S: Iterator<Item = RelativeStep>,
    G: Iterator<Item = RelativeStep>,
    P: ReadStreamProvider<T>,
    D: FnMut(&mut dyn ReadStream, &mut [T]) -> Result<()>,
{
    let mut source_stream: Option<SourceStream<'_, T>> = None;
    let mut last_source_chunk = 0u64;
    let mut source_offset = 0u64;
    let mut source_remaining = 0u64;

    for target_step in target_steps {
        let range = value_range(
            target_step.offset,
            target_step.length,
            sizes.target,
            target_buffer.len(),
        )?;
        let mut current_target = &mut target_buffer[range];
        let mut remaining = target_step.length;

        while remaining > 0 {
            if source_remaining == 0 {
                let step = pull(&mut source_steps)?;
                if source_stream.is_none() || step.chunk_index != last_source_chunk {
                    trace!("resolve source chunk {}", step.chunk_index);
                    source_stream = Some(source_streams.resolve_read_stream(step.chunk_index)?);
                    last_source_chunk = step.chunk_index;
                }
                source_offset = step.offset;
                source_remaining = step.length;
            }

            let length = min(remaining, source_remaining);
            let values = length as usize * sizes.target;
            let (head, tail) = core::mem::take(&mut current_target).split_at_mut(values);

            match source_stream.as_mut() {
                Some(SourceStream::Raw(stream)) => {
                    let position = byte_position(source_offset, sizes.source)?;
                    seek_to(&mut **stream, position, sizes.seek_step)?;
                    decoder(&mut **stream, head)?;
                }
                Some(SourceStream::Virtual(stream)) => {
                    seek_to(&mut **stream, source_offset, sizes.seek_step)?;
                    stream.read_virtual(head)?;
                }
                None => return Err(SlabError::WalkerUnderrun(Side::Source)),
            }

            current_target = tail;
            source_offset += length;
            source_remaining -= length;
            remaining -= length;
        }
    }

    if source_remaining > 0 || source_steps.next().is_some() {
        return Err(SlabError::WalkerUnderrun(Side::Target));
    }
    Ok(())
}
