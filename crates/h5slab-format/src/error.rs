//! Error types for selection walking and chunked transfers.

use std::fmt;
use std::io;

use crate::stream::SeekOrigin;

/// Which side of a transfer a walker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The side data is copied from.
    Source,
    /// The side data is copied to.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Target => f.write_str("target"),
        }
    }
}

/// Errors raised while walking selections or transferring elements.
///
/// None of these are transient. A failed transfer leaves the target in an
/// undefined, partially written state.
#[derive(Debug, thiserror::Error)]
pub enum SlabError {
    /// A dims, chunk dims, selection or coordinate array has the wrong length.
    #[error("rank mismatch: expected {expected} dimensions, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Source and target selections cover a different number of elements.
    #[error("selection length mismatch: source selects {source_len} elements, target selects {target_len}")]
    SelectionLengthMismatch { source_len: u64, target_len: u64 },

    /// One walker ran dry while the other still had elements to move.
    #[error("the {0} walker stopped early")]
    WalkerUnderrun(Side),

    /// The stream does not implement the requested seek origin.
    #[error("seek origin {0:?} is not supported")]
    UnsupportedSeekOrigin(SeekOrigin),

    /// A chunk extent of zero makes the chunk grid undefined.
    #[error("chunk dimension {dim} has zero extent")]
    ZeroChunkDimension { dim: usize },

    /// Hyperslab parameters that HDF5 would reject.
    #[error("invalid hyperslab in dimension {dim}: {reason}")]
    InvalidHyperslab { dim: usize, reason: &'static str },

    /// A selected coordinate lies outside the dataset.
    #[error("selection exceeds dataset bounds in dimension {dim}: coordinate {coord} >= extent {extent}")]
    SelectionOutOfBounds { dim: usize, coord: u64, extent: u64 },

    /// A memory buffer is shorter than the region a step addresses.
    #[error("buffer too small: need {required} values, have {available}")]
    BufferTooSmall { required: u64, available: u64 },

    /// A decode target buffer is flat memory and cannot be split into chunks.
    #[error("decode target must be a single chunk: dims {dims:?}, chunk dims {chunk_dims:?}")]
    ChunkedDecodeTarget { dims: Vec<u64>, chunk_dims: Vec<u64> },

    /// `offset * type_size` does not fit in a 64-bit byte position.
    #[error("byte position overflow: element offset {offset} * type size {type_size}")]
    SeekOverflow { offset: u64, type_size: u64 },

    /// Transfer properties with values out of range.
    #[error("invalid transfer properties: {0}")]
    InvalidProps(String),

    /// Transfer properties could not be parsed.
    #[error(transparent)]
    Config(#[from] toml::de::Error),

    /// I/O error from a stream or provider.
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SlabError>;
