//! Regular chunk grid: N-D coordinates to chunk index and intra-chunk offset.
//!
//! A dataset of shape `dims` is tiled by chunks of shape `chunk_dims`. The
//! grid itself has `ceil(dims[i] / chunk_dims[i])` chunks along dimension `i`
//! (the *scaled* dimensions). Both chunk indices and offsets inside a chunk
//! are linearized row-major, last dimension fastest.

use crate::error::{Result, SlabError};

/// Row-major strides (suffix products) for `dims`.
///
/// `strides[i]` is the product of `dims[i + 1..]`.
pub fn row_major_strides(dims: &[u64]) -> Vec<u64> {
    let rank = dims.len();
    let mut strides = vec![1u64; rank];
    for i in (0..rank.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Linear row-major index of `coords` given precomputed `strides`.
#[inline]
pub fn linear_index(coords: &[u64], strides: &[u64]) -> u64 {
    coords.iter().zip(strides).map(|(&c, &s)| c * s).sum()
}

/// Pre-computed geometry of a regular chunk grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkGrid {
    chunk_dims: Vec<u64>,
    scaled_dims: Vec<u64>,
    chunk_strides: Vec<u64>,
    local_strides: Vec<u64>,
    chunk_len: u64,
}

impl ChunkGrid {
    /// Build the grid for a dataset of shape `dims` split into `chunk_dims`.
    pub fn new(dims: &[u64], chunk_dims: &[u64]) -> Result<Self> {
        if dims.len() != chunk_dims.len() {
            return Err(SlabError::RankMismatch {
                expected: dims.len(),
                got: chunk_dims.len(),
            });
        }
        if let Some(dim) = chunk_dims.iter().position(|&c| c == 0) {
            return Err(SlabError::ZeroChunkDimension { dim });
        }

        let scaled_dims: Vec<u64> = dims
            .iter()
            .zip(chunk_dims)
            .map(|(&d, &c)| d.div_ceil(c))
            .collect();

        Ok(Self {
            chunk_strides: row_major_strides(&scaled_dims),
            local_strides: row_major_strides(chunk_dims),
            chunk_len: chunk_dims.iter().product(),
            chunk_dims: chunk_dims.to_vec(),
            scaled_dims,
        })
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.chunk_dims.len()
    }

    pub fn chunk_dims(&self) -> &[u64] {
        &self.chunk_dims
    }

    /// Number of chunks along each dimension.
    pub fn scaled_dims(&self) -> &[u64] {
        &self.scaled_dims
    }

    /// Element capacity of one chunk.
    #[inline]
    pub fn chunk_element_count(&self) -> u64 {
        self.chunk_len
    }

    /// Total number of chunks in the grid.
    pub fn num_chunks(&self) -> u64 {
        self.scaled_dims.iter().product()
    }

    /// Linear chunk index of the chunk at grid position `scaled`.
    #[inline]
    pub fn chunk_index(&self, scaled: &[u64]) -> u64 {
        linear_index(scaled, &self.chunk_strides)
    }

    /// Grid position of the chunk with linear index `index`.
    pub fn chunk_coords(&self, index: u64) -> Vec<u64> {
        let mut remaining = index;
        self.chunk_strides
            .iter()
            .map(|&stride| {
                // zero stride: an empty trailing dimension, no chunks at all
                let c = remaining.checked_div(stride).unwrap_or(0);
                remaining = remaining.checked_rem(stride).unwrap_or(0);
                c
            })
            .collect()
    }

    /// Split dataset coordinates into grid position and chunk-local position.
    ///
    /// Writes into `scaled` and `local`; returns `true` if `scaled` differs
    /// from what it held before, i.e. the chunk index must be recomputed.
    #[inline]
    pub fn decompose(&self, coords: &[u64], scaled: &mut [u64], local: &mut [u64]) -> bool {
        let mut changed = false;
        for d in 0..self.chunk_dims.len() {
            let c = self.chunk_dims[d];
            let s = coords[d] / c;
            if scaled[d] != s {
                changed = true;
                scaled[d] = s;
            }
            local[d] = coords[d] % c;
        }
        changed
    }

    /// Linear element offset inside a chunk of the chunk-local position.
    #[inline]
    pub fn local_offset(&self, local: &[u64]) -> u64 {
        linear_index(local, &self.local_strides)
    }
}
