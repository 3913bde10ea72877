//! Decomposition of a selection into chunk-local contiguous runs.
//!
//! [`walk`] turns the coordinate runs of a [`Selection`] into
//! [`RelativeStep`]s: runs that never cross a chunk boundary, addressed by
//! chunk index and linear offset inside the chunk.

use core::cmp::min;

use log::trace;

use crate::chunk_grid::ChunkGrid;
use crate::error::{Result, SlabError};
use crate::selection::{Selection, Steps};

/// A run of `length` elements starting at linear `offset` inside chunk
/// `chunk_index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RelativeStep {
    pub chunk_index: u64,
    pub offset: u64,
    pub length: u64,
}

/// Walk `selection` over a dataset of shape `dims` stored in chunks of
/// `chunk_dims`.
///
/// The walker is empty when the selection covers no elements. With
/// `allow_bulk_copy`, a selection covering the whole of a single-chunk dataset
/// gap-free collapses into one step.
pub fn walk<'a>(
    rank: usize,
    dims: &[u64],
    chunk_dims: &[u64],
    selection: &'a Selection,
    allow_bulk_copy: bool,
) -> Result<Walker<'a>> {
    let total = selection.num_elements(dims);
    if total == 0 {
        return Ok(Walker {
            state: WalkState::Done,
        });
    }

    for len in [dims.len(), chunk_dims.len()] {
        if len != rank {
            return Err(SlabError::RankMismatch {
                expected: rank,
                got: len,
            });
        }
    }

    if rank == 0 || (allow_bulk_copy && can_bulk_copy(dims, chunk_dims, selection)) {
        trace!("bulk copy of {total} elements");
        return Ok(Walker {
            state: WalkState::Bulk(total),
        });
    }

    let grid = ChunkGrid::new(dims, chunk_dims)?;
    let steps = selection.steps(dims)?;

    Ok(Walker {
        state: WalkState::Chunked(ChunkedWalk {
            grid,
            steps,
            coords: Vec::new(),
            remaining: 0,
            scaled: vec![0; rank],
            local: vec![0; rank],
            chunk_index: 0,
        }),
    })
}

/// Single chunk (or contiguous storage) fully covered without gaps.
fn can_bulk_copy(dims: &[u64], chunk_dims: &[u64], selection: &Selection) -> bool {
    if chunk_dims != dims {
        return false;
    }
    match selection {
        Selection::All => true,
        Selection::Hyperslab {
            start,
            stride,
            count,
            block,
        } => {
            start.len() == dims.len()
                && count.len() == dims.len()
                && start.iter().all(|&s| s == 0)
                && stride == block
                && block
                    .iter()
                    .zip(count)
                    .zip(dims)
                    .all(|((&b, &c), &d)| b.checked_mul(c) == Some(d))
        }
        Selection::None | Selection::Points(_) => false,
    }
}

/// Lazy iterator of [`RelativeStep`]s produced by [`walk`].
#[derive(Debug)]
pub struct Walker<'a> {
    state: WalkState<'a>,
}

#[derive(Debug)]
enum WalkState<'a> {
    Done,
    Bulk(u64),
    Chunked(ChunkedWalk<'a>),
}

#[derive(Debug)]
struct ChunkedWalk<'a> {
    grid: ChunkGrid,
    steps: Steps<'a>,
    /// Start of the unconsumed part of the current run.
    coords: Vec<u64>,
    remaining: u64,
    scaled: Vec<u64>,
    local: Vec<u64>,
    chunk_index: u64,
}

impl Walker<'_> {
    /// Whether this walker took the single-step bulk copy path.
    pub fn is_bulk_copy(&self) -> bool {
        matches!(self.state, WalkState::Bulk(_))
    }
}

impl Iterator for Walker<'_> {
    type Item = RelativeStep;

    fn next(&mut self) -> Option<RelativeStep> {
        match &mut self.state {
            WalkState::Done => None,
            WalkState::Bulk(total) => {
                let length = *total;
                self.state = WalkState::Done;
                Some(RelativeStep {
                    chunk_index: 0,
                    offset: 0,
                    length,
                })
            }
            WalkState::Chunked(walk) => walk.next(),
        }
    }
}

impl ChunkedWalk<'_> {
    fn next(&mut self) -> Option<RelativeStep> {
        while self.remaining == 0 {
            let step = self.steps.next()?;
            self.coords = step.coordinates;
            self.remaining = step.element_count;
        }

        if self
            .grid
            .decompose(&self.coords, &mut self.scaled, &mut self.local)
        {
            self.chunk_index = self.grid.chunk_index(&self.scaled);
        }

        let last = self.coords.len() - 1;
        let offset = self.grid.local_offset(&self.local);
        let length = min(
            self.grid.chunk_dims()[last] - self.local[last],
            self.remaining,
        );

        self.remaining -= length;
        self.coords[last] += length;

        Some(RelativeStep {
            chunk_index: self.chunk_index,
            offset,
            length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(dims: &[u64], chunk_dims: &[u64], sel: &Selection, bulk: bool) -> Vec<RelativeStep> {
        walk(dims.len(), dims, chunk_dims, sel, bulk).unwrap().collect()
    }

    fn step(chunk_index: u64, offset: u64, length: u64) -> RelativeStep {
        RelativeStep {
            chunk_index,
            offset,
            length,
        }
    }

    #[test]
    fn empty_selection_walks_nothing() {
        let sel = Selection::slice(&[0..0, 0..4]);
        assert!(collect(&[4, 4], &[2, 2], &sel, true).is_empty());
        assert!(collect(&[4, 4], &[2, 2], &Selection::None, true).is_empty());
    }

    #[test]
    fn empty_selection_skips_rank_check() {
        let walker = walk(3, &[4, 4], &[2, 2], &Selection::None, false).unwrap();
        assert_eq!(walker.count(), 0);
    }

    #[test]
    fn rank_mismatch() {
        let sel = Selection::All;
        assert!(matches!(
            walk(2, &[4, 4], &[2], &sel, false).unwrap_err(),
            SlabError::RankMismatch { expected: 2, got: 1 }
        ));
        assert!(matches!(
            walk(3, &[4, 4], &[2, 2], &sel, false).unwrap_err(),
            SlabError::RankMismatch { expected: 3, got: 2 }
        ));
    }

    #[test]
    fn single_chunk_all_is_bulk() {
        let walker = walk(1, &[6], &[6], &Selection::All, true).unwrap();
        assert!(walker.is_bulk_copy());
        assert_eq!(walker.collect::<Vec<_>>(), vec![step(0, 0, 6)]);
    }

    #[test]
    fn full_gap_free_hyperslab_is_bulk() {
        let sel = Selection::hyperslab(&[0, 0], &[2, 5], &[3, 1], &[2, 5]).unwrap();
        let walker = walk(2, &[6, 5], &[6, 5], &sel, true).unwrap();
        assert!(walker.is_bulk_copy());
        assert_eq!(walker.collect::<Vec<_>>(), vec![step(0, 0, 30)]);
    }

    #[test]
    fn bulk_copy_needs_full_coverage() {
        let sel = Selection::slice(&[0..3, 0..4]);
        let walker = walk(2, &[4, 4], &[4, 4], &sel, true).unwrap();
        assert!(!walker.is_bulk_copy());
        assert_eq!(walker.collect::<Vec<_>>(), vec![step(0, 0, 4), step(0, 4, 4), step(0, 8, 4)]);
    }

    #[test]
    fn bulk_copy_disabled_walks_rows() {
        let walker = walk(2, &[2, 3], &[2, 3], &Selection::All, false).unwrap();
        assert!(!walker.is_bulk_copy());
        assert_eq!(walker.collect::<Vec<_>>(), vec![step(0, 0, 3), step(0, 3, 3)]);
    }

    #[test]
    fn scalar_dataset_is_one_step() {
        assert_eq!(collect(&[], &[], &Selection::All, false), vec![step(0, 0, 1)]);
    }

    #[test]
    fn sub_block_straddling_four_chunks() {
        // rows 1..3, columns 1..3 of a 4x4 dataset in 2x2 chunks
        let sel = Selection::hyperslab(&[1, 1], &[2, 2], &[1, 1], &[2, 2]).unwrap();
        assert_eq!(
            collect(&[4, 4], &[2, 2], &sel, true),
            vec![step(0, 3, 1), step(1, 2, 1), step(2, 1, 1), step(3, 0, 1)]
        );
    }

    #[test]
    fn sub_block_inside_one_chunk_column() {
        // rows 1..3, columns 0..2: one run of two per chunk crossed
        let sel = Selection::hyperslab(&[1, 0], &[2, 2], &[1, 1], &[2, 2]).unwrap();
        assert_eq!(
            collect(&[4, 4], &[2, 2], &sel, true),
            vec![step(0, 2, 2), step(2, 0, 2)]
        );
    }

    #[test]
    fn runs_split_at_chunk_boundaries() {
        let sel = Selection::slice(&[2..12]);
        assert_eq!(
            collect(&[12], &[4], &sel, true),
            vec![step(0, 2, 2), step(1, 0, 4), step(2, 0, 4)]
        );
    }

    #[test]
    fn partial_edge_chunks() {
        // 5x5 in 2x2 chunks: the grid is 3x3 and edge chunks are partial
        let steps = collect(&[5, 5], &[2, 2], &Selection::All, true);
        assert_eq!(steps.iter().map(|s| s.length).sum::<u64>(), 25);
        assert_eq!(&steps[..3], &[step(0, 0, 2), step(1, 0, 2), step(2, 0, 1)]);
        assert_eq!(steps.last(), Some(&step(8, 0, 1)));
    }

    #[test]
    fn point_steps_are_single_elements() {
        let sel = Selection::points(vec![vec![3, 3], vec![0, 1]]).unwrap();
        assert_eq!(
            collect(&[4, 4], &[2, 2], &sel, true),
            vec![step(3, 3, 1), step(0, 1, 1)]
        );
    }

    #[test]
    fn steps_stay_inside_their_chunk() {
        let dims = [7, 9, 10];
        let chunk_dims = [3, 4, 3];
        let sel = Selection::hyperslab(&[1, 0, 1], &[3, 2, 4], &[2, 4, 2], &[2, 1, 3]).unwrap();
        let grid = ChunkGrid::new(&dims, &chunk_dims).unwrap();
        let steps = collect(&dims, &chunk_dims, &sel, true);

        assert_eq!(steps.iter().map(|s| s.length).sum::<u64>(), sel.num_elements(&dims));
        for s in &steps {
            assert!(s.length > 0);
            assert!(s.offset + s.length <= grid.chunk_element_count());
            assert!(s.chunk_index < grid.num_chunks());
        }
    }

    #[test]
    fn huge_hyperslab_is_out_of_bounds() {
        let sel = Selection::hyperslab(&[0], &[u64::MAX], &[u64::MAX], &[u64::MAX]).unwrap();
        assert!(matches!(
            walk(1, &[10], &[5], &sel, false).unwrap_err(),
            SlabError::SelectionOutOfBounds { dim: 0, extent: 10, .. }
        ));
        // single-chunk layout goes through the bulk check first
        assert!(matches!(
            walk(1, &[10], &[10], &sel, true).unwrap_err(),
            SlabError::SelectionOutOfBounds { dim: 0, .. }
        ));
    }

    #[test]
    fn zero_chunk_extent_rejected() {
        let sel = Selection::All;
        assert!(matches!(
            walk(2, &[4, 4], &[0, 4], &sel, false).unwrap_err(),
            SlabError::ZeroChunkDimension { dim: 0 }
        ));
    }
}
