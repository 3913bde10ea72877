//! Hyperslab and point selections and their coordinate-run traversal.
//!
//! A [`Selection`] describes which elements of a dataset take part in a
//! transfer. Walking a selection against the dataset shape yields [`Step`]s:
//! contiguous runs along the last (fastest varying) dimension, in row-major
//! order. Source and target elements are paired purely by position in that
//! order, so the traversal must stay deterministic.
//!
//! # Example
//!
//! ```
//! use h5slab_format::selection::Selection;
//!
//! // Rows 1..3, columns 0..4 of a 4x4 dataset
//! let sel = Selection::slice(&[1..3, 0..4]);
//! assert_eq!(sel.num_elements(&[4, 4]), 8);
//!
//! let runs: Vec<_> = sel.steps(&[4, 4]).unwrap().collect();
//! assert_eq!(runs.len(), 2);
//! assert_eq!(runs[0].coordinates, vec![1, 0]);
//! assert_eq!(runs[0].element_count, 4);
//! ```

use core::ops::Range;

use crate::error::{Result, SlabError};

/// A selection describing which elements of a dataset to access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Select all elements (equivalent to the entire dataspace).
    All,

    /// Select no elements.
    None,

    /// A regular hyperslab selection defined by start, stride, count, and block.
    ///
    /// For each dimension:
    /// - `start[d]`: first element index
    /// - `stride[d]`: step between blocks (must be >= block[d])
    /// - `count[d]`: number of blocks
    /// - `block[d]`: number of consecutive elements per block
    Hyperslab {
        start: Vec<u64>,
        stride: Vec<u64>,
        count: Vec<u64>,
        block: Vec<u64>,
    },

    /// Select individual points by coordinate, walked in list order.
    Points(Vec<Vec<u64>>),
}

/// The first element of a contiguous run and the run length along the last
/// dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub coordinates: Vec<u64>,
    pub element_count: u64,
}

impl Selection {
    /// Build a hyperslab, rejecting parameters HDF5 would refuse.
    pub fn hyperslab(start: &[u64], stride: &[u64], count: &[u64], block: &[u64]) -> Result<Self> {
        validate_hyperslab(start, stride, count, block)?;
        Ok(Selection::Hyperslab {
            start: start.to_vec(),
            stride: stride.to_vec(),
            count: count.to_vec(),
            block: block.to_vec(),
        })
    }

    /// Create a simple contiguous hyperslab from ranges (one per dimension).
    ///
    /// This is equivalent to a hyperslab with stride=1 and block=1.
    pub fn slice(ranges: &[Range<u64>]) -> Self {
        let rank = ranges.len();
        let mut start = Vec::with_capacity(rank);
        let mut count = Vec::with_capacity(rank);
        for r in ranges {
            start.push(r.start);
            count.push(r.end.saturating_sub(r.start));
        }
        Selection::Hyperslab {
            start,
            stride: vec![1; rank],
            count,
            block: vec![1; rank],
        }
    }

    /// Build a point selection; every point must have the same rank.
    pub fn points(points: Vec<Vec<u64>>) -> Result<Self> {
        if let Some(first) = points.first() {
            let rank = first.len();
            if let Some(bad) = points.iter().find(|p| p.len() != rank) {
                return Err(SlabError::RankMismatch {
                    expected: rank,
                    got: bad.len(),
                });
            }
        }
        Ok(Selection::Points(points))
    }

    /// Number of selected elements for a given dataspace shape.
    ///
    /// Saturates at `u64::MAX`. A selection that fits inside `dims` never
    /// saturates, so a saturated count always belongs to an out-of-bounds
    /// selection, which [`Selection::steps`] rejects.
    pub fn num_elements(&self, dims: &[u64]) -> u64 {
        match self {
            Selection::All => saturating_product(dims.iter().copied()),
            Selection::None => 0,
            Selection::Hyperslab { count, block, .. } => saturating_product(
                count.iter().zip(block).map(|(&c, &b)| c.saturating_mul(b)),
            ),
            Selection::Points(pts) => pts.len() as u64,
        }
    }

    /// The rank of this selection, if it fixes one.
    pub fn rank(&self) -> Option<usize> {
        match self {
            Selection::All | Selection::None => Option::None,
            Selection::Hyperslab { start, .. } => Some(start.len()),
            Selection::Points(pts) => pts.first().map(|p| p.len()),
        }
    }

    /// Walk the selection against the dataset shape `limits`.
    ///
    /// Fails if the selection rank differs from `limits.len()` or any selected
    /// element falls outside `limits`, so no yielded run crosses the dataset
    /// boundary.
    pub fn steps(&self, limits: &[u64]) -> Result<Steps<'_>> {
        if let Some(rank) = self.rank() {
            check_rank(rank, limits)?;
        }
        let inner = match self {
            Selection::None => StepsInner::Empty,
            Selection::All if limits.is_empty() => StepsInner::Scalar(true),
            Selection::All => StepsInner::Slab(SlabCursor::new(
                vec![0; limits.len()],
                limits.to_vec(),
                vec![1; limits.len()],
                limits.to_vec(),
            )),
            Selection::Hyperslab {
                start,
                stride,
                count,
                block,
            } => {
                validate_hyperslab(start, stride, count, block)?;
                if limits.is_empty() {
                    StepsInner::Scalar(true)
                } else {
                    check_hyperslab_bounds(start, stride, count, block, limits)?;
                    StepsInner::Slab(SlabCursor::new(
                        start.clone(),
                        stride.clone(),
                        count.clone(),
                        block.clone(),
                    ))
                }
            }
            Selection::Points(pts) => {
                for pt in pts {
                    check_rank(pt.len(), limits)?;
                    for (dim, (&coord, &extent)) in pt.iter().zip(limits).enumerate() {
                        if coord >= extent {
                            return Err(SlabError::SelectionOutOfBounds { dim, coord, extent });
                        }
                    }
                }
                StepsInner::Points(pts.iter())
            }
        };
        Ok(Steps { inner })
    }
}

/// Product that saturates instead of overflowing; zero wins over saturation.
fn saturating_product(factors: impl Iterator<Item = u64>) -> u64 {
    let mut product = 1u64;
    for f in factors {
        if f == 0 {
            return 0;
        }
        product = product.saturating_mul(f);
    }
    product
}

fn check_rank(rank: usize, limits: &[u64]) -> Result<()> {
    if rank != limits.len() {
        return Err(SlabError::RankMismatch {
            expected: limits.len(),
            got: rank,
        });
    }
    Ok(())
}

fn validate_hyperslab(start: &[u64], stride: &[u64], count: &[u64], block: &[u64]) -> Result<()> {
    let rank = start.len();
    for len in [stride.len(), count.len(), block.len()] {
        if len != rank {
            return Err(SlabError::RankMismatch {
                expected: rank,
                got: len,
            });
        }
    }
    for dim in 0..rank {
        if count[dim] > 1 {
            if stride[dim] == 0 {
                return Err(SlabError::InvalidHyperslab {
                    dim,
                    reason: "stride must be positive",
                });
            }
            if stride[dim] < block[dim] {
                return Err(SlabError::InvalidHyperslab {
                    dim,
                    reason: "blocks overlap (stride < block)",
                });
            }
        }
    }
    Ok(())
}

fn check_hyperslab_bounds(
    start: &[u64],
    stride: &[u64],
    count: &[u64],
    block: &[u64],
    limits: &[u64],
) -> Result<()> {
    for dim in 0..limits.len() {
        if count[dim] == 0 || block[dim] == 0 {
            continue;
        }
        // One past the last selected coordinate.
        let end = (count[dim] - 1)
            .checked_mul(stride[dim])
            .and_then(|v| v.checked_add(start[dim]))
            .and_then(|v| v.checked_add(block[dim]));
        match end {
            Some(end) if end <= limits[dim] => {}
            _ => {
                return Err(SlabError::SelectionOutOfBounds {
                    dim,
                    coord: end.map_or(u64::MAX, |e| e - 1),
                    extent: limits[dim],
                })
            }
        }
    }
    Ok(())
}

/// Lazy, forward-only iterator over the coordinate runs of a selection.
#[derive(Debug)]
pub struct Steps<'a> {
    inner: StepsInner<'a>,
}

#[derive(Debug)]
enum StepsInner<'a> {
    Empty,
    /// Rank-0 dataspace: one element with no coordinates.
    Scalar(bool),
    Points(core::slice::Iter<'a, Vec<u64>>),
    Slab(SlabCursor),
}

impl Iterator for Steps<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        match &mut self.inner {
            StepsInner::Empty => None,
            StepsInner::Scalar(pending) => {
                if !*pending {
                    return None;
                }
                *pending = false;
                Some(Step {
                    coordinates: Vec::new(),
                    element_count: 1,
                })
            }
            StepsInner::Points(iter) => iter.next().map(|pt| Step {
                coordinates: pt.clone(),
                element_count: 1,
            }),
            StepsInner::Slab(cursor) => cursor.next(),
        }
    }
}

/// Odometer over the blocks of a hyperslab.
///
/// Every dimension but the last tracks `(block index, offset in block)`; the
/// last dimension tracks only the block index, since a whole block (or, when
/// blocks are adjacent, the whole row of blocks) is a single run.
#[derive(Debug)]
struct SlabCursor {
    start: Vec<u64>,
    stride: Vec<u64>,
    count: Vec<u64>,
    block: Vec<u64>,
    outer: Vec<(u64, u64)>,
    last_block: u64,
    merged: bool,
    done: bool,
}

impl SlabCursor {
    fn new(start: Vec<u64>, stride: Vec<u64>, count: Vec<u64>, block: Vec<u64>) -> Self {
        let rank = start.len();
        let last = rank - 1;
        let done = count.iter().zip(&block).any(|(&c, &b)| c == 0 || b == 0);
        let merged = count[last] <= 1 || stride[last] == block[last];
        Self {
            outer: vec![(0, 0); last],
            last_block: 0,
            merged,
            done,
            start,
            stride,
            count,
            block,
        }
    }

    fn advance(&mut self) {
        let last = self.start.len() - 1;
        if !self.merged {
            self.last_block += 1;
            if self.last_block < self.count[last] {
                return;
            }
        }
        self.last_block = 0;

        for d in (0..last).rev() {
            let (b, k) = &mut self.outer[d];
            *k += 1;
            if *k < self.block[d] {
                return;
            }
            *k = 0;
            *b += 1;
            if *b < self.count[d] {
                return;
            }
            *b = 0;
        }
        self.done = true;
    }
}

impl Iterator for SlabCursor {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        if self.done {
            return None;
        }
        let last = self.start.len() - 1;
        let mut coordinates = Vec::with_capacity(last + 1);
        for (d, &(b, k)) in self.outer.iter().enumerate() {
            coordinates.push(self.start[d] + b * self.stride[d] + k);
        }
        coordinates.push(self.start[last] + self.last_block * self.stride[last]);

        let element_count = if self.merged {
            self.count[last] * self.block[last]
        } else {
            self.block[last]
        };

        self.advance();
        Some(Step {
            coordinates,
            element_count,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
