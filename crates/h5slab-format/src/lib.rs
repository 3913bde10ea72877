//! Selection-to-chunk mapping and transfer engine for chunked HDF5-style
//! datasets.
//!
//! A [`Selection`] over an N-dimensional dataset is walked into
//! chunk-local contiguous runs ([`RelativeStep`]s), and [`encode`]/[`decode`]
//! drive two such walkers in lockstep to move elements between chunked
//! storage and flat memory, regardless of rank or chunk layout on either
//! side.

pub mod chunk_grid;
pub mod error;
pub mod props;
pub mod selection;
pub mod stream;
pub mod transfer;
pub mod walker;

pub use error::{Result, Side, SlabError};
pub use props::TransferProps;
pub use selection::{Selection, Step};
pub use transfer::{decode, encode, DecodeInfo, EncodeInfo};
pub use walker::{walk, RelativeStep};
