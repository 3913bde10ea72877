//! Storage collaborators for the h5slab transfer engine.
//!
//! Provides stream and provider implementations over memory buffers, files
//! and virtual datasets, plus little-endian element codecs for the numeric
//! types.

pub mod codec;
pub mod file;
pub mod memory;
pub mod virtual_stream;

pub use h5slab_format;

pub use codec::{decoder, encoder, ScalarCodec};
pub use file::FileStream;
pub use memory::{MemoryChunkStore, MemoryStream};
pub use virtual_stream::{VirtualSource, VirtualStream};
