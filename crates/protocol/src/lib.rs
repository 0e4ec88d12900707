//! StateSnapshotSync Protocol - zero-copy reader for snapshot sync buffers
//!
//! Simulation workers exchange their state at a given step as a single
//! FlatBuffer: two pools of batches (agents and in-flight messages) plus the
//! step counter. This crate reads that wire format directly, without code
//! generation:
//!
//! - `StateSnapshotSync` - root view with per-field accessors
//! - `Batch` / `BatchVector` - nested batch tables reached from the pools
//! - `FlatTable` / `TableVector` - schema-less table access for hand-off
//! - `SnapshotFrame` - owned, shareable `Bytes` buffer with a validated root
//!
//! # Design Principles
//!
//! - **Zero-copy**: views hold `(&[u8], position)` and borrow from the buffer
//! - **Lazy**: every accessor resolves its field through the vtable on demand
//! - **Bounds-checked**: malformed buffers return `ProtocolError`, never
//!   out-of-range reads
//! - **Thread-safe reads**: views never mutate and are `Send + Sync + Copy`
//!
//! The writer side lives in `statesync-client`.

mod batch;
mod error;
mod flatbuf;
mod frame;
mod snapshot;
mod table;

pub use batch::{Batch, BatchVector, BatchVectorIter, Metaversion};
pub use error::ProtocolError;
pub use flatbuf::{SIZE_SOFFSET, SIZE_UOFFSET, SIZE_VOFFSET, VTABLE_HEADER_SIZE, root_position};
pub use frame::SnapshotFrame;
pub use snapshot::StateSnapshotSync;
pub use table::{FlatTable, TableVector, TableVectorIter};

// Re-export bytes for convenience
pub use bytes::Bytes;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Largest buffer a u32 uoffset can address without the signed vtable
/// offset overflowing
pub const MAX_BUFFER_SIZE: usize = i32::MAX as usize;

#[cfg(test)]
mod test_wire;
