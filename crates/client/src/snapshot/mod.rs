//! Snapshot module - root StateSnapshotSync table
//!
//! Two levels of API:
//!
//! - [`table`] functions drive a [`FlatBufferBuilder`](crate::FlatBufferBuilder)
//!   slot by slot, in the order the wire format requires
//! - [`SnapshotBuilder`] owns the whole sequence and returns the finished
//!   [`BuiltSnapshot`]

mod builder;
pub mod table;

#[cfg(test)]
mod builder_test;

pub use builder::{BatchEntry, BuiltSnapshot, SnapshotBuilder};
pub use table::{
    StateSnapshotSyncArgs, add_agent_pool, add_current_step, add_message_pool, create,
    create_batch_vector, end, start, start_agent_pool_vector, start_message_pool_vector,
};
