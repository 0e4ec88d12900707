//! Batch module - nested batch tables
//!
//! Writes the `Batch` tables that the snapshot pools refer to. Each batch
//! must be finished before the pool vector holding it is started.

mod builder;


pub use builder::{BatchArgs, add_batch_id, add_metaversion, create_batch, end, start};
