//! StateSnapshotSync table functions
//!
//! Build order for one snapshot:
//!
//! 1. Write every batch table ([`create_batch`](crate::batch::create_batch))
//! 2. Write each pool vector: `start_*_pool_vector(n)`, push the batch
//!    offsets last-to-first, `end_vector()`
//! 3. [`start`], add the fields, [`end`]
//! 4. [`FlatBufferBuilder::finish`] with the table offset
//!
//! ```text
//! table StateSnapshotSync {
//!     agent_pool:[Batch] (id: 0);
//!     message_pool:[Batch] (id: 1);
//!     current_step:int64 = 0 (id: 2);
//! }
//! ```

use statesync_protocol::StateSnapshotSync;

use crate::builder::{FlatBufferBuilder, Offset};
use crate::error::Result;

/// Field values for [`create`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateSnapshotSyncArgs {
    /// Finished `[Batch]` vector; absent when `None`
    pub agent_pool: Option<Offset>,
    /// Finished `[Batch]` vector; absent when `None`
    pub message_pool: Option<Offset>,
    pub current_step: i64,
}

/// Start a StateSnapshotSync table
#[inline]
pub fn start(fbb: &mut FlatBufferBuilder) -> Result<()> {
    fbb.start_table(StateSnapshotSync::NUM_FIELDS)
}

/// Start the agent pool vector of `num_elems` batches
#[inline]
pub fn start_agent_pool_vector(fbb: &mut FlatBufferBuilder, num_elems: usize) -> Result<()> {
    fbb.start_vector(num_elems)
}

/// Start the message pool vector of `num_elems` batches
#[inline]
pub fn start_message_pool_vector(fbb: &mut FlatBufferBuilder, num_elems: usize) -> Result<()> {
    fbb.start_vector(num_elems)
}

/// Set `agent_pool`; a null offset leaves it absent
#[inline]
pub fn add_agent_pool(fbb: &mut FlatBufferBuilder, agent_pool: Offset) -> Result<()> {
    fbb.push_slot_offset(StateSnapshotSync::VT_AGENT_POOL, agent_pool)
}

/// Set `message_pool`; a null offset leaves it absent
#[inline]
pub fn add_message_pool(fbb: &mut FlatBufferBuilder, message_pool: Offset) -> Result<()> {
    fbb.push_slot_offset(StateSnapshotSync::VT_MESSAGE_POOL, message_pool)
}

/// Set `current_step`; the default (0) is not written
#[inline]
pub fn add_current_step(fbb: &mut FlatBufferBuilder, current_step: i64) -> Result<()> {
    fbb.push_slot_i64(
        StateSnapshotSync::VT_CURRENT_STEP,
        current_step,
        StateSnapshotSync::DEFAULT_CURRENT_STEP,
    )
}

/// Finish the open StateSnapshotSync table
#[inline]
pub fn end(fbb: &mut FlatBufferBuilder) -> Result<Offset> {
    fbb.end_table()
}

/// Write a pool vector from batch offsets in index order
pub fn create_batch_vector(fbb: &mut FlatBufferBuilder, batches: &[Offset]) -> Result<Offset> {
    fbb.start_vector(batches.len())?;
    for &batch in batches.iter().rev() {
        fbb.push_offset_element(batch)?;
    }
    fbb.end_vector()
}

/// Write a complete StateSnapshotSync table from finished pool vectors
///
/// Fields are added largest first.
pub fn create(fbb: &mut FlatBufferBuilder, args: &StateSnapshotSyncArgs) -> Result<Offset> {
    start(fbb)?;
    add_current_step(fbb, args.current_step)?;
    if let Some(message_pool) = args.message_pool {
        add_message_pool(fbb, message_pool)?;
    }
    if let Some(agent_pool) = args.agent_pool {
        add_agent_pool(fbb, agent_pool)?;
    }
    end(fbb)
}
