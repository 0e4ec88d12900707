//! StateSnapshotSync view
//!
//! Root table of a snapshot sync message. Fields are resolved on every call;
//! nothing is decoded up front.
//!
//! # Schema Reference
//!
//! ```text
//! table StateSnapshotSync {
//!     agent_pool:[Batch] (id: 0);
//!     message_pool:[Batch] (id: 1);
//!     current_step:int64 = 0 (id: 2);
//! }
//! root_type StateSnapshotSync;
//! ```

use crate::Result;
use crate::batch::{Batch, BatchVector};
use crate::flatbuf::root_position;
use crate::table::FlatTable;

/// Read-only view of a StateSnapshotSync buffer
///
/// # Example
///
/// ```ignore
/// let snapshot = StateSnapshotSync::root(&bytes)?;
///
/// for i in 0..snapshot.agent_pool_len()? {
///     let batch = snapshot.agent_pool(i)?.expect("agent_pool is present");
///     println!("{:?}", batch.batch_id()?);
/// }
/// println!("step {}", snapshot.current_step()?);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StateSnapshotSync<'a> {
    table: FlatTable<'a>,
}

impl<'a> StateSnapshotSync<'a> {
    pub const VT_AGENT_POOL: usize = 0;
    pub const VT_MESSAGE_POOL: usize = 1;
    pub const VT_CURRENT_STEP: usize = 2;

    /// Number of slots declared by the schema
    pub const NUM_FIELDS: usize = 3;

    /// Value of `current_step` when the field is absent
    pub const DEFAULT_CURRENT_STEP: i64 = 0;

    /// Open the snapshot whose root offset sits at the start of `buf`
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`](crate::ProtocolError::Truncated)
    /// if the buffer is shorter than the root offset or the root points
    /// outside it, and
    /// [`ProtocolError::MalformedVtable`](crate::ProtocolError::MalformedVtable)
    /// if the root table's vtable is inconsistent.
    pub fn root(buf: &'a [u8]) -> Result<Self> {
        Self::root_at(buf, 0)
    }

    /// Open the snapshot whose root offset sits at `offset`
    pub fn root_at(buf: &'a [u8], offset: usize) -> Result<Self> {
        let position = root_position(buf, offset)?;
        FlatTable::parse(buf, position).map(Self::from_table)
    }

    /// Wrap an already parsed table
    #[inline]
    pub fn from_table(table: FlatTable<'a>) -> Self {
        Self { table }
    }

    /// Hand off the underlying table
    #[inline]
    pub fn as_table(&self) -> FlatTable<'a> {
        self.table
    }

    /// Agent batch at `index`, or `None` if the field is absent
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::IndexOutOfBounds`](crate::ProtocolError::IndexOutOfBounds)
    /// if the field is present and `index >= agent_pool_len()`.
    pub fn agent_pool(&self, index: usize) -> Result<Option<Batch<'a>>> {
        self.pool_entry(Self::VT_AGENT_POOL, index)
    }

    /// Number of agent batches (0 if the field is absent)
    pub fn agent_pool_len(&self) -> Result<usize> {
        self.pool_len(Self::VT_AGENT_POOL)
    }

    /// Check if `agent_pool` was never written
    ///
    /// An explicitly empty pool is present: `is_none` is false and the
    /// length is 0.
    pub fn agent_pool_is_none(&self) -> Result<bool> {
        Ok(!self.table.has_field(Self::VT_AGENT_POOL)?)
    }

    /// The whole agent pool, or `None` if the field is absent
    pub fn agent_pools(&self) -> Result<Option<BatchVector<'a>>> {
        self.pool(Self::VT_AGENT_POOL)
    }

    /// Message batch at `index`, or `None` if the field is absent
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::IndexOutOfBounds`](crate::ProtocolError::IndexOutOfBounds)
    /// if the field is present and `index >= message_pool_len()`.
    pub fn message_pool(&self, index: usize) -> Result<Option<Batch<'a>>> {
        self.pool_entry(Self::VT_MESSAGE_POOL, index)
    }

    /// Number of message batches (0 if the field is absent)
    pub fn message_pool_len(&self) -> Result<usize> {
        self.pool_len(Self::VT_MESSAGE_POOL)
    }

    /// Check if `message_pool` was never written
    pub fn message_pool_is_none(&self) -> Result<bool> {
        Ok(!self.table.has_field(Self::VT_MESSAGE_POOL)?)
    }

    /// The whole message pool, or `None` if the field is absent
    pub fn message_pools(&self) -> Result<Option<BatchVector<'a>>> {
        self.pool(Self::VT_MESSAGE_POOL)
    }

    /// Simulation step this snapshot was taken at (0 if absent)
    pub fn current_step(&self) -> Result<i64> {
        self.table
            .read_i64(Self::VT_CURRENT_STEP, Self::DEFAULT_CURRENT_STEP)
    }

    fn pool(&self, slot: usize) -> Result<Option<BatchVector<'a>>> {
        Ok(self.table.read_vector(slot)?.map(BatchVector::new))
    }

    fn pool_len(&self, slot: usize) -> Result<usize> {
        Ok(self.pool(slot)?.map_or(0, |pool| pool.len()))
    }

    fn pool_entry(&self, slot: usize, index: usize) -> Result<Option<Batch<'a>>> {
        match self.pool(slot)? {
            Some(pool) => pool.get(index).map(Some),
            None => Ok(None),
        }
    }
}
