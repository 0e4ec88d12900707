//! High-level snapshot builder
//!
//! Collects the pools and step, then writes batches, pool vectors and the
//! root table in one pass.

use bytes::Bytes;
use statesync_protocol::{Metaversion, SnapshotFrame};
use tracing::debug;

use crate::batch::{BatchArgs, create_batch};
use crate::builder::{FlatBufferBuilder, Offset};
use crate::config::EncoderConfig;
use crate::error::Result;
use crate::snapshot::table::{StateSnapshotSyncArgs, create, create_batch_vector};

/// One batch in an agent or message pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchEntry {
    pub batch_id: Option<String>,
    pub metaversion: Option<Metaversion>,
}

impl BatchEntry {
    /// Create an entry with an id and no metaversion
    #[inline]
    #[must_use]
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: Some(batch_id.into()),
            metaversion: None,
        }
    }

    /// Set the metaversion
    #[inline]
    #[must_use]
    pub fn with_metaversion(mut self, metaversion: Metaversion) -> Self {
        self.metaversion = Some(metaversion);
        self
    }
}

impl From<&str> for BatchEntry {
    fn from(batch_id: &str) -> Self {
        Self::new(batch_id)
    }
}

impl From<String> for BatchEntry {
    fn from(batch_id: String) -> Self {
        Self::new(batch_id)
    }
}

/// Builder for complete StateSnapshotSync buffers
///
/// A pool that is never touched is left absent; call `empty_*_pool` to
/// write a present but empty pool instead.
///
/// # Example
///
/// ```
/// use statesync_client::{SnapshotBuilder, StateSnapshotSync};
///
/// let built = SnapshotBuilder::new()
///     .agent_batch("batch-a")
///     .agent_batch("batch-b")
///     .empty_message_pool()
///     .current_step(42)
///     .build()
///     .unwrap();
///
/// let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();
/// assert_eq!(snapshot.agent_pool_len().unwrap(), 2);
/// assert_eq!(snapshot.current_step().unwrap(), 42);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    agent_pool: Option<Vec<BatchEntry>>,
    message_pool: Option<Vec<BatchEntry>>,
    current_step: i64,
    config: EncoderConfig,
}

impl SnapshotBuilder {
    /// Create a builder with both pools absent and step 0
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch to the agent pool
    #[inline]
    #[must_use]
    pub fn agent_batch(mut self, entry: impl Into<BatchEntry>) -> Self {
        self.agent_pool
            .get_or_insert_with(Vec::new)
            .push(entry.into());
        self
    }

    /// Append a batch to the message pool
    #[inline]
    #[must_use]
    pub fn message_batch(mut self, entry: impl Into<BatchEntry>) -> Self {
        self.message_pool
            .get_or_insert_with(Vec::new)
            .push(entry.into());
        self
    }

    /// Mark the agent pool present even if no batch is added
    #[inline]
    #[must_use]
    pub fn empty_agent_pool(mut self) -> Self {
        self.agent_pool.get_or_insert_with(Vec::new);
        self
    }

    /// Mark the message pool present even if no batch is added
    #[inline]
    #[must_use]
    pub fn empty_message_pool(mut self) -> Self {
        self.message_pool.get_or_insert_with(Vec::new);
        self
    }

    /// Set the simulation step
    #[inline]
    #[must_use]
    pub fn current_step(mut self, step: i64) -> Self {
        self.current_step = step;
        self
    }

    /// Use a custom encoder configuration
    #[inline]
    #[must_use]
    pub fn config(mut self, config: EncoderConfig) -> Self {
        self.config = config;
        self
    }

    /// Write the snapshot
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::InvalidConfig`](crate::BuilderError::InvalidConfig)
    /// for an invalid configuration and
    /// [`BuilderError::BufferTooLarge`](crate::BuilderError::BufferTooLarge)
    /// if the snapshot exceeds `max_buffer_size`.
    pub fn build(self) -> Result<BuiltSnapshot> {
        let mut fbb = FlatBufferBuilder::with_config(self.config)?;

        let agent_pool = write_pool(&mut fbb, self.agent_pool.as_deref())?;
        let message_pool = write_pool(&mut fbb, self.message_pool.as_deref())?;
        let root = create(
            &mut fbb,
            &StateSnapshotSyncArgs {
                agent_pool,
                message_pool,
                current_step: self.current_step,
            },
        )?;
        fbb.finish(root)?;

        let bytes = fbb.into_bytes()?;
        debug!(
            size = bytes.len(),
            agents = self.agent_pool.as_ref().map_or(0, Vec::len),
            messages = self.message_pool.as_ref().map_or(0, Vec::len),
            step = self.current_step,
            "built snapshot"
        );
        Ok(BuiltSnapshot { bytes })
    }
}

/// Write each batch, then the vector pointing at them
fn write_pool(fbb: &mut FlatBufferBuilder, pool: Option<&[BatchEntry]>) -> Result<Option<Offset>> {
    let Some(entries) = pool else {
        return Ok(None);
    };
    let batches = entries
        .iter()
        .map(|entry| {
            create_batch(
                fbb,
                &BatchArgs {
                    batch_id: entry.batch_id.as_deref(),
                    metaversion: entry.metaversion,
                },
            )
        })
        .collect::<Result<Vec<_>>>()?;
    create_batch_vector(fbb, &batches).map(Some)
}

/// A finished snapshot buffer
#[derive(Debug, Clone)]
pub struct BuiltSnapshot {
    bytes: Bytes,
}

impl BuiltSnapshot {
    /// Get the raw bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convert to owned Bytes
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the buffer is empty (it never should be)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Open the buffer as a shareable frame without copying
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::Decode`](crate::BuilderError::Decode) if the
    /// root table cannot be located.
    pub fn into_frame(self) -> Result<SnapshotFrame> {
        Ok(SnapshotFrame::new(self.bytes)?)
    }
}

impl AsRef<[u8]> for BuiltSnapshot {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
