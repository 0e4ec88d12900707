//! StateSnapshotSync Client Library
//!
//! This crate writes StateSnapshotSync FlatBuffers, the messages simulation
//! workers use to exchange their agent and message pools at a given step.
//! Buffers are read back with `statesync-protocol`.
//!
//! # Architecture
//!
//! - [`FlatBufferBuilder`] - back-to-front byte builder with an explicit
//!   table/vector state machine
//! - [`batch`] - nested `Batch` tables referenced from the pools
//! - [`snapshot`] - the root table, as slot functions and as the
//!   [`SnapshotBuilder`] convenience
//! - [`EncoderConfig`] - buffer sizing and encoding switches, from TOML
//!
//! # Quick Start
//!
//! ```
//! use statesync_client::{BatchEntry, Metaversion, SnapshotBuilder};
//!
//! let frame = SnapshotBuilder::new()
//!     .agent_batch(BatchEntry::new("agents-0").with_metaversion(Metaversion::new(1, 3)))
//!     .agent_batch("agents-1")
//!     .empty_message_pool()
//!     .current_step(42)
//!     .build()
//!     .unwrap()
//!     .into_frame()
//!     .unwrap();
//!
//! let view = frame.view();
//! assert_eq!(view.agent_pool_len().unwrap(), 2);
//! assert!(!view.message_pool_is_none().unwrap());
//! assert_eq!(view.current_step().unwrap(), 42);
//! ```
//!
//! # Slot-level building
//!
//! ```
//! use statesync_client::batch::{BatchArgs, create_batch};
//! use statesync_client::snapshot;
//! use statesync_client::FlatBufferBuilder;
//!
//! let mut fbb = FlatBufferBuilder::new();
//! let args = BatchArgs {
//!     batch_id: Some("a"),
//!     metaversion: None,
//! };
//! let batch = create_batch(&mut fbb, &args).unwrap();
//!
//! snapshot::start_agent_pool_vector(&mut fbb, 1).unwrap();
//! fbb.push_offset_element(batch).unwrap();
//! let agents = fbb.end_vector().unwrap();
//!
//! snapshot::start(&mut fbb).unwrap();
//! snapshot::add_agent_pool(&mut fbb, agents).unwrap();
//! snapshot::add_current_step(&mut fbb, 7).unwrap();
//! let root = snapshot::end(&mut fbb).unwrap();
//! fbb.finish(root).unwrap();
//! ```

mod builder;
mod config;
mod error;

pub mod batch;
pub mod snapshot;


pub use builder::{FlatBufferBuilder, Offset};
pub use config::{DEFAULT_INITIAL_CAPACITY, EncoderConfig};
pub use error::{BuilderError, Result};
pub use snapshot::{BatchEntry, BuiltSnapshot, SnapshotBuilder, StateSnapshotSyncArgs};

// Re-export protocol types
pub use statesync_protocol::{Metaversion, SnapshotFrame, StateSnapshotSync};
