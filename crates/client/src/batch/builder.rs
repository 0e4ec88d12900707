//! Batch table functions
//!
//! Thin wrappers over [`FlatBufferBuilder`] that know the `Batch` slots:
//!
//! ```text
//! table Batch {
//!     batch_id:string (id: 0);
//!     metaversion:Metaversion (id: 1);
//! }
//! ```

use statesync_protocol::{Batch, Metaversion};

use crate::builder::{FlatBufferBuilder, Offset};
use crate::error::Result;

/// Field values for [`create_batch`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchArgs<'s> {
    /// Identifier of the shared batch; absent when `None`
    pub batch_id: Option<&'s str>,
    /// Versions of the shared batch; absent when `None`
    pub metaversion: Option<Metaversion>,
}

/// Start a Batch table
#[inline]
pub fn start(fbb: &mut FlatBufferBuilder) -> Result<()> {
    fbb.start_table(Batch::NUM_FIELDS)
}

/// Set `batch_id` to a string created with
/// [`create_string`](FlatBufferBuilder::create_string)
#[inline]
pub fn add_batch_id(fbb: &mut FlatBufferBuilder, batch_id: Offset) -> Result<()> {
    fbb.push_slot_offset(Batch::VT_BATCH_ID, batch_id)
}

/// Set `metaversion` inline
#[inline]
pub fn add_metaversion(fbb: &mut FlatBufferBuilder, metaversion: Metaversion) -> Result<()> {
    fbb.push_slot_struct(
        Batch::VT_METAVERSION,
        &metaversion.to_le_bytes(),
        Metaversion::ALIGN,
    )
}

/// Finish the open Batch table
#[inline]
pub fn end(fbb: &mut FlatBufferBuilder) -> Result<Offset> {
    fbb.end_table()
}

/// Write a complete Batch table, including its id string
///
/// # Example
///
/// ```
/// use statesync_client::batch::{create_batch, BatchArgs};
/// use statesync_client::{FlatBufferBuilder, Metaversion};
///
/// let mut fbb = FlatBufferBuilder::new();
/// let batch = create_batch(
///     &mut fbb,
///     &BatchArgs {
///         batch_id: Some("agents-0"),
///         metaversion: Some(Metaversion::new(1, 4)),
///     },
/// )
/// .unwrap();
/// assert!(!batch.is_null());
/// ```
pub fn create_batch(fbb: &mut FlatBufferBuilder, args: &BatchArgs<'_>) -> Result<Offset> {
    let batch_id = match args.batch_id {
        Some(id) => fbb.create_string(id)?,
        None => Offset::NULL,
    };

    start(fbb)?;
    if let Some(metaversion) = args.metaversion {
        add_metaversion(fbb, metaversion)?;
    }
    add_batch_id(fbb, batch_id)?;
    end(fbb)
}
