//! Batch table view
//!
//! A batch is a nested table referenced from the snapshot pools. The
//! snapshot only locates it and hands it off; its own layout belongs to the
//! simulation engine.
//!
//! # Schema Reference
//!
//! ```text
//! struct Metaversion {
//!     memory:uint32;
//!     batch:uint32;
//! }
//!
//! table Batch {
//!     batch_id:string (id: 0);
//!     metaversion:Metaversion (id: 1);
//! }
//! ```

use crate::Result;
use crate::table::{FlatTable, TableVector, TableVectorIter};

/// Memory and batch versions of a shared batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Metaversion {
    /// Incremented when the batch's memory segment is reallocated
    pub memory: u32,
    /// Incremented when the batch contents change
    pub batch: u32,
}

impl Metaversion {
    /// Inline size of the struct in bytes
    pub const SIZE: usize = 8;

    /// Required alignment of the struct
    pub const ALIGN: usize = 4;

    #[inline]
    pub const fn new(memory: u32, batch: u32) -> Self {
        Self { memory, batch }
    }

    /// Encode as the inline struct layout (`memory` first)
    #[inline]
    pub fn to_le_bytes(self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..4].copy_from_slice(&self.memory.to_le_bytes());
        out[4..].copy_from_slice(&self.batch.to_le_bytes());
        out
    }

    /// Decode from the inline struct layout
    #[inline]
    pub fn from_le_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            memory: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            batch: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// Read-only view of a Batch table
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    table: FlatTable<'a>,
}

impl<'a> Batch<'a> {
    pub const VT_BATCH_ID: usize = 0;
    pub const VT_METAVERSION: usize = 1;

    /// Number of slots declared by the schema
    pub const NUM_FIELDS: usize = 2;

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

    /// Absolute position of the batch table in the buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.table.position()
    }

    /// Batch identifier, if present
    pub fn batch_id(&self) -> Result<Option<&'a str>> {
        self.table.read_string(Self::VT_BATCH_ID)
    }

    /// Batch versions, if present
    pub fn metaversion(&self) -> Result<Option<Metaversion>> {
        let table = &self.table;
        let Some(bytes) = table.read_inline(Self::VT_METAVERSION, Metaversion::SIZE)? else {
            return Ok(None);
        };
        let mut raw = [0u8; Metaversion::SIZE];
        raw.copy_from_slice(bytes);
        Ok(Some(Metaversion::from_le_bytes(raw)))
    }
}

/// Vector of uoffsets to Batch tables
#[derive(Debug, Clone, Copy)]
pub struct BatchVector<'a> {
    inner: TableVector<'a>,
}

impl<'a> BatchVector<'a> {
    #[inline]
    pub(crate) fn new(inner: TableVector<'a>) -> Self {
        Self { inner }
    }

    /// Number of batches
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the vector holds no batches
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Resolve batch `index`
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::IndexOutOfBounds`](crate::ProtocolError::IndexOutOfBounds)
    /// if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<Batch<'a>> {
        self.inner.get(index).map(Batch::from_table)
    }

    /// Iterate over the batches in order
    pub fn iter(&self) -> BatchVectorIter<'a> {
        BatchVectorIter {
            inner: self.inner.iter(),
        }
    }
}

impl<'a> IntoIterator for BatchVector<'a> {
    type Item = Result<Batch<'a>>;
    type IntoIter = BatchVectorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the batches of a [`BatchVector`]
#[derive(Debug, Clone)]
pub struct BatchVectorIter<'a> {
    inner: TableVectorIter<'a>,
}

impl<'a> Iterator for BatchVectorIter<'a> {
    type Item = Result<Batch<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|table| table.map(Batch::from_table))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for BatchVectorIter<'_> {}
