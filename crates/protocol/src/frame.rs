//! Owned snapshot frame
//!
//! A finished snapshot buffer held in reference-counted `Bytes`, with the
//! root table validated once. Cloning is O(1) and clones share the same
//! memory, so one frame can be handed to many reader threads or to a
//! transport without copying.

use bytes::Bytes;

use crate::Result;
use crate::flatbuf::root_position;
use crate::snapshot::StateSnapshotSync;
use crate::table::{FlatTable, TableLayout};

/// Immutable snapshot buffer with a pre-validated root
#[derive(Debug, Clone)]
pub struct SnapshotFrame {
    bytes: Bytes,
    root: TableLayout,
}

impl SnapshotFrame {
    /// Wrap a finished buffer, validating its root table
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`StateSnapshotSync::root`].
    pub fn new(bytes: Bytes) -> Result<Self> {
        let position = root_position(&bytes, 0)?;
        let root = FlatTable::parse(&bytes, position)?.layout();
        Ok(Self { bytes, root })
    }

    /// Copy a borrowed buffer into a new frame
    pub fn copy_from_slice(buf: &[u8]) -> Result<Self> {
        Self::new(Bytes::copy_from_slice(buf))
    }

    /// View the snapshot without re-validating the root
    #[inline]
    pub fn view(&self) -> StateSnapshotSync<'_> {
        StateSnapshotSync::from_table(FlatTable::with_layout(&self.bytes, self.root))
    }

    /// Get the raw bytes of the frame
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convert to owned Bytes
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Length of the frame in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the frame is empty (a valid frame never is)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for SnapshotFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<Vec<u8>> for SnapshotFrame {
    type Error = crate::ProtocolError;

    fn try_from(buf: Vec<u8>) -> Result<Self> {
        Self::new(Bytes::from(buf))
    }
}
