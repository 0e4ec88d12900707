//! Protocol error types
//!
//! Errors raised while resolving fields in a StateSnapshotSync buffer.
//! An absent optional field is never an error: accessors return `None`
//! or the declared default instead.

use thiserror::Error;

/// Errors that can occur while reading a snapshot buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A read position or length falls outside the backing buffer
    #[error("truncated buffer: need {needed} bytes at position {position}, buffer has {len}")]
    Truncated {
        position: usize,
        needed: usize,
        len: usize,
    },

    /// The vtable of a table is inconsistent with the buffer or the table
    #[error("malformed vtable at position {position}: {reason}")]
    MalformedVtable {
        position: usize,
        reason: &'static str,
    },

    /// Vector element index is not below the vector length
    #[error("index {index} out of bounds for vector of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// String field does not hold valid UTF-8
    #[error("invalid UTF-8 string at position {position}")]
    InvalidUtf8 { position: usize },
}

impl ProtocolError {
    /// Create a truncated buffer error
    #[inline]
    pub fn truncated(position: usize, needed: usize, len: usize) -> Self {
        Self::Truncated {
            position,
            needed,
            len,
        }
    }

    /// Create a malformed vtable error
    #[inline]
    pub fn malformed_vtable(position: usize, reason: &'static str) -> Self {
        Self::MalformedVtable { position, reason }
    }

    /// Create an index out of bounds error
    #[inline]
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }

    /// Check if this error means the buffer itself is corrupt
    ///
    /// `IndexOutOfBounds` is a caller mistake against a well-formed buffer;
    /// every other variant means the bytes cannot be trusted.
    pub fn is_corruption(&self) -> bool {
        !matches!(self, Self::IndexOutOfBounds { .. })
    }
}
