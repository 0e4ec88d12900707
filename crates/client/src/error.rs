//! Error types for the snapshot builders
//!
//! Builder misuse (wrong nesting, fields outside a table, vector length
//! mismatches, foreign offsets) fails at the violating call and leaves the
//! buffer untouched by that call.

use statesync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for builder operations
pub type Result<T> = std::result::Result<T, BuilderError>;

/// Errors that can occur when building snapshot buffers
#[derive(Debug, Error)]
pub enum BuilderError {
    // =========================================================================
    // Object nesting
    // =========================================================================
    /// A table, vector or string was started while another object is open
    #[error("cannot start a {kind} while a {open} is open")]
    NestedObject {
        /// Object being started
        kind: &'static str,
        /// Object that is still open
        open: &'static str,
    },

    /// A field was added or a table ended with no table open
    #[error("no table is open")]
    NotInTable,

    /// An element was pushed or a vector ended with no vector open
    #[error("no vector is open")]
    NotInVector,

    /// `finish` was called while an object is still open
    #[error("cannot finish while a {open} is open")]
    ObjectOpen {
        /// Object that is still open
        open: &'static str,
    },

    /// The buffer was already finished
    #[error("buffer already finished; reset the builder before building another")]
    AlreadyFinished,

    /// Finished data was requested before `finish`
    #[error("buffer is not finished")]
    NotFinished,

    // =========================================================================
    // Fields and offsets
    // =========================================================================
    /// Slot index is not declared by the open table
    #[error("slot {slot} out of range for table with {num_fields} fields")]
    SlotOutOfRange {
        /// Slot that was added
        slot: usize,
        /// Fields declared in `start_table`
        num_fields: usize,
    },

    /// Number of pushed elements differs from the declared count
    #[error("vector declared {expected} elements but {actual} were pushed")]
    VectorLengthMismatch {
        /// Count passed to `start_vector`
        expected: usize,
        /// Elements pushed so far
        actual: usize,
    },

    /// Struct alignment is not a power of two
    #[error("struct alignment {align} is not a power of two")]
    InvalidAlignment {
        /// Requested alignment
        align: usize,
    },

    /// Offset is null or does not refer to data written by this builder
    #[error("offset {offset} not written by this builder ({used} bytes written)")]
    InvalidOffset {
        /// Offending offset
        offset: u32,
        /// Bytes written so far
        used: usize,
    },

    // =========================================================================
    // Size limits
    // =========================================================================
    /// Inline table or vtable size does not fit in a u16
    #[error("table size {size} exceeds maximum {max}")]
    TableTooLarge {
        /// Required size
        size: usize,
        /// Maximum encodable size
        max: usize,
    },

    /// Buffer would grow past the configured maximum
    #[error("buffer size {size} exceeds maximum {max}")]
    BufferTooLarge {
        /// Required size
        size: usize,
        /// Configured maximum
        max: usize,
    },

    // =========================================================================
    // Configuration and verification
    // =========================================================================
    /// Encoder configuration could not be parsed
    #[error("failed to parse encoder config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Encoder configuration has inconsistent values
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),

    /// A built buffer could not be opened as a snapshot
    #[error("built snapshot failed to decode: {0}")]
    Decode(#[from] ProtocolError),
}

impl BuilderError {
    /// Create a NestedObject error
    pub fn nested(kind: &'static str, open: &'static str) -> Self {
        Self::NestedObject { kind, open }
    }

    /// Create a VectorLengthMismatch error
    pub fn vector_length_mismatch(expected: usize, actual: usize) -> Self {
        Self::VectorLengthMismatch { expected, actual }
    }

    /// Create a BufferTooLarge error
    pub fn buffer_too_large(size: usize, max: usize) -> Self {
        Self::BufferTooLarge { size, max }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
