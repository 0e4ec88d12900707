//! Back-to-front FlatBuffer builder
//!
//! Objects are written from the end of the buffer towards the start, so
//! everything a table refers to (strings, vectors, nested tables) must be
//! finished before the table is started. Offsets returned by the builder are
//! measured from the end of the buffer and stay valid as the buffer grows.
//!
//! # Wire Format
//!
//! ```text
//! [4 bytes: root uoffset] -> points to root table
//! [vtable]
//!   - vtable_size (u16)
//!   - table_size (u16)
//!   - field offsets (u16 each, 0 = not present)
//! [table]
//!   - soffset to vtable (i32, vtable = table - soffset)
//!   - inline scalars, structs and uoffsets
//! [vectors / strings]
//!   - length (u32)
//!   - elements (strings carry a trailing NUL)
//! ```
//!
//! # Example
//!
//! ```
//! use statesync_client::FlatBufferBuilder;
//!
//! let mut fbb = FlatBufferBuilder::new();
//! fbb.start_table(1).unwrap();
//! fbb.push_slot_i64(0, 42, 0).unwrap();
//! let root = fbb.end_table().unwrap();
//! fbb.finish(root).unwrap();
//! assert!(fbb.finished_data().unwrap().len() >= 16);
//! ```

use bytes::Bytes;
use statesync_protocol::{SIZE_SOFFSET, SIZE_UOFFSET, SIZE_VOFFSET, VTABLE_HEADER_SIZE};
use tracing::{debug, trace};

use crate::config::EncoderConfig;
use crate::error::{BuilderError, Result};

/// Largest value a vtable entry or size can hold
const MAX_VOFFSET: usize = u16::MAX as usize;

/// Location of a finished object, measured from the end of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Offset(u32);

impl Offset {
    /// Offset that refers to nothing
    pub const NULL: Offset = Offset(0);

    /// Raw value (bytes from the end of the buffer)
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Check if this is the null offset
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Object currently being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Table { num_fields: usize, start: usize },
    Vector {
        expected: usize,
        pushed: usize,
        start: usize,
    },
    Finished,
}

impl State {
    const fn name(self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Table { .. } => "table",
            State::Vector { .. } => "vector",
            State::Finished => "finished buffer",
        }
    }
}

/// Builder for FlatBuffer wire format
///
/// One builder produces one buffer at a time. Call [`reset`](Self::reset) to
/// reuse its allocation for the next one.
#[derive(Debug)]
pub struct FlatBufferBuilder {
    /// Backing storage; written data lives in `buf[head..]`
    buf: Vec<u8>,
    head: usize,
    /// Position (from the end) of each field in the open table, 0 = absent
    field_locs: Vec<u32>,
    /// Positions (from the end) of every vtable written so far
    vtables: Vec<u32>,
    min_align: usize,
    state: State,
    config: EncoderConfig,
}

impl Default for FlatBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatBufferBuilder {
    /// Create a builder with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(EncoderConfig::default())
    }

    /// Create a builder with a custom configuration
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn with_config(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EncoderConfig) -> Self {
        let capacity = config.initial_capacity;
        Self {
            buf: vec![0; capacity],
            head: capacity,
            field_locs: Vec::new(),
            vtables: Vec::new(),
            min_align: 1,
            state: State::Idle,
            config,
        }
    }

    /// Get the active configuration
    #[inline]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Discard everything written and start a new buffer
    ///
    /// The allocation is kept.
    pub fn reset(&mut self) {
        debug!(
            used = self.used_space(),
            capacity = self.buf.len(),
            "resetting builder"
        );
        self.head = self.buf.len();
        self.field_locs.clear();
        self.vtables.clear();
        self.min_align = 1;
        self.state = State::Idle;
    }

    /// Bytes written so far
    #[inline]
    pub fn used_space(&self) -> usize {
        self.buf.len() - self.head
    }

    /// Check if [`finish`](Self::finish) has been called
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Start a table with `num_fields` slots
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::NestedObject`] if another object is open,
    /// [`BuilderError::AlreadyFinished`] after `finish`, and
    /// [`BuilderError::TableTooLarge`] if the vtable could not describe that
    /// many slots.
    pub fn start_table(&mut self, num_fields: usize) -> Result<()> {
        self.check_idle("table")?;
        let vtable_len = VTABLE_HEADER_SIZE + SIZE_VOFFSET * num_fields;
        if vtable_len > MAX_VOFFSET {
            return Err(BuilderError::TableTooLarge {
                size: vtable_len,
                max: MAX_VOFFSET,
            });
        }
        self.field_locs.clear();
        self.field_locs.resize(num_fields, 0);
        self.state = State::Table {
            num_fields,
            start: self.used_space(),
        };
        Ok(())
    }

    /// Add an `i64` field
    ///
    /// Skipped when `value == default`, unless `force_defaults` is set.
    pub fn push_slot_i64(&mut self, slot: usize, value: i64, default: i64) -> Result<()> {
        self.check_slot(slot)?;
        if value == default && !self.config.force_defaults {
            return Ok(());
        }
        self.prep(size_of::<i64>(), size_of::<i64>())?;
        self.push_bytes(&value.to_le_bytes());
        self.track_field(slot);
        Ok(())
    }

    /// Add a field referring to a finished string, vector or table
    ///
    /// A null offset leaves the field absent.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::InvalidOffset`] if the offset does not refer to
    /// an object finished before this table was started.
    pub fn push_slot_offset(&mut self, slot: usize, offset: Offset) -> Result<()> {
        let start = self.check_slot(slot)?;
        if offset.is_null() {
            return Ok(());
        }
        self.check_offset(offset, start)?;
        self.push_uoffset(offset)?;
        self.track_field(slot);
        Ok(())
    }

    /// Add an inline struct field from its little-endian bytes
    ///
    /// Structs have no default and are always written.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::InvalidAlignment`] unless `align` is a power
    /// of two.
    pub fn push_slot_struct(&mut self, slot: usize, bytes: &[u8], align: usize) -> Result<()> {
        self.check_slot(slot)?;
        if !align.is_power_of_two() {
            return Err(BuilderError::InvalidAlignment { align });
        }
        self.prep(align, bytes.len())?;
        self.push_bytes(bytes);
        self.track_field(slot);
        Ok(())
    }

    /// Close the open table and write (or reuse) its vtable
    ///
    /// Trailing absent slots are left out of the vtable; readers treat
    /// slots past the vtable end as absent.
    pub fn end_table(&mut self) -> Result<Offset> {
        let State::Table { start, .. } = self.state else {
            return Err(match self.state {
                State::Finished => BuilderError::AlreadyFinished,
                _ => BuilderError::NotInTable,
            });
        };

        let used = self.used_space();
        let padding = Self::padding_for(used, SIZE_SOFFSET);
        let object_offset = used + padding + SIZE_SOFFSET;
        let table_size = object_offset - start;
        if table_size > MAX_VOFFSET {
            return Err(BuilderError::TableTooLarge {
                size: table_size,
                max: MAX_VOFFSET,
            });
        }

        let present = self
            .field_locs
            .iter()
            .rposition(|&loc| loc != 0)
            .map_or(0, |last| last + 1);
        let vtable_len = VTABLE_HEADER_SIZE + SIZE_VOFFSET * present;

        let mut vtable = Vec::with_capacity(vtable_len);
        vtable.extend_from_slice(&(vtable_len as u16).to_le_bytes());
        vtable.extend_from_slice(&(table_size as u16).to_le_bytes());
        for &loc in &self.field_locs[..present] {
            let entry = if loc == 0 {
                0
            } else {
                (object_offset - loc as usize) as u16
            };
            vtable.extend_from_slice(&entry.to_le_bytes());
        }

        // Reserve everything up front so a size error leaves the table open
        self.ensure_space(padding + SIZE_SOFFSET + vtable_len)?;
        self.prep(SIZE_SOFFSET, SIZE_SOFFSET)?;
        self.push_bytes(&0i32.to_le_bytes());
        debug_assert_eq!(self.used_space(), object_offset);

        let vtable_offset = match self.find_vtable(&vtable) {
            Some(existing) => {
                trace!(table_size, vtable_len, existing, "reusing vtable");
                existing
            }
            None => {
                self.prep(SIZE_VOFFSET, vtable_len)?;
                self.push_bytes(&vtable);
                let written = self.used_space();
                self.vtables.push(written as u32);
                written
            }
        };
        trace!(table_size, vtable_len, object_offset, "table ended");

        let soffset = (vtable_offset as i32 - object_offset as i32).to_le_bytes();
        let at = self.buf.len() - object_offset;
        self.buf[at..at + SIZE_SOFFSET].copy_from_slice(&soffset);

        self.field_locs.clear();
        self.state = State::Idle;
        Ok(Offset(object_offset as u32))
    }

    // =========================================================================
    // Vectors and strings
    // =========================================================================

    /// Start a vector of `num_elems` offsets
    ///
    /// Push elements in reverse order with
    /// [`push_offset_element`](Self::push_offset_element): the last element
    /// pushed becomes index 0.
    pub fn start_vector(&mut self, num_elems: usize) -> Result<()> {
        self.check_idle("vector")?;
        let max = self.config.max_buffer_size;
        let data_len = num_elems
            .checked_mul(SIZE_UOFFSET)
            .ok_or_else(|| BuilderError::buffer_too_large(usize::MAX, max))?;
        self.prep(SIZE_UOFFSET, data_len)?;
        self.state = State::Vector {
            expected: num_elems,
            pushed: 0,
            start: self.used_space(),
        };
        Ok(())
    }

    /// Push one offset element onto the open vector
    pub fn push_offset_element(&mut self, offset: Offset) -> Result<()> {
        let State::Vector {
            expected,
            pushed,
            start,
        } = self.state
        else {
            return Err(BuilderError::NotInVector);
        };
        if pushed == expected {
            return Err(BuilderError::vector_length_mismatch(expected, pushed + 1));
        }
        self.check_offset(offset, start)?;
        self.push_uoffset(offset)?;
        self.state = State::Vector {
            expected,
            pushed: pushed + 1,
            start,
        };
        Ok(())
    }

    /// Close the open vector and write its element count
    pub fn end_vector(&mut self) -> Result<Offset> {
        let State::Vector {
            expected, pushed, ..
        } = self.state
        else {
            return Err(BuilderError::NotInVector);
        };
        if pushed != expected {
            return Err(BuilderError::vector_length_mismatch(expected, pushed));
        }
        self.push_u32(expected as u32)?;
        self.state = State::Idle;
        Ok(Offset(self.used_space() as u32))
    }

    /// Write a length-prefixed, NUL-terminated UTF-8 string
    pub fn create_string(&mut self, s: &str) -> Result<Offset> {
        self.check_idle("string")?;
        let bytes = s.as_bytes();
        self.prep(SIZE_UOFFSET, bytes.len() + 1)?;
        self.push_bytes(&[0]);
        self.push_bytes(bytes);
        self.push_u32(bytes.len() as u32)?;
        Ok(Offset(self.used_space() as u32))
    }

    // =========================================================================
    // Finishing
    // =========================================================================

    /// Write the root offset and seal the buffer
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::ObjectOpen`] if a table or vector is still
    /// open, [`BuilderError::AlreadyFinished`] on a second call and
    /// [`BuilderError::InvalidOffset`] if `root` was not produced by this
    /// builder.
    pub fn finish(&mut self, root: Offset) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Finished => return Err(BuilderError::AlreadyFinished),
            open => return Err(BuilderError::ObjectOpen { open: open.name() }),
        }
        self.check_offset(root, self.used_space())?;
        self.prep(self.min_align.max(SIZE_UOFFSET), SIZE_UOFFSET)?;
        self.push_uoffset(root)?;
        self.state = State::Finished;
        debug!(
            size = self.used_space(),
            vtables = self.vtables.len(),
            "finished buffer"
        );
        Ok(())
    }

    /// Get the finished bytes
    pub fn finished_data(&self) -> Result<&[u8]> {
        if !self.is_finished() {
            return Err(BuilderError::NotFinished);
        }
        Ok(&self.buf[self.head..])
    }

    /// Consume the builder and return the finished bytes without copying
    pub fn into_bytes(self) -> Result<Bytes> {
        if !self.is_finished() {
            return Err(BuilderError::NotFinished);
        }
        let head = self.head;
        Ok(Bytes::from(self.buf).slice(head..))
    }

    // =========================================================================
    // State checks
    // =========================================================================

    fn check_idle(&self, kind: &'static str) -> Result<()> {
        match self.state {
            State::Idle => Ok(()),
            State::Finished => Err(BuilderError::AlreadyFinished),
            open => Err(BuilderError::nested(kind, open.name())),
        }
    }

    /// Validate a slot of the open table, returning the table's start
    fn check_slot(&self, slot: usize) -> Result<usize> {
        match self.state {
            State::Table { num_fields, start } if slot < num_fields => Ok(start),
            State::Table { num_fields, .. } => {
                Err(BuilderError::SlotOutOfRange { slot, num_fields })
            }
            State::Finished => Err(BuilderError::AlreadyFinished),
            _ => Err(BuilderError::NotInTable),
        }
    }

    /// An offset must be non-null and point at or before `limit`
    fn check_offset(&self, offset: Offset, limit: usize) -> Result<()> {
        if offset.is_null() || offset.value() as usize > limit {
            return Err(BuilderError::InvalidOffset {
                offset: offset.value(),
                used: self.used_space(),
            });
        }
        Ok(())
    }

    fn track_field(&mut self, slot: usize) {
        self.field_locs[slot] = self.used_space() as u32;
    }

    fn find_vtable(&self, vtable: &[u8]) -> Option<usize> {
        if !self.config.dedup_vtables {
            return None;
        }
        self.vtables.iter().rev().map(|&v| v as usize).find(|&v| {
            let at = self.buf.len() - v;
            self.buf.get(at..at + vtable.len()) == Some(vtable)
        })
    }

    // =========================================================================
    // Raw writes
    // =========================================================================

    /// Zero bytes needed to bring `used` up to a multiple of `size`
    #[inline]
    fn padding_for(used: usize, size: usize) -> usize {
        (!used).wrapping_add(1) & (size - 1)
    }

    /// Pad so that `additional` bytes written next end `size`-aligned, and
    /// reserve room for them
    fn prep(&mut self, size: usize, additional: usize) -> Result<()> {
        if size > self.min_align {
            self.min_align = size;
        }
        let padding = Self::padding_for(self.used_space() + additional, size);
        self.ensure_space(padding + additional)?;
        self.head -= padding;
        self.buf[self.head..self.head + padding].fill(0);
        Ok(())
    }

    /// Grow the buffer until `additional` more bytes fit in front of `head`
    fn ensure_space(&mut self, additional: usize) -> Result<()> {
        if self.head >= additional {
            return Ok(());
        }
        let used = self.used_space();
        let max = self.config.max_buffer_size;
        let required = used
            .checked_add(additional)
            .filter(|&size| size <= max)
            .ok_or_else(|| BuilderError::buffer_too_large(used.saturating_add(additional), max))?;

        let mut new_len = self.buf.len().max(1);
        while new_len < required {
            new_len = new_len.saturating_mul(2);
        }
        let new_len = new_len.min(max);

        let mut grown = vec![0; new_len];
        let new_head = new_len - used;
        grown[new_head..].copy_from_slice(&self.buf[self.head..]);
        trace!(from = self.buf.len(), to = new_len, "growing buffer");
        self.buf = grown;
        self.head = new_head;
        Ok(())
    }

    /// Write bytes in front of `head`; space must already be reserved
    #[inline]
    fn push_bytes(&mut self, bytes: &[u8]) {
        let end = self.head;
        self.head -= bytes.len();
        self.buf[self.head..end].copy_from_slice(bytes);
    }

    fn push_u32(&mut self, value: u32) -> Result<()> {
        self.prep(SIZE_UOFFSET, SIZE_UOFFSET)?;
        self.push_bytes(&value.to_le_bytes());
        Ok(())
    }

    /// Write a uoffset relative to its own position
    fn push_uoffset(&mut self, offset: Offset) -> Result<()> {
        self.prep(SIZE_UOFFSET, SIZE_UOFFSET)?;
        let relative = self.used_space() + SIZE_UOFFSET - offset.value() as usize;
        self.push_bytes(&(relative as u32).to_le_bytes());
        Ok(())
    }
}
