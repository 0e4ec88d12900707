//! FlatBuffer table parsing
//!
//! Generic, schema-less access to a table and to vectors of tables. Typed
//! views ([`StateSnapshotSync`](crate::StateSnapshotSync),
//! [`Batch`](crate::Batch)) wrap these and name the slots.

use std::iter::FusedIterator;

use crate::flatbuf::{
    SIZE_SOFFSET, SIZE_UOFFSET, SIZE_VOFFSET, VTABLE_HEADER_SIZE, read_i32, read_i64, read_slice,
    read_u16, read_u32, read_uoffset,
};
use crate::{ProtocolError, Result};

/// Validated location of a table and its vtable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TableLayout {
    position: usize,
    vtable: usize,
    vtable_len: usize,
    table_size: usize,
}

impl TableLayout {
    fn parse(buf: &[u8], position: usize) -> Result<Self> {
        let soffset = read_i32(buf, position)?;

        // vtable = table - soffset; a negative soffset puts the vtable after
        // the table (shared vtables written earlier by the builder)
        let vtable = position
            .checked_add_signed(-(soffset as isize))
            .filter(|&vt| vt < buf.len())
            .ok_or_else(|| ProtocolError::malformed_vtable(position, "vtable outside buffer"))?;

        let vtable_len = read_u16(buf, vtable)
            .map_err(|_| ProtocolError::malformed_vtable(vtable, "vtable header outside buffer"))?
            as usize;
        let table_size = read_u16(buf, vtable + 2)
            .map_err(|_| ProtocolError::malformed_vtable(vtable, "vtable header outside buffer"))?
            as usize;

        if vtable_len < VTABLE_HEADER_SIZE || !vtable_len.is_multiple_of(SIZE_VOFFSET) {
            return Err(ProtocolError::malformed_vtable(vtable, "invalid vtable length"));
        }
        if vtable + vtable_len > buf.len() {
            return Err(ProtocolError::malformed_vtable(vtable, "vtable extends past buffer"));
        }
        if table_size < SIZE_SOFFSET {
            return Err(ProtocolError::malformed_vtable(vtable, "inline table size below soffset"));
        }
        if position + table_size > buf.len() {
            return Err(ProtocolError::truncated(position, table_size, buf.len()));
        }

        Ok(Self {
            position,
            vtable,
            vtable_len,
            table_size,
        })
    }
}

/// Read-only view of a single table
///
/// Holds only the buffer reference and validated positions; every accessor
/// re-resolves its field through the vtable.
#[derive(Debug, Clone, Copy)]
pub struct FlatTable<'a> {
    buf: &'a [u8],
    layout: TableLayout,
}

impl<'a> FlatTable<'a> {
    /// Parse the table starting at `position`
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedVtable`] if the vtable cannot be
    /// located or its declared sizes are inconsistent, and
    /// [`ProtocolError::Truncated`] if the table runs past the buffer.
    pub fn parse(buf: &'a [u8], position: usize) -> Result<Self> {
        let layout = TableLayout::parse(buf, position)?;
        Ok(Self { buf, layout })
    }

    /// Rebuild a view from a layout validated against the same buffer
    #[inline]
    pub(crate) fn with_layout(buf: &'a [u8], layout: TableLayout) -> Self {
        Self { buf, layout }
    }

    #[inline]
    pub(crate) fn layout(&self) -> TableLayout {
        self.layout
    }

    /// Get the raw buffer
    #[inline]
    pub fn raw_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Absolute position of the table in the buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.layout.position
    }

    /// Absolute position of the table's vtable
    #[inline]
    pub fn vtable_position(&self) -> usize {
        self.layout.vtable
    }

    /// Declared vtable size in bytes
    #[inline]
    pub fn vtable_len(&self) -> usize {
        self.layout.vtable_len
    }

    /// Number of slots recorded in the vtable
    ///
    /// Buffers written against an older schema record fewer slots; every
    /// slot past this count reads as absent.
    #[inline]
    pub fn field_count(&self) -> usize {
        (self.layout.vtable_len - VTABLE_HEADER_SIZE) / SIZE_VOFFSET
    }

    /// Resolve the absolute position of a field, or `None` if it is absent
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedVtable`] if the vtable entry points
    /// into the soffset or past the declared inline table size.
    pub fn field_offset(&self, slot: usize) -> Result<Option<usize>> {
        self.field_with_width(slot, 1)
    }

    /// Resolve a field whose inline value is `width` bytes wide
    ///
    /// The whole value must lie inside the declared inline table size.
    fn field_with_width(&self, slot: usize, width: usize) -> Result<Option<usize>> {
        if slot >= self.field_count() {
            return Ok(None);
        }

        let entry_pos = self.layout.vtable + VTABLE_HEADER_SIZE + slot * SIZE_VOFFSET;
        let entry = read_u16(self.buf, entry_pos)? as usize;

        if entry == 0 {
            return Ok(None);
        }
        if entry < SIZE_SOFFSET || entry.saturating_add(width) > self.layout.table_size {
            return Err(ProtocolError::malformed_vtable(
                self.layout.vtable,
                "field offset outside inline table",
            ));
        }

        Ok(Some(self.layout.position + entry))
    }

    /// Check if a field is present
    pub fn has_field(&self, slot: usize) -> Result<bool> {
        Ok(self.field_offset(slot)?.is_some())
    }

    /// Read i64 field with default
    pub fn read_i64(&self, slot: usize, default: i64) -> Result<i64> {
        match self.field_with_width(slot, size_of::<i64>())? {
            Some(pos) => read_i64(self.buf, pos),
            None => Ok(default),
        }
    }

    /// Read u32 field with default
    pub fn read_u32(&self, slot: usize, default: u32) -> Result<u32> {
        match self.field_with_width(slot, size_of::<u32>())? {
            Some(pos) => read_u32(self.buf, pos),
            None => Ok(default),
        }
    }

    /// Read inline struct bytes
    pub fn read_inline(&self, slot: usize, len: usize) -> Result<Option<&'a [u8]>> {
        let Some(pos) = self.field_with_width(slot, len)? else {
            return Ok(None);
        };
        read_slice(self.buf, pos, len).map(Some)
    }

    /// Read string field
    pub fn read_string(&self, slot: usize) -> Result<Option<&'a str>> {
        let Some(pos) = self.field_with_width(slot, SIZE_UOFFSET)? else {
            return Ok(None);
        };

        let start = read_uoffset(self.buf, pos)?;
        let len = read_u32(self.buf, start)? as usize;
        let data_start = start + SIZE_UOFFSET;
        let bytes = read_slice(self.buf, data_start, len)?;

        std::str::from_utf8(bytes)
            .map(Some)
            .map_err(|_| ProtocolError::InvalidUtf8 {
                position: data_start,
            })
    }

    /// Read nested table field
    pub fn read_table(&self, slot: usize) -> Result<Option<FlatTable<'a>>> {
        let Some(pos) = self.field_with_width(slot, SIZE_UOFFSET)? else {
            return Ok(None);
        };
        let target = read_uoffset(self.buf, pos)?;
        FlatTable::parse(self.buf, target).map(Some)
    }

    /// Read vector of tables
    pub fn read_vector(&self, slot: usize) -> Result<Option<TableVector<'a>>> {
        let Some(pos) = self.field_with_width(slot, SIZE_UOFFSET)? else {
            return Ok(None);
        };
        let target = read_uoffset(self.buf, pos)?;
        TableVector::parse(self.buf, target).map(Some)
    }
}

/// Vector whose elements are uoffsets to tables
#[derive(Debug, Clone, Copy)]
pub struct TableVector<'a> {
    buf: &'a [u8],
    data_start: usize,
    len: usize,
}

impl<'a> TableVector<'a> {
    /// Parse the vector whose length prefix sits at `position`
    ///
    /// The whole element region is checked up front so that `get` only has
    /// to validate the element it dereferences.
    pub fn parse(buf: &'a [u8], position: usize) -> Result<Self> {
        let len = read_u32(buf, position)? as usize;
        let data_start = position + SIZE_UOFFSET;
        let data_len = len
            .checked_mul(SIZE_UOFFSET)
            .ok_or_else(|| ProtocolError::truncated(data_start, usize::MAX, buf.len()))?;
        read_slice(buf, data_start, data_len)?;

        Ok(Self {
            buf,
            data_start,
            len,
        })
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the vector has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolve element `index` to its table
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::IndexOutOfBounds`] if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<FlatTable<'a>> {
        if index >= self.len {
            return Err(ProtocolError::index_out_of_bounds(index, self.len));
        }
        let elem_pos = self.data_start + index * SIZE_UOFFSET;
        let target = read_uoffset(self.buf, elem_pos)?;
        FlatTable::parse(self.buf, target)
    }

    /// Iterate over the element tables in order
    pub fn iter(&self) -> TableVectorIter<'a> {
        TableVectorIter {
            vector: *self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for TableVector<'a> {
    type Item = Result<FlatTable<'a>>;
    type IntoIter = TableVectorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the tables of a [`TableVector`]
#[derive(Debug, Clone)]
pub struct TableVectorIter<'a> {
    vector: TableVector<'a>,
    next: usize,
}

impl<'a> Iterator for TableVectorIter<'a> {
    type Item = Result<FlatTable<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.vector.len {
            return None;
        }
        let item = self.vector.get(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TableVectorIter<'_> {}

impl FusedIterator for TableVectorIter<'_> {}
