//! FlatBuffer wire format primitives
//!
//! Bounds-checked little-endian reads and offset arithmetic shared by every
//! view in this crate.
//!
//! # Wire Format
//!
//! ```text
//! [4 bytes: root offset] -> [table]
//!                              |
//!                              v
//!                           [vtable offset (i32): vtable = table - soffset]
//!                           [field data...]
//!
//!                           [vtable]
//!                           [vtable size (u16)]
//!                           [table size (u16)]
//!                           [field offsets (u16 each, 0 = absent)]
//! ```
//!
//! Every uoffset is unsigned and relative to the position it is stored at.
//! No read ever leaves the buffer: out-of-range accesses return
//! [`ProtocolError::Truncated`].

use crate::{ProtocolError, Result};

/// Size of an unsigned offset (root, vector, string, table reference)
pub const SIZE_UOFFSET: usize = 4;

/// Size of the signed table-to-vtable offset
pub const SIZE_SOFFSET: usize = 4;

/// Size of a single vtable entry
pub const SIZE_VOFFSET: usize = 2;

/// Vtable header: vtable size (u16) + inline table size (u16)
pub const VTABLE_HEADER_SIZE: usize = 4;

#[inline]
fn read_array<const N: usize>(buf: &[u8], position: usize) -> Result<[u8; N]> {
    position
        .checked_add(N)
        .and_then(|end| buf.get(position..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| ProtocolError::truncated(position, N, buf.len()))
}

#[inline]
pub(crate) fn read_u16(buf: &[u8], position: usize) -> Result<u16> {
    read_array(buf, position).map(u16::from_le_bytes)
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], position: usize) -> Result<u32> {
    read_array(buf, position).map(u32::from_le_bytes)
}

#[inline]
pub(crate) fn read_i32(buf: &[u8], position: usize) -> Result<i32> {
    read_array(buf, position).map(i32::from_le_bytes)
}

#[inline]
pub(crate) fn read_i64(buf: &[u8], position: usize) -> Result<i64> {
    read_array(buf, position).map(i64::from_le_bytes)
}

/// Borrow `len` bytes starting at `position`
#[inline]
pub(crate) fn read_slice(buf: &[u8], position: usize, len: usize) -> Result<&[u8]> {
    position
        .checked_add(len)
        .and_then(|end| buf.get(position..end))
        .ok_or_else(|| ProtocolError::truncated(position, len, buf.len()))
}

/// Follow the uoffset stored at `position`
///
/// Returns the absolute position it points to. The target must lie inside
/// the buffer.
#[inline]
pub(crate) fn read_uoffset(buf: &[u8], position: usize) -> Result<usize> {
    let rel = read_u32(buf, position)? as usize;
    match position.checked_add(rel) {
        Some(target) if target < buf.len() => Ok(target),
        Some(target) => Err(ProtocolError::truncated(target, 1, buf.len())),
        None => Err(ProtocolError::truncated(usize::MAX, 1, buf.len())),
    }
}

/// Resolve the root table position from the root offset stored at `offset`
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer cannot hold the root
/// offset or if the root offset points outside the buffer.
pub fn root_position(buf: &[u8], offset: usize) -> Result<usize> {
    read_uoffset(buf, offset)
}
