//! Hand-built wire buffers for tests
//!
//! These helpers lay buffers out front to back (root offset, vtable, table,
//! then the data the table points to) so the readers are exercised
//! independently of the back-to-front builder in `statesync-client`.

/// Forward-layout buffer writer
pub(crate) struct Wire {
    buf: Vec<u8>,
}

impl Wire {
    /// Start a buffer with a zeroed root offset
    pub fn new() -> Self {
        Self { buf: vec![0u8; 4] }
    }

    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    pub fn align(&mut self, n: usize) {
        while !self.buf.len().is_multiple_of(n) {
            self.buf.push(0);
        }
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Point the uoffset stored at `at` to `target`
    pub fn patch_uoffset(&mut self, at: usize, target: usize) {
        let rel = (target - at) as u32;
        self.buf[at..at + 4].copy_from_slice(&rel.to_le_bytes());
    }

    pub fn set_root(&mut self, table: usize) {
        self.patch_uoffset(0, table);
    }

    /// Write a vtable and return its position
    pub fn vtable(&mut self, table_size: u16, entries: &[u16]) -> usize {
        self.align(2);
        let pos = self.pos();
        self.u16((4 + entries.len() * 2) as u16);
        self.u16(table_size);
        for &entry in entries {
            self.u16(entry);
        }
        pos
    }

    /// Write a table soffset pointing back to `vtable` and return the table position
    pub fn table_start(&mut self, vtable: usize) -> usize {
        self.align(4);
        let pos = self.pos();
        self.i32((pos - vtable) as i32);
        pos
    }

    pub fn string(&mut self, s: &str) -> usize {
        self.align(4);
        let pos = self.pos();
        self.u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        pos
    }

    /// Write a Batch table: batch_id at +4, metaversion at +8
    pub fn batch(&mut self, id: &str, metaversion: Option<(u32, u32)>) -> usize {
        let metaversion_entry = if metaversion.is_some() { 8 } else { 0 };
        let vtable = self.vtable(16, &[4, metaversion_entry]);
        let table = self.table_start(vtable);

        let id_slot = self.pos();
        self.u32(0);
        let (memory, batch) = metaversion.unwrap_or((0, 0));
        self.u32(memory);
        self.u32(batch);

        let s = self.string(id);
        self.patch_uoffset(id_slot, s);
        table
    }

    /// Write a vector of Batch tables and return the vector position
    pub fn batch_vector(&mut self, ids: &[&str]) -> usize {
        self.align(4);
        let pos = self.pos();
        self.u32(ids.len() as u32);

        let slots: Vec<usize> = ids
            .iter()
            .map(|_| {
                let slot = self.pos();
                self.u32(0);
                slot
            })
            .collect();

        for (slot, id) in slots.into_iter().zip(ids) {
            let table = self.batch(id, None);
            self.patch_uoffset(slot, table);
        }
        pos
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Position of the snapshot vtable in buffers from [`snapshot_buffer`]
pub(crate) const SNAPSHOT_VTABLE_POS: usize = 4;

/// Position of the snapshot table in buffers from [`snapshot_buffer`]
pub(crate) const SNAPSHOT_TABLE_POS: usize = 16;

/// Build a StateSnapshotSync buffer
///
/// Table layout: soffset, agent_pool uoffset (+4), message_pool uoffset
/// (+8), current_step (+12). `None` leaves the vtable entry at 0.
pub(crate) fn snapshot_buffer(
    agents: Option<&[&str]>,
    messages: Option<&[&str]>,
    step: Option<i64>,
) -> Vec<u8> {
    let mut w = Wire::new();

    let entries = [
        if agents.is_some() { 4 } else { 0 },
        if messages.is_some() { 8 } else { 0 },
        if step.is_some() { 12 } else { 0 },
    ];
    let vtable = w.vtable(20, &entries);
    let table = w.table_start(vtable);
    w.set_root(table);

    let agent_slot = w.pos();
    w.u32(0);
    let message_slot = w.pos();
    w.u32(0);
    w.i64(step.unwrap_or(0));

    if let Some(ids) = agents {
        let vector = w.batch_vector(ids);
        w.patch_uoffset(agent_slot, vector);
    }
    if let Some(ids) = messages {
        let vector = w.batch_vector(ids);
        w.patch_uoffset(message_slot, vector);
    }

    w.finish()
}
