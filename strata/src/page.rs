use std::io::{self, Cursor, Read};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple, TupleDesc};
use crate::PAGE_SIZE;

/// Identifies one page of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: u32,
    pub page_no: u32,
}

/// Number of tuple slots on a page of the given schema.
///
/// Each slot costs its tuple size plus one header bit, so
/// N = floor(PAGE_SIZE * 8 / (tuple_size * 8 + 1)).
pub fn slots_per_page(desc: &TupleDesc) -> usize {
    (PAGE_SIZE * 8) / (desc.byte_size() * 8 + 1)
}

/// Header length in bytes: one bit per slot, rounded up.
pub fn header_size(desc: &TupleDesc) -> usize {
    slots_per_page(desc).div_ceil(8)
}

/// One heap page: an occupancy bitmap followed by fixed-width tuple slots.
///
/// On disk the layout is `[header][slot 0]..[slot N-1][zero padding]`, where
/// bit i of header byte i/8 (least significant bit first) is set iff slot i
/// holds a tuple. `page_data` is the exact inverse of parsing: for any valid
/// page, re-parsing its serialized form reproduces the page.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirtier: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Parses a page from its on-disk bytes. The raw bytes are also captured
    /// as the page's before-image.
    pub fn new(pid: PageId, data: &[u8], desc: Arc<TupleDesc>) -> Result<HeapPage> {
        if data.len() != PAGE_SIZE {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("page buffer is {} bytes, expected {PAGE_SIZE}", data.len()),
            )));
        }

        let num_slots = slots_per_page(&desc);
        let mut cursor = Cursor::new(data);

        let mut header = vec![0u8; header_size(&desc)];
        cursor.read_exact(&mut header).map_err(Error::Io)?;

        let tuple_size = desc.byte_size();
        let mut slots = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if header[slot / 8] >> (slot % 8) & 1 == 1 {
                let mut fields = Vec::with_capacity(desc.num_fields());
                for i in 0..desc.num_fields() {
                    fields.push(desc.field_type(i).parse(&mut cursor).map_err(Error::Io)?);
                }
                let mut tuple = Tuple::new(desc.clone(), fields);
                tuple.set_record_id(Some(RecordId { page_id: pid, slot }));
                slots.push(Some(tuple));
            } else {
                cursor.set_position(cursor.position() + tuple_size as u64);
                slots.push(None);
            }
        }

        Ok(HeapPage {
            pid,
            desc,
            header,
            slots,
            dirtier: None,
            before_image: data.to_vec(),
        })
    }

    /// The bytes of a page with every slot empty.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    /// Serializes the page into its on-disk form.
    pub fn page_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(PAGE_SIZE);
        data.extend_from_slice(&self.header);

        let tuple_size = self.desc.byte_size();
        for slot in &self.slots {
            match slot {
                Some(tuple) => {
                    for field in tuple.fields() {
                        field
                            .write_to(&mut data)
                            .expect("writing to a Vec cannot fail");
                    }
                }
                None => data.extend(std::iter::repeat(0u8).take(tuple_size)),
            }
        }

        data.resize(PAGE_SIZE, 0);
        data
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Number of empty slots remaining.
    pub fn unused_slots(&self) -> usize {
        (0..self.slots.len())
            .filter(|&i| !self.is_slot_used(i))
            .count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        self.header[slot / 8] >> (slot % 8) & 1 == 1
    }

    /// Sets or clears a slot's occupancy bit. Safe to call redundantly.
    pub fn mark_slot_used(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Places the tuple in the lowest free slot and stamps its record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<()> {
        if **tuple.desc() != *self.desc {
            return Err(Error::SchemaMismatch);
        }
        let Some(slot) = (0..self.slots.len()).find(|&i| !self.is_slot_used(i)) else {
            return Err(Error::PageFull(self.pid));
        };
        self.mark_slot_used(slot, true);
        tuple.set_record_id(Some(RecordId {
            page_id: self.pid,
            slot,
        }));
        self.slots[slot] = Some(tuple);
        Ok(())
    }

    /// Removes the tuple addressed by its record id, verifying that the slot
    /// still holds an equal tuple.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        if rid.page_id != self.pid || rid.slot >= self.slots.len() {
            return Err(Error::TupleNotOnPage);
        }
        if !self.is_slot_used(rid.slot) {
            return Err(Error::SlotEmpty);
        }
        match &self.slots[rid.slot] {
            Some(stored) if stored == tuple => {}
            _ => return Err(Error::TupleNotOnPage),
        }
        self.mark_slot_used(rid.slot, false);
        self.slots[rid.slot] = None;
        Ok(())
    }

    /// Tuples of occupied slots, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Cloned snapshot of the occupied slots, for callers that cannot hold a
    /// borrow of the page across their own suspension points.
    pub fn tuples(&self) -> Vec<Tuple> {
        self.iter().cloned().collect()
    }

    /// Tags the page as modified by `tid`, or clean when `None`.
    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirtier = tid;
    }

    /// The transaction that last dirtied this page, if it is dirty.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// Reconstructs the page as of its last captured before-image.
    pub fn before_image(&self) -> Result<HeapPage> {
        HeapPage::new(self.pid, &self.before_image, self.desc.clone())
    }

    pub fn before_image_data(&self) -> &[u8] {
        &self.before_image
    }

    /// Re-captures the before-image from the current contents. Called when
    /// the dirtying transaction commits.
    pub fn set_before_image(&mut self) {
        self.before_image = self.page_data();
    }
}

/// Pages compare by identity and serialized contents; the dirty tag and
/// before-image are runtime bookkeeping, not page state.
impl PartialEq for HeapPage {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid && self.page_data() == other.page_data()
    }
}
