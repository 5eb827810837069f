//! The slotted heap page: a fixed-size byte image holding a bitmap header
//! and an array of fixed-width tuple slots.

use bytes::BufMut;

use crate::error::StorageError;
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple, TupleDesc};

/// A unique identifier for a page: the owning table plus the page's
/// position in that table's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: u32,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table_id: u32, page_no: u32) -> PageId {
        PageId { table_id, page_no }
    }
}

/// An in-memory heap page.
///
/// The on-disk layout is a slot-occupancy bitmap (bit `i` set means slot
/// `i` holds a tuple, LSB-first within each byte) followed by the slot
/// array and zeroed trailing padding.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    desc: TupleDesc,
    slots: Vec<Option<Tuple>>,
    dirtier: Option<TransactionId>,
}

impl HeapPage {
    /// Number of tuple slots a page holds for the given schema: each slot
    /// costs its tuple size plus one header bit.
    pub fn slots_per_page(desc: &TupleDesc) -> usize {
        (crate::page_size() * 8) / (desc.size() * 8 + 1)
    }

    fn header_len(slot_count: usize) -> usize {
        slot_count.div_ceil(8)
    }

    /// A zeroed page image; decoding it yields a page with no occupied
    /// slots.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0; crate::page_size()]
    }

    /// Decodes a page from its on-disk image. `data` must be exactly one
    /// page long.
    pub fn new(pid: PageId, data: &[u8], desc: TupleDesc) -> Result<HeapPage, StorageError> {
        debug_assert_eq!(data.len(), crate::page_size());
        let slot_count = Self::slots_per_page(&desc);
        let header_len = Self::header_len(slot_count);
        let tuple_size = desc.size();

        let mut slots = Vec::with_capacity(slot_count);
        for slot in 0..slot_count {
            let used = data[slot / 8] & (1 << (slot % 8)) != 0;
            if used {
                let start = header_len + slot * tuple_size;
                let mut bytes = &data[start..start + tuple_size];
                let mut tuple = Tuple::decode(&desc, &mut bytes);
                tuple.set_record_id(Some(RecordId::new(pid, slot)));
                slots.push(Some(tuple));
            } else {
                slots.push(None);
            }
        }

        Ok(HeapPage {
            pid,
            desc,
            slots,
            dirtier: None,
        })
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn empty_slot_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    /// The tuple at `slot`, or `SlotEmpty` if its header bit is unset.
    pub fn tuple(&self, slot: usize) -> Result<&Tuple, StorageError> {
        self.slots
            .get(slot)
            .and_then(|slot| slot.as_ref())
            .ok_or(StorageError::SlotEmpty)
    }

    /// Places the tuple in the lowest-indexed empty slot and stamps its
    /// record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<(), StorageError> {
        if *tuple.tuple_desc() != self.desc {
            return Err(StorageError::SchemaMismatch);
        }
        let slot = self
            .slots
            .iter()
            .position(|slot| slot.is_none())
            .ok_or(StorageError::PageFull)?;
        tuple.set_record_id(Some(RecordId::new(self.pid, slot)));
        self.slots[slot] = Some(tuple.clone());
        Ok(())
    }

    /// Clears the slot named by the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<(), StorageError> {
        let rid = tuple.record_id().ok_or(StorageError::NotOnThisPage)?;
        if rid.page_id != self.pid {
            return Err(StorageError::NotOnThisPage);
        }
        match self.slots.get_mut(rid.slot) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(StorageError::SlotAlreadyEmpty),
        }
    }

    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirtier = tid;
    }

    /// The transaction that last dirtied this page, or `None` when clean.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// The tuples in occupied slots, in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Reconstructs the on-disk image, bit for bit.
    pub fn serialize(&self) -> Vec<u8> {
        let slot_count = self.slots.len();
        let header_len = Self::header_len(slot_count);
        let tuple_size = self.desc.size();

        let mut data = Vec::with_capacity(crate::page_size());
        let mut header = vec![0u8; header_len];
        for (slot, tuple) in self.slots.iter().enumerate() {
            if tuple.is_some() {
                header[slot / 8] |= 1 << (slot % 8);
            }
        }
        data.put_slice(&header);
        for tuple in &self.slots {
            match tuple {
                Some(tuple) => tuple.encode(&mut data),
                None => data.put_bytes(0, tuple_size),
            }
        }
        data.resize(crate::page_size(), 0);
        data
    }
}
