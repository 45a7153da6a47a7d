//! Fixed-capacity blocks of handle slots.

use std::io;

use sys_alloc::Mapping;

use crate::slot::{Slot, SLOT_SIZE};

/// A block of `capacity` slots backed by its own page mapping.
///
/// The mapping never moves, so slot addresses stay valid until the chunk is
/// dropped together with the rest of the table.
#[derive(Debug)]
pub struct Chunk {
    mapping: Mapping,
    capacity: usize,
}

impl Chunk {
    /// Map a new chunk with every slot free.
    pub fn new(capacity: usize) -> io::Result<Self> {
        let bytes = capacity.checked_mul(SLOT_SIZE).ok_or_else(|| {
            io::Error::new(io::ErrorKind::OutOfMemory, "chunk size overflows")
        })?;
        let mapping = Mapping::zeroed(bytes)?;
        debug_assert!(mapping.len() >= bytes);

        Ok(Self { mapping, capacity })
    }

    #[inline]
    pub fn slots(&self) -> &[Slot] {
        // SAFETY: the mapping is page aligned, at least `capacity * SLOT_SIZE`
        // bytes long and zero-filled. Zero bits are a valid free `Slot`, and
        // all later mutation goes through the slot's atomics.
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            std::slice::from_raw_parts(self.mapping.ptr().cast::<Slot>(), self.capacity)
        }
    }

    /// Start address and length of the backing mapping.
    #[inline]
    pub fn mapped_range(&self) -> (usize, usize) {
        (self.mapping.ptr().addr(), self.mapping.len())
    }

    /// Offset of `ptr` within this chunk, if it points exactly at one of its
    /// slots.
    pub fn offset_of(&self, ptr: *const Slot) -> Option<usize> {
        let addr = ptr.addr();
        if !self.mapping.contains(addr) {
            return None;
        }
        let delta = addr - self.mapping.ptr().addr();
        if delta % SLOT_SIZE != 0 {
            return None;
        }
        let offset = delta / SLOT_SIZE;
        (offset < self.capacity).then_some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chunk_is_all_free() {
        let chunk = Chunk::new(64).unwrap();
        assert_eq!(chunk.slots().len(), 64);
        assert!(chunk.slots().iter().all(|slot| !slot.is_in_use()));
    }

    #[test]
    fn test_offset_of_accepts_slot_addresses_only() {
        let chunk = Chunk::new(8).unwrap();
        let base: *const Slot = chunk.slots().as_ptr();

        assert_eq!(chunk.offset_of(base), Some(0));
        assert_eq!(chunk.offset_of(base.wrapping_add(7)), Some(7));
        // Past the last slot but still inside the mapped page.
        assert_eq!(chunk.offset_of(base.wrapping_add(8)), None);
        // Misaligned.
        assert_eq!(
            chunk.offset_of(base.cast::<u8>().wrapping_add(1).cast::<Slot>()),
            None
        );
        assert_eq!(chunk.offset_of(std::ptr::null()), None);
    }
}
