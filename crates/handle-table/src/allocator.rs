//! Chunked slot allocator with free-list recycling.
//!
//! Slots are addressed by a stable index `chunk * chunk_capacity + offset`.
//! Every slot is either on the free list or marked in use, never both.
//! Chunks are only ever appended; they are released together when the
//! allocator drops. The first chunk is mapped lazily and counts as setup:
//! only later growth is reported as collection pressure.

use std::collections::HashMap;
use std::ptr::NonNull;

use crate::chunk::Chunk;
use crate::config::HandleTableConfig;
use crate::fatal;
use crate::slot::Slot;

/// Stable index of `offset` within chunk number `chunk`, or `None` if it does
/// not fit the 32-bit index space.
///
/// # Example
///
/// ```
/// use handle_table::stable_index;
///
/// assert_eq!(stable_index(2, 3, 1024), Some(2051));
/// assert_eq!(stable_index(1 << 22, 0, 1024), None);
/// ```
#[must_use]
pub fn stable_index(chunk: usize, offset: usize, chunk_capacity: usize) -> Option<u32> {
    chunk
        .checked_mul(chunk_capacity)
        .and_then(|base| base.checked_add(offset))
        .and_then(|index| u32::try_from(index).ok())
}

/// Result of [`Allocator::allocate`].
#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub index: u32,
    pub slot: NonNull<Slot>,
    /// A chunk beyond the first was added to satisfy this allocation.
    pub needs_gc: bool,
}

#[derive(Debug)]
pub struct Allocator {
    chunks: Vec<Chunk>,
    /// Page base address -> chunk number, for every page a chunk maps.
    pages: HashMap<usize, usize>,
    page_size: usize,
    chunk_capacity: usize,
    max_chunks: usize,
    max_handles: u64,
    /// Popped from the back.
    free_list: Vec<u32>,
    in_use: usize,
}

impl Allocator {
    pub fn new(config: &HandleTableConfig) -> Self {
        Self {
            chunks: Vec::new(),
            pages: HashMap::new(),
            page_size: sys_alloc::page_size(),
            chunk_capacity: config.chunk_capacity,
            max_chunks: config.max_chunks(),
            max_handles: config.max_handles,
            free_list: Vec::new(),
            in_use: 0,
        }
    }

    /// Take a free slot, growing by one chunk if none is left.
    ///
    /// The slot is counted as in use but not yet published; the caller fills
    /// it.
    pub fn allocate(&mut self) -> Allocation {
        let (index, needs_gc) = match self.free_list.pop() {
            Some(index) => (index, false),
            None => {
                let first_chunk = self.chunks.is_empty();
                (self.grow(), !first_chunk)
            }
        };
        self.in_use += 1;

        let Some(slot) = self.slot(index) else {
            unreachable!("free list held out-of-range index {index}");
        };
        debug_assert!(!slot.is_in_use(), "free list held live slot {index}");

        Allocation {
            index,
            slot: NonNull::from(slot),
            needs_gc,
        }
    }

    /// Append a chunk. Returns the index of its first slot, which is handed
    /// straight to the caller; the rest go on the free list.
    #[allow(clippy::cast_possible_truncation)]
    fn grow(&mut self) -> u32 {
        if self.chunks.len() >= self.max_chunks {
            fatal::index_space_exhausted(self.capacity(), self.max_handles);
        }
        let chunk_number = self.chunks.len();
        let Some(last) = stable_index(chunk_number, self.chunk_capacity - 1, self.chunk_capacity)
        else {
            fatal::index_space_exhausted(self.capacity(), self.max_handles);
        };

        let chunk = Chunk::new(self.chunk_capacity)
            .unwrap_or_else(|err| fatal::chunk_growth_failed(&err));
        let (base, len) = chunk.mapped_range();
        self.pages
            .extend((base..base + len).step_by(self.page_size).map(|page| (page, chunk_number)));
        self.chunks.push(chunk);

        // `last` fits in u32, so every index below it does too.
        let first = last - (self.chunk_capacity - 1) as u32;
        self.free_list.extend((first..last).map(|index| index + 1).rev());

        crate::tracing::log_chunk_growth(self.chunks.len(), self.chunk_capacity);
        first
    }

    #[inline]
    pub fn slot(&self, index: u32) -> Option<&Slot> {
        let index = index as usize;
        let chunk = self.chunks.get(index / self.chunk_capacity)?;
        chunk.slots().get(index % self.chunk_capacity)
    }

    /// Stable index of the slot at `ptr`, if this allocator owns it.
    ///
    /// Constant time: the page holding `ptr` identifies the only chunk that
    /// can contain it.
    pub fn index_of(&self, ptr: *const Slot) -> Option<u32> {
        let page = ptr.addr() & !(self.page_size - 1);
        let &number = self.pages.get(&page)?;
        let offset = self.chunks[number].offset_of(ptr)?;
        stable_index(number, offset, self.chunk_capacity)
    }

    /// Returns `true` iff `ptr` addresses a slot of this allocator and that
    /// slot is in use.
    ///
    /// Says nothing about which handle the caller thinks it holds: a slot
    /// recycled into a new handle validates here.
    pub fn validate(&self, ptr: *const Slot) -> bool {
        self.index_of(ptr)
            .and_then(|index| self.slot(index))
            .is_some_and(Slot::is_in_use)
    }

    /// Clear an in-use slot and put it back on the free list.
    pub fn release(&mut self, index: u32) {
        let Some(slot) = self.slot(index) else {
            return;
        };
        debug_assert!(slot.is_in_use(), "releasing free slot {index}");
        slot.clear();
        self.free_list.push(index);
        self.in_use -= 1;
    }

    /// Recompute the free list and in-use count from slot flags.
    ///
    /// `occupancy[i]` is `false` when chunk `i` holds no live slot; such
    /// chunks are returned to the free list whole without reading their
    /// slots.
    ///
    /// # Panics
    ///
    /// Panics if `occupancy` does not have one entry per chunk.
    #[allow(clippy::cast_possible_truncation)]
    pub fn rebuild_freelist(&mut self, occupancy: &[bool]) {
        assert_eq!(
            occupancy.len(),
            self.chunks.len(),
            "occupancy map does not match chunk count"
        );

        self.free_list.clear();
        self.in_use = 0;

        // Walk backwards so the lowest index ends up on top of the list.
        for (number, chunk) in self.chunks.iter().enumerate().rev() {
            let Some(base) = stable_index(number, 0, self.chunk_capacity) else {
                unreachable!("chunk {number} outside the index space");
            };
            for (offset, slot) in chunk.slots().iter().enumerate().rev() {
                if occupancy[number] && slot.is_in_use() {
                    self.in_use += 1;
                    continue;
                }
                debug_assert!(!slot.is_in_use(), "unoccupied chunk holds a live slot");
                self.free_list.push(base + offset as u32);
            }
        }
    }

    /// Clear every in-use slot. Returns how many were cleared.
    pub fn clear_all(&mut self) -> usize {
        let mut cleared = 0;
        for slot in self.chunks.iter().flat_map(Chunk::slots) {
            if slot.is_in_use() {
                slot.clear();
                cleared += 1;
            }
        }
        self.in_use = 0;
        cleared
    }

    pub fn chunks(&self) -> impl Iterator<Item = &[Slot]> + '_ {
        self.chunks.iter().map(Chunk::slots)
    }

    #[inline]
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunks.len() * self.chunk_capacity
    }
}
