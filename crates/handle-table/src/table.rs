//! The handle table facade used by native-facing code and the collector.

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use crate::allocator::{Allocation, Allocator};
use crate::collector::Collector;
use crate::config::HandleTableConfig;
use crate::diagnostics::{HandleDiagnostics, SweepStats};
use crate::object::{GenerationContext, MarkToken, ObjectRef};
use crate::slot::{Slot, SLOT_SIZE};

/// Reason passed to [`Collector::schedule_full_collection`] on table growth.
pub const GROWTH_REASON: &str = "native handles";

/// A reference to one slot incarnation.
///
/// Captures the slot address, its stable index and the slot version current
/// when the handle was allocated. Once the handle is released or pruned the
/// version moves on and every check made through this value fails, even if
/// the slot has since been recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    slot: NonNull<Slot>,
    index: u32,
    version: u32,
}

// SAFETY: a `Handle` is an address plus two integers. Reads through it go via
// the slot's atomics (see `Handle::load`).
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl Handle {
    /// Stable 32-bit index of the slot.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Slot version this handle is bound to.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Raw slot address, the value handed to native code.
    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *const Slot {
        self.slot.as_ptr()
    }

    /// Read the referenced object without going through the table.
    ///
    /// Safe to call from any thread concurrently with allocation: the slot's
    /// acquire loads pair with the release stores made when it was published.
    /// Returns `None` if the handle has been released or pruned.
    ///
    /// # Safety
    ///
    /// The table that issued this handle must still be alive.
    #[inline]
    #[must_use]
    pub unsafe fn load(&self) -> Option<ObjectRef> {
        // SAFETY: the caller guarantees the owning table, and therefore the
        // chunk mapping, outlives this call.
        unsafe { self.slot.as_ref() }.load_versioned(self.version)
    }
}

/// Handle table for native references to managed objects.
///
/// Mutating operations take `&mut self`: the embedding runtime drives the
/// table under whatever lock already guards heap mutation. Handles that have
/// been returned may be read from other threads at the same time through
/// [`Handle::load`].
///
/// # Example
///
/// ```
/// use handle_table::{
///     Collector, GenerationContext, HandleDiagnostics, HandleTable, MarkToken, ObjectRef,
/// };
///
/// struct NothingMarked;
///
/// impl Collector for NothingMarked {
///     fn is_marked(&self, _object: ObjectRef, _mark: MarkToken) -> bool {
///         false
///     }
///
///     fn schedule_full_collection(&self, _reason: &'static str, _: &HandleDiagnostics) {}
/// }
///
/// let mut table = HandleTable::new(NothingMarked);
/// let object = ObjectRef::from_addr(0x1000).unwrap();
///
/// let strong = table.allocate(object);
/// let weak = table.allocate_weak(object);
/// assert!(table.validate(strong) && table.validate(weak));
///
/// table.deallocate_handles(&mut Vec::new(), MarkToken(1), GenerationContext::Mature);
/// assert!(table.validate(strong));
/// assert!(!table.validate(weak));
/// ```
pub struct HandleTable<C: Collector> {
    allocator: Allocator,
    diagnostics: Arc<HandleDiagnostics>,
    collector: C,
    config: HandleTableConfig,
}

impl<C: Collector> HandleTable<C> {
    /// Create an empty table with the default configuration.
    pub fn new(collector: C) -> Self {
        Self::with_config(collector, HandleTableConfig::default())
    }

    /// Create an empty table.
    ///
    /// # Panics
    ///
    /// Panics if `config.chunk_capacity` is zero or larger than
    /// `config.max_handles`, or if `config.max_handles` exceeds
    /// [`MAX_HANDLES`](crate::MAX_HANDLES).
    pub fn with_config(collector: C, config: HandleTableConfig) -> Self {
        config.assert_valid();
        Self {
            allocator: Allocator::new(&config),
            diagnostics: Arc::new(HandleDiagnostics::new()),
            collector,
            config,
        }
    }

    /// The collector this table reports to.
    #[inline]
    #[must_use]
    pub const fn collector(&self) -> &C {
        &self.collector
    }

    /// The configuration the table was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &HandleTableConfig {
        &self.config
    }

    /// Allocate a strong handle for `object`.
    ///
    /// If no free slot was left the table grows by one chunk. Growth past the
    /// first chunk also asks the collector for a full collection; the
    /// allocation itself still succeeds.
    ///
    /// Aborts the process if growth would exceed the index space or the OS
    /// refuses memory for the new chunk.
    pub fn allocate(&mut self, object: ObjectRef) -> Handle {
        self.publish(object, false)
    }

    /// Allocate a weak handle for `object`.
    ///
    /// Weak handles are cleared by [`deallocate_handles`](Self::deallocate_handles)
    /// once their object is no longer marked.
    pub fn allocate_weak(&mut self, object: ObjectRef) -> Handle {
        self.publish(object, true)
    }

    /// Allocate a strong handle for `object` and return its stable index.
    ///
    /// Aborts the process rather than hand out an index past the 32-bit
    /// identity space.
    pub fn allocate_index(&mut self, object: ObjectRef) -> u32 {
        self.publish(object, false).index
    }

    fn publish(&mut self, object: ObjectRef, weak: bool) -> Handle {
        let Allocation {
            index,
            slot,
            needs_gc,
        } = self.allocator.allocate();

        // SAFETY: the allocator just handed out this slot; its chunk lives as
        // long as `self`.
        let version = unsafe { slot.as_ref() }.publish(object, weak);
        debug_assert!(self.allocator.validate(slot.as_ptr()));

        if needs_gc {
            let collections = self.diagnostics.record_collection_request();
            crate::tracing::log_collection_requested(GROWTH_REASON, collections);
            self.collector
                .schedule_full_collection(GROWTH_REASON, &self.diagnostics);
        }

        Handle {
            slot,
            index,
            version,
        }
    }

    /// Slot behind `handle` if it belongs to this table.
    fn slot_of(&self, handle: Handle) -> Option<&Slot> {
        self.allocator
            .slot(handle.index)
            .filter(|slot| ptr::eq(*slot, handle.as_ptr()))
    }

    /// Slot behind `handle` if it belongs to this table and is still the
    /// incarnation the handle was issued for.
    fn live_slot(&self, handle: Handle) -> Option<&Slot> {
        self.slot_of(handle)
            .filter(|slot| slot.is_in_use() && slot.version() == handle.version)
    }

    /// Returns `true` if `handle` was issued by this table and has not been
    /// released or pruned since.
    #[must_use]
    pub fn validate(&self, handle: Handle) -> bool {
        self.live_slot(handle).is_some()
    }

    /// Returns `true` if `ptr` addresses an in-use slot of this table.
    ///
    /// Constant time regardless of how many chunks the table holds.
    ///
    /// Intended for addresses coming back from untrusted native code. There is
    /// no version to compare, so an address kept past its handle's release
    /// validates once the slot is recycled; prefer [`validate`](Self::validate)
    /// when a [`Handle`] is available.
    #[must_use]
    pub fn validate_ptr(&self, ptr: *const Slot) -> bool {
        self.allocator.validate(ptr)
    }

    /// Returns `true` if `index` names an in-use slot.
    #[must_use]
    pub fn validate_index(&self, index: u32) -> bool {
        self.allocator.slot(index).is_some_and(Slot::is_in_use)
    }

    /// Rebuild the [`Handle`] for a stable index, bound to the slot's current
    /// version.
    #[must_use]
    pub fn handle_from_index(&self, index: u32) -> Option<Handle> {
        let slot = self.allocator.slot(index).filter(|slot| slot.is_in_use())?;
        Some(Handle {
            slot: NonNull::from(slot),
            index,
            version: slot.version(),
        })
    }

    /// Rebuild the [`Handle`] for a raw slot address.
    #[must_use]
    pub fn handle_from_ptr(&self, ptr: *const Slot) -> Option<Handle> {
        self.handle_from_index(self.allocator.index_of(ptr)?)
    }

    /// The object `handle` refers to, or `None` for a stale handle.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<ObjectRef> {
        self.slot_of(handle)?.load_versioned(handle.version)
    }

    /// `Some(true)` for a live weak handle, `Some(false)` for a live strong
    /// one, `None` for a stale handle.
    #[must_use]
    pub fn is_weak(&self, handle: Handle) -> Option<bool> {
        self.live_slot(handle).map(Slot::is_weak)
    }

    /// Switch a live handle between strong and weak. Returns `false` for a
    /// stale handle.
    pub fn set_weak(&mut self, handle: Handle, weak: bool) -> bool {
        let Some(slot) = self.live_slot(handle) else {
            return false;
        };
        slot.set_weak(weak);
        true
    }

    /// Release a handle explicitly. Its slot is immediately reusable.
    ///
    /// Returns `false`, changing nothing, if the handle is stale.
    pub fn release(&mut self, handle: Handle) -> bool {
        if !self.validate(handle) {
            return false;
        }
        self.allocator.release(handle.index);
        true
    }

    /// Objects referenced by strong handles.
    ///
    /// The collector treats these as roots while marking.
    pub fn strong_roots(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.allocator
            .chunks()
            .flatten()
            .filter(|slot| slot.is_in_use() && !slot.is_weak())
            .filter_map(Slot::object)
    }

    /// Point strong handles at the new location of objects the collector
    /// moved. Returns how many handles were rewritten.
    ///
    /// Runs as part of the collector's reference-fixing pass, with mutators
    /// stopped, before [`deallocate_handles`](Self::deallocate_handles).
    pub fn update_strong_references(&mut self) -> usize {
        let mut updated = 0;
        for slot in self.allocator.chunks().flatten() {
            if !slot.is_in_use() || slot.is_weak() {
                continue;
            }
            let Some(object) = slot.object() else {
                continue;
            };
            if let Some(moved) = self.collector.forwarded(object) {
                slot.set_object(moved);
                updated += 1;
            }
        }
        updated
    }

    /// Post-collection pruning sweep.
    ///
    /// Called once per collection cycle, with mutators stopped, after strong
    /// references have been fixed up. Clears weak handles whose object is not
    /// marked under `mark`, drops stale entries from `cached`, rebuilds the
    /// free list and refreshes the `objects` and `bytes` diagnostics.
    ///
    /// During a [`GenerationContext::Young`] sweep weak handles are kept
    /// without consulting the collector: a minor collection's mark token says
    /// nothing about mature objects, and clearing a weak handle to a live
    /// object cannot be undone.
    pub fn deallocate_handles(
        &mut self,
        cached: &mut Vec<Handle>,
        mark: MarkToken,
        generation: GenerationContext,
    ) -> SweepStats {
        let _span = crate::tracing::span_sweep(mark, generation);

        let mut occupancy = vec![false; self.allocator.chunk_count()];
        let mut stats = SweepStats::default();

        for (number, slots) in self.allocator.chunks().enumerate() {
            for slot in slots {
                if !slot.is_in_use() {
                    continue;
                }

                let keep = if !slot.is_weak() {
                    true
                } else {
                    match generation {
                        GenerationContext::Young => {
                            stats.young_weak_retained += 1;
                            true
                        }
                        GenerationContext::Mature => slot
                            .object()
                            .is_some_and(|object| self.collector.is_marked(object, mark)),
                    }
                };

                if keep {
                    occupancy[number] = true;
                    stats.kept += 1;
                } else {
                    slot.clear();
                    stats.reclaimed += 1;
                }
            }
        }

        if stats.young_weak_retained > 0 {
            crate::tracing::log_young_weak_retained(stats.young_weak_retained);
        }

        let before = cached.len();
        cached.retain(|handle| self.validate(*handle));
        stats.cache_pruned = before - cached.len();

        self.allocator.rebuild_freelist(&occupancy);
        debug_assert_eq!(self.allocator.in_use(), stats.kept);

        let bytes = self.allocator.in_use() * SLOT_SIZE;
        self.diagnostics.record_sweep(stats.kept, bytes);
        crate::tracing::log_sweep_complete(stats.kept, stats.reclaimed, bytes);

        stats
    }

    /// Shared diagnostics counters.
    #[must_use]
    pub fn diagnostics(&self) -> Arc<HandleDiagnostics> {
        Arc::clone(&self.diagnostics)
    }

    /// Live handles as of the last sweep.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.diagnostics.objects()
    }

    /// Bytes of slot storage in use as of the last sweep.
    #[inline]
    #[must_use]
    pub fn bytes_in_use(&self) -> usize {
        self.diagnostics.bytes()
    }

    /// Growth-triggered collection requests so far.
    #[inline]
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.diagnostics.collections()
    }

    /// Handles currently in use.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.allocator.in_use()
    }

    /// Returns `true` if no handle is in use.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocator.in_use() == 0
    }

    /// Slots ready for reuse without growing.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.allocator.free_count()
    }

    /// Chunks allocated so far.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.allocator.chunk_count()
    }

    /// Total slots across all chunks.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.allocator.capacity()
    }

    /// Tear the table down, clearing every handle still in use before the
    /// chunk storage is unmapped.
    ///
    /// Dropping the table does the same; this spelling makes the lifecycle
    /// event explicit at the call site.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl<C: Collector> Drop for HandleTable<C> {
    fn drop(&mut self) {
        let cleared = self.allocator.clear_all();
        self.diagnostics.record_sweep(0, 0);
        crate::tracing::log_shutdown(cleared);
    }
}

impl<C: Collector> fmt::Debug for HandleTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleTable")
            .field("in_use", &self.allocator.in_use())
            .field("chunks", &self.allocator.chunk_count())
            .field("chunk_capacity", &self.allocator.chunk_capacity())
            .field("diagnostics", &self.diagnostics.snapshot())
            .finish_non_exhaustive()
    }
}
