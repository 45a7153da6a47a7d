//! Handle slot storage.
//!
//! A [`Slot`] is the unit native code points at. It is built only from
//! atomics so that a slot can be published by the allocating thread and read
//! by any other thread without a lock, and so that all-zero memory is a valid
//! free slot.
//!
//! Publication protocol:
//!
//! - writer: `object` (release), then `flags = IN_USE` (release)
//! - reader: `flags` (acquire), `object` (acquire), `version` (acquire)
//! - clearing bumps `version` before touching `flags` or `object`
//!
//! A reader that observes a re-published `object` therefore also observes the
//! bumped version and rejects the read.

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use crate::object::ObjectRef;

const IN_USE: u32 = 1 << 0;
const WEAK: u32 = 1 << 1;

/// One native reference to one managed object.
#[repr(C)]
#[derive(Debug)]
pub struct Slot {
    flags: AtomicU32,
    version: AtomicU32,
    object: AtomicPtr<()>,
}

/// Size of a slot in bytes; the unit of the `bytes` diagnostic.
pub const SLOT_SIZE: usize = std::mem::size_of::<Slot>();

impl Slot {
    /// A free slot. Identical to all-zero memory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: AtomicU32::new(0),
            version: AtomicU32::new(0),
            object: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Returns `true` if the slot currently backs a handle.
    #[inline]
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.flags.load(Ordering::Acquire) & IN_USE != 0
    }

    /// Returns `true` if the slot is in use and weak.
    #[inline]
    #[must_use]
    pub fn is_weak(&self) -> bool {
        self.flags.load(Ordering::Acquire) & (IN_USE | WEAK) == IN_USE | WEAK
    }

    /// Current version tag. Incremented every time the slot is freed.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    /// The referenced object, or `None` if the slot is free.
    #[inline]
    #[must_use]
    pub fn object(&self) -> Option<ObjectRef> {
        if !self.is_in_use() {
            return None;
        }
        ObjectRef::new(self.object.load(Ordering::Acquire))
    }

    /// The referenced object, provided the slot is still the incarnation
    /// identified by `version`.
    #[inline]
    pub(crate) fn load_versioned(&self, version: u32) -> Option<ObjectRef> {
        if !self.is_in_use() {
            return None;
        }
        let object = self.object.load(Ordering::Acquire);
        if self.version.load(Ordering::Acquire) != version {
            return None;
        }
        ObjectRef::new(object)
    }

    /// Fill a free slot and make it visible to other threads.
    ///
    /// Returns the version the new handle is bound to.
    pub(crate) fn publish(&self, object: ObjectRef, weak: bool) -> u32 {
        debug_assert!(!self.is_in_use(), "publishing into a live slot");

        self.object.store(object.as_ptr(), Ordering::Release);
        let flags = if weak { IN_USE | WEAK } else { IN_USE };
        self.flags.store(flags, Ordering::Release);
        self.version.load(Ordering::Relaxed)
    }

    pub(crate) fn set_weak(&self, weak: bool) {
        if weak {
            self.flags.fetch_or(WEAK, Ordering::Release);
        } else {
            self.flags.fetch_and(!WEAK, Ordering::Release);
        }
    }

    pub(crate) fn set_object(&self, object: ObjectRef) {
        self.object.store(object.as_ptr(), Ordering::Release);
    }

    /// Return the slot to the free state and retire its current version.
    pub(crate) fn clear(&self) {
        self.version.fetch_add(1, Ordering::Release);
        self.flags.store(0, Ordering::Release);
        self.object.store(ptr::null_mut(), Ordering::Release);
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}
