//! Collector-side values the handle table consumes but does not define.

use std::fmt;
use std::ptr::{self, NonNull};

/// Address of a managed object.
///
/// The handle table stores, compares and hands these back, but never reads
/// through them. What lives at the address is the object model's business.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(NonNull<()>);

// SAFETY: an `ObjectRef` is an address token. Nothing in this crate
// dereferences it, so sharing it between threads cannot race on the referent.
unsafe impl Send for ObjectRef {}
unsafe impl Sync for ObjectRef {}

impl ObjectRef {
    /// Wraps a raw object pointer, returning `None` for null.
    #[inline]
    #[must_use]
    pub fn new(ptr: *mut ()) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Wraps a non-null object pointer.
    #[inline]
    #[must_use]
    pub const fn from_non_null(ptr: NonNull<()>) -> Self {
        Self(ptr)
    }

    /// Builds a reference from a bare address, e.g. one received over FFI.
    #[inline]
    #[must_use]
    pub fn from_addr(addr: usize) -> Option<Self> {
        Self::new(ptr::without_provenance_mut(addr))
    }

    /// The raw object pointer.
    #[inline]
    #[must_use]
    pub const fn as_ptr(self) -> *mut () {
        self.0.as_ptr()
    }

    /// The object's address.
    #[inline]
    #[must_use]
    pub fn addr(self) -> usize {
        self.0.as_ptr().addr()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", self.addr())
    }
}

/// Mark generation of a collection cycle.
///
/// An object is live for the sweep if the collector reports it marked under
/// the token passed to [`HandleTable::deallocate_handles`].
///
/// [`HandleTable::deallocate_handles`]: crate::HandleTable::deallocate_handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkToken(pub u32);

/// Which generation the finished collection covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationContext {
    /// A young-generation (minor) collection.
    Young,
    /// A mature-generation (full) collection.
    Mature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_rejected() {
        assert!(ObjectRef::new(ptr::null_mut()).is_none());
        assert!(ObjectRef::from_addr(0).is_none());
    }

    #[test]
    fn test_addr_round_trips_through_debug() {
        let obj = ObjectRef::from_addr(0x1000).unwrap();
        assert_eq!(obj.addr(), 0x1000);
        assert_eq!(format!("{obj:?}"), "ObjectRef(0x1000)");
    }
}
