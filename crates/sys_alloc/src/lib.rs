//! Zeroed, address-stable page mappings.
//!
//! Handle chunks live in anonymous OS mappings rather than the global heap:
//! the memory arrives zero-filled, never moves for the lifetime of the
//! mapping, and is handed back to the OS as a unit when the mapping drops.

use std::io;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as os;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as os;

pub use os::page_size;

/// Rounds `len` up to a whole number of pages.
///
/// Returns `None` if the rounded length overflows `usize`.
#[must_use]
pub fn round_to_pages(len: usize) -> Option<usize> {
    let page = page_size();
    len.checked_add(page - 1).map(|n| n & !(page - 1))
}

/// An anonymous read/write mapping.
///
/// The region is unmapped when this value is dropped. Every byte is zero on
/// creation.
pub struct Mapping {
    inner: os::MappingInner,
}

impl Mapping {
    /// Maps at least `len` bytes of zeroed memory.
    ///
    /// The length is rounded up to the page size, so the returned pointer is
    /// page aligned and suitable for any `#[repr(C)]` element type whose
    /// alignment does not exceed a page.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero or overflowing length, and the OS
    /// error if the mapping itself fails.
    pub fn zeroed(len: usize) -> io::Result<Self> {
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "mapping length must be greater than 0",
            ));
        }
        let len = round_to_pages(len).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "mapping length overflows")
        })?;

        // SAFETY: anonymous mapping with no placement hint; the OS picks a
        // fresh region that aliases nothing else.
        let inner = unsafe { os::MappingInner::map_zeroed(len)? };
        Ok(Self { inner })
    }

    /// Start of the mapped region.
    #[must_use]
    pub fn ptr(&self) -> *mut u8 {
        self.inner.ptr()
    }

    /// Length of the mapped region in bytes (a multiple of the page size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Always `false`: zero-length mappings are rejected at creation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Returns `true` if `addr` lies inside `[ptr, ptr + len)`.
    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        let start = self.ptr() as usize;
        addr >= start && addr - start < self.len()
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("ptr", &self.ptr())
            .field("len", &self.len())
            .finish()
    }
}

// SAFETY: the mapping is plain memory owned by this value; access to its
// contents is synchronised by whoever hands out pointers into it.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size() {
        let ps = page_size();
        assert!(ps > 0);
        assert_eq!(ps & (ps - 1), 0, "Page size should be power of 2");
    }

    #[test]
    fn test_round_to_pages() {
        let ps = page_size();
        assert_eq!(round_to_pages(1), Some(ps));
        assert_eq!(round_to_pages(ps), Some(ps));
        assert_eq!(round_to_pages(ps + 1), Some(2 * ps));
        assert_eq!(round_to_pages(usize::MAX), None);
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = Mapping::zeroed(0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_mapping_is_zeroed_and_writable() {
        let mapping = Mapping::zeroed(100).expect("failed to map");
        assert_eq!(mapping.len(), page_size());
        assert_eq!(mapping.ptr() as usize % page_size(), 0);

        // SAFETY: the region is `mapping.len()` bytes, all owned by `mapping`.
        let bytes = unsafe { std::slice::from_raw_parts_mut(mapping.ptr(), mapping.len()) };
        assert!(bytes.iter().all(|&b| b == 0));
        bytes[0] = 42;
        bytes[mapping.len() - 1] = 7;
        assert_eq!(bytes[0], 42);
    }

    #[test]
    fn test_contains() {
        let mapping = Mapping::zeroed(1).expect("failed to map");
        let start = mapping.ptr() as usize;
        assert!(mapping.contains(start));
        assert!(mapping.contains(start + mapping.len() - 1));
        assert!(!mapping.contains(start + mapping.len()));
        assert!(!mapping.contains(start.wrapping_sub(1)));
    }
}
