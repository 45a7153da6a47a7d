//! Loom tests for the slot publication protocol.
//!
//! Mirrors the orderings used by `Slot`: the writer stores the object and
//! then the flags with release, the reader loads flags, object and version
//! with acquire, and clearing bumps the version before anything else.

use loom::sync::atomic::{AtomicPtr, AtomicU32, Ordering};
use loom::sync::Arc;

const IN_USE: u32 = 1;

struct ModelSlot {
    flags: AtomicU32,
    version: AtomicU32,
    object: AtomicPtr<()>,
}

impl ModelSlot {
    fn new() -> Self {
        Self {
            flags: AtomicU32::new(0),
            version: AtomicU32::new(0),
            object: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    fn publish(&self, object: usize) -> u32 {
        self.object
            .store(std::ptr::without_provenance_mut(object), Ordering::Release);
        self.flags.store(IN_USE, Ordering::Release);
        self.version.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.version.fetch_add(1, Ordering::Release);
        self.flags.store(0, Ordering::Release);
        self.object.store(std::ptr::null_mut(), Ordering::Release);
    }

    fn load_versioned(&self, version: u32) -> Option<usize> {
        if self.flags.load(Ordering::Acquire) & IN_USE == 0 {
            return None;
        }
        let object = self.object.load(Ordering::Acquire);
        if self.version.load(Ordering::Acquire) != version {
            return None;
        }
        Some(object.addr())
    }
}

/// A reader that sees the in-use flag also sees the object stored before it.
#[test]
#[ignore = "loom test - run with cargo test loom_publication --release -- --ignored"]
fn test_flag_implies_object() {
    loom::model(|| {
        let slot = Arc::new(ModelSlot::new());

        let writer = loom::thread::spawn({
            let slot = Arc::clone(&slot);
            move || slot.publish(0x1000)
        });

        let reader = loom::thread::spawn({
            let slot = Arc::clone(&slot);
            move || slot.load_versioned(0)
        });

        assert_eq!(writer.join().unwrap(), 0);
        let seen = reader.join().unwrap();
        assert!(seen.is_none() || seen == Some(0x1000), "torn read: {seen:?}");
    });
}

/// A reader holding the old version never observes the object of the slot's
/// next incarnation.
#[test]
#[ignore = "loom test - run with cargo test loom_publication --release -- --ignored"]
fn test_recycled_slot_rejects_old_version() {
    loom::model(|| {
        let slot = Arc::new(ModelSlot::new());
        let old = slot.publish(0x1000);

        let recycler = loom::thread::spawn({
            let slot = Arc::clone(&slot);
            move || {
                slot.clear();
                slot.publish(0x2000)
            }
        });

        let reader = loom::thread::spawn({
            let slot = Arc::clone(&slot);
            move || slot.load_versioned(old)
        });

        assert_eq!(recycler.join().unwrap(), old + 1);
        let seen = reader.join().unwrap();
        assert_ne!(seen, Some(0x2000), "old handle resolved to the new object");
    });
}
