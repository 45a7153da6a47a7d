//! Shared test collector.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use handle_table::{
    Collector, HandleDiagnostics, HandleTable, HandleTableConfig, MarkToken, ObjectRef,
    MAX_HANDLES,
};
use parking_lot::Mutex;

/// A collector whose mark bits and forwarding table are set by the test.
#[derive(Default)]
pub struct RecordingCollector {
    marked: Mutex<HashSet<(usize, u32)>>,
    forwarding: Mutex<HashMap<usize, ObjectRef>>,
    requests: Mutex<Vec<(&'static str, usize)>>,
}

impl RecordingCollector {
    pub fn mark(&self, object: ObjectRef, mark: MarkToken) {
        self.marked.lock().insert((object.addr(), mark.0));
    }

    pub fn unmark(&self, object: ObjectRef, mark: MarkToken) {
        self.marked.lock().remove(&(object.addr(), mark.0));
    }

    pub fn forward(&self, from: ObjectRef, to: ObjectRef) {
        self.forwarding.lock().insert(from.addr(), to);
    }

    /// `(reason, collections counter seen by the collector)` per request.
    pub fn requests(&self) -> Vec<(&'static str, usize)> {
        self.requests.lock().clone()
    }
}

impl Collector for RecordingCollector {
    fn is_marked(&self, object: ObjectRef, mark: MarkToken) -> bool {
        self.marked.lock().contains(&(object.addr(), mark.0))
    }

    fn forwarded(&self, object: ObjectRef) -> Option<ObjectRef> {
        self.forwarding.lock().get(&object.addr()).copied()
    }

    fn schedule_full_collection(&self, reason: &'static str, diagnostics: &HandleDiagnostics) {
        self.requests.lock().push((reason, diagnostics.collections()));
    }
}

/// A distinct fake object address.
pub fn object(n: usize) -> ObjectRef {
    ObjectRef::from_addr(0x10_0000 + n * 16).expect("non-null address")
}

pub fn table_with_capacity(chunk_capacity: usize) -> HandleTable<RecordingCollector> {
    HandleTable::with_config(
        RecordingCollector::default(),
        HandleTableConfig {
            chunk_capacity,
            max_handles: MAX_HANDLES,
        },
    )
}
