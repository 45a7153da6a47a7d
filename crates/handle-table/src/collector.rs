//! The narrow interface the handle table needs from the collector.

use crate::diagnostics::HandleDiagnostics;
use crate::object::{MarkToken, ObjectRef};

/// Collector and object-model queries consumed by the handle table.
///
/// The table never traces or moves objects itself. It asks the collector
/// whether an object survived, where a moved object went, and to schedule a
/// full collection when native handle pressure grows.
pub trait Collector {
    /// Returns `true` if `object` is marked live under `mark`.
    fn is_marked(&self, object: ObjectRef, mark: MarkToken) -> bool;

    /// New location of `object` if the collector moved it.
    fn forwarded(&self, object: ObjectRef) -> Option<ObjectRef> {
        let _ = object;
        None
    }

    /// Request a full collection.
    ///
    /// Called once per chunk the table grows by after its first one.
    /// `diagnostics` already includes the request being made.
    fn schedule_full_collection(&self, reason: &'static str, diagnostics: &HandleDiagnostics);
}
