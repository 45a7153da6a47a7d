//! A GC-integrated handle table for native extensions.
//!
//! Native code cannot hold raw pointers to managed objects across a
//! collection: the collector may move the object or reclaim it. Instead it
//! holds a [`Handle`], an indirect reference through a slot the table owns.
//! The collector keeps strong handles pointing at their (possibly moved)
//! objects, and after every cycle the table prunes weak handles whose
//! referents died.
//!
//! # Layout
//!
//! - Slots live in fixed-capacity chunks mapped straight from the OS, so a
//!   slot's address never changes.
//! - Every slot has a stable 32-bit index, `chunk * chunk_capacity + offset`,
//!   for callers that need an integer identity instead of an address.
//! - Free slots are recycled through a free list that is rebuilt from scratch
//!   by each pruning sweep.
//!
//! # Lifecycle of a handle
//!
//! ```text
//! FREE -> IN_USE(strong) -> FREE                      (release)
//! FREE -> IN_USE(weak)   -> FREE                      (release, or pruned)
//!                        -> IN_USE(weak)              (kept by a sweep)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use handle_table::{
//!     Collector, GenerationContext, HandleDiagnostics, HandleTable, HandleTableConfig,
//!     MarkToken, ObjectRef,
//! };
//!
//! struct Heap;
//!
//! impl Collector for Heap {
//!     fn is_marked(&self, object: ObjectRef, _mark: MarkToken) -> bool {
//!         object.addr() % 32 == 0
//!     }
//!
//!     fn schedule_full_collection(&self, reason: &'static str, _: &HandleDiagnostics) {
//!         println!("collection requested: {reason}");
//!     }
//! }
//!
//! let config = HandleTableConfig { chunk_capacity: 4, ..HandleTableConfig::default() };
//! let mut table = HandleTable::with_config(Heap, config);
//!
//! let handles: Vec<_> = (1..=5)
//!     .map(|n| table.allocate_weak(ObjectRef::from_addr(n * 16).unwrap()))
//!     .collect();
//! assert_eq!(table.collection_count(), 1);
//!
//! let stats = table.deallocate_handles(&mut Vec::new(), MarkToken(1), GenerationContext::Mature);
//! assert_eq!(stats.kept, 2);
//! assert_eq!(table.live_count(), 2);
//! assert!(table.validate(handles[1]));
//! assert!(!table.validate(handles[0]));
//! ```
//!
//! # Thread Safety
//!
//! The table does no locking of its own. Allocation, release and sweeping take
//! `&mut self` and are expected to run under the embedding runtime's heap
//! lock; sweeping additionally assumes mutators are stopped. Published handles
//! can be read from any thread with [`Handle::load`].

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod allocator;
mod chunk;
mod collector;
mod config;
mod diagnostics;
mod fatal;
mod object;
mod slot;
mod table;
mod tracing;

// Re-export public API
pub use allocator::stable_index;
pub use collector::Collector;
pub use config::{HandleTableConfig, DEFAULT_CHUNK_CAPACITY, MAX_HANDLES};
pub use diagnostics::{HandleDiagnostics, HandleMetrics, SweepStats};
pub use object::{GenerationContext, MarkToken, ObjectRef};
pub use slot::{Slot, SLOT_SIZE};
pub use table::{Handle, HandleTable, GROWTH_REASON};
