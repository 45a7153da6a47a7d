//! Handle table tracing support.
//!
//! When the `tracing` feature is enabled, this module provides structured
//! spans and events for growth, sweeps and fatal conditions. Without it every
//! helper is an empty inline function.

#[cfg(feature = "tracing")]
mod internal {
    use std::fmt;

    use ::tracing::{span, Level};

    use crate::object::{GenerationContext, MarkToken};

    /// Guard for the span covering one pruning sweep.
    pub type SweepSpan = span::EnteredSpan;

    /// Create a span for a pruning sweep.
    pub fn span_sweep(mark: MarkToken, generation: GenerationContext) -> SweepSpan {
        span!(
            Level::DEBUG,
            "handle_sweep",
            mark = mark.0,
            generation = ?generation
        )
        .entered()
    }

    pub fn log_chunk_growth(chunks: usize, capacity: usize) {
        ::tracing::debug!(chunks, capacity, "chunk_growth");
    }

    pub fn log_collection_requested(reason: &str, collections: usize) {
        ::tracing::debug!(reason, collections, "full_collection_requested");
    }

    pub fn log_young_weak_retained(count: usize) {
        ::tracing::trace!(count, "young_weak_retained");
    }

    pub fn log_sweep_complete(kept: usize, reclaimed: usize, bytes: usize) {
        ::tracing::debug!(kept, reclaimed, bytes, "sweep_complete");
    }

    pub fn log_shutdown(cleared: usize) {
        ::tracing::debug!(cleared, "shutdown");
    }

    pub fn log_fatal(args: fmt::Arguments<'_>) {
        ::tracing::error!(message = %args, "fatal");
    }
}

#[cfg(not(feature = "tracing"))]
#[allow(clippy::missing_const_for_fn)]
mod internal {
    use std::fmt;

    use crate::object::{GenerationContext, MarkToken};

    /// Stub span guard when tracing is disabled.
    pub struct SweepSpan;

    #[inline]
    pub fn span_sweep(_mark: MarkToken, _generation: GenerationContext) -> SweepSpan {
        SweepSpan
    }

    #[inline]
    pub fn log_chunk_growth(_chunks: usize, _capacity: usize) {}

    #[inline]
    pub fn log_collection_requested(_reason: &str, _collections: usize) {}

    #[inline]
    pub fn log_young_weak_retained(_count: usize) {}

    #[inline]
    pub fn log_sweep_complete(_kept: usize, _reclaimed: usize, _bytes: usize) {}

    #[inline]
    pub fn log_shutdown(_cleared: usize) {}

    #[inline]
    pub fn log_fatal(_args: fmt::Arguments<'_>) {}
}

pub use internal::*;
