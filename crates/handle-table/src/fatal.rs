//! Unrecoverable handle table conditions.
//!
//! Both of these break the contract native code relies on, so the process is
//! aborted instead of unwinding through foreign frames.

use std::fmt;
use std::io;

#[cold]
#[inline(never)]
fn abort(args: fmt::Arguments<'_>) -> ! {
    crate::tracing::log_fatal(args);
    eprintln!("handle-table: fatal: {args}");
    std::process::abort()
}

/// Stable index space exhausted.
pub fn index_space_exhausted(slots: usize, max_handles: u64) -> ! {
    abort(format_args!(
        "handle index space exhausted: {slots} slots allocated, limit is {max_handles}"
    ))
}

/// The OS refused memory for a new chunk.
pub fn chunk_growth_failed(err: &io::Error) -> ! {
    abort(format_args!("failed to map handle chunk: {err}"))
}
