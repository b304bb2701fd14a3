//! Revision numbers
//!
//! Rings, headlands and tracks are replaced whole rather than edited, each new instance takes a
//! fresh revision so that anything derived from an older instance can tell it is out of date.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// Get a revision number which has not been handed out before in this process.
pub fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}
