//! Process-global identity for [`IndexVar`](crate::ir::IndexVar) and
//! [`TensorVar`](crate::ir::TensorVar) handles.
//!
//! spec.md §5: "a process-wide unique-id generator for IndexVar/TensorVar
//! handles (atomic counter)". Identity, not display name, defines equality
//! for both kinds of variable (spec.md §3).

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque process-global handle. Equality and hashing are by id alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u64);

impl Id {
    pub fn fresh() -> Self {
        Id(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}
