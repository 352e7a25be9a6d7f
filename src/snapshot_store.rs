//! A thread-safe in-memory storage for the currently active flags snapshot. [`SnapshotStore`]
//! provides concurrent access for readers (flag evaluation) and writers (the synchronization
//! engine's refresh completion).
use std::sync::{Arc, RwLock};

use crate::flags::FlagsSnapshot;

/// `SnapshotStore` provides a thread-safe (`Sync`) storage for the flags snapshot that allows
/// concurrent access for readers and writers.
///
/// A snapshot is always immutable and can only be replaced completely; a reader holding an `Arc`
/// to a snapshot keeps a consistent view for the whole operation, unaffected by later writes.
pub struct SnapshotStore {
    snapshot: RwLock<Arc<FlagsSnapshot>>,
}

impl SnapshotStore {
    /// Create a store holding an empty snapshot.
    pub fn new() -> SnapshotStore {
        SnapshotStore::with_snapshot(FlagsSnapshot::empty())
    }

    /// Create a store seeded with the given snapshot (e.g., configured default flags).
    pub fn with_snapshot(snapshot: FlagsSnapshot) -> SnapshotStore {
        SnapshotStore {
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Get the currently active snapshot.
    pub fn get_snapshot(&self) -> Arc<FlagsSnapshot> {
        self.snapshot
            .read()
            .expect("thread holding snapshot lock should not panic")
            .clone()
    }

    /// Replace the snapshot wholesale.
    pub fn set_snapshot(&self, snapshot: Arc<FlagsSnapshot>) {
        let mut slot = self
            .snapshot
            .write()
            .expect("thread holding snapshot lock should not panic");
        *slot = snapshot;
    }
}

impl Default for SnapshotStore {
    fn default() -> SnapshotStore {
        SnapshotStore::new()
    }
}
