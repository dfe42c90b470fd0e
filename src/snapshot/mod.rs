//! Snapshot container: immutable-per-version state plus subscriber fan-out.

mod cell;

pub use cell::{Snapshot, SnapshotCell, SnapshotPatch, SubscriberId, WatchGuard};
