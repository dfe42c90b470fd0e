//! # Tacklebox
//!
//! Client-side cache and synchronization layer for small player-owned game
//! resources (gold, xp, a bag of bait items) that are authoritatively owned
//! by a remote service.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: immutable-per-version `{data, loading, error}` values
//!   fanned out to subscribers on every change
//! - **Stores**: one per resource; optimistic mutations with rollback,
//!   authoritative reconciliation, lazy one-time init
//! - **Realtime**: push-channel subscriptions translated into snapshot
//!   patches, with a full refresh as the safety net
//! - **Sessions**: login/logout transitions drive refresh, subscription
//!   scoping, and store resets
//!
//! ## Example
//!
//! ```ignore
//! use tacklebox::{ClientConfig, SyncClient};
//!
//! let client = SyncClient::new(identity, remote, channel, ClientConfig::default());
//!
//! // First observation initializes the store lazily.
//! let gold = client.gold().observe();
//! println!("balance: {} (loading: {})", gold.data, gold.loading);
//!
//! // Optimistic: subscribers see the speculative value immediately.
//! client.gold().adjust(10)?;
//! client.baits().adjust(3, -1)?;
//! ```

pub mod client;
pub mod error;
pub mod progress;
pub mod realtime;
pub mod remote;
pub mod session;
pub mod snapshot;
pub mod stores;
pub mod types;

// Re-exports
pub use client::{ClientConfig, SyncClient};
pub use error::{Result, SyncError};
pub use progress::{describe_xp, xp_to_next_step, MajorTier, ProgressDescriptor};
pub use realtime::{bag_signal, scalar_signal, BagSignal, RealtimeBridge, ScalarSignal};
pub use remote::{
    bounded_call, ChangeEvent, ChangeOp, IdentityProvider, PushChannel, RemoteBoundary,
    RemoteError, RowFilter, Subscription,
};
pub use session::{Generation, ManagedStore, SessionCoordinator};
pub use snapshot::{Snapshot, SnapshotCell, SnapshotPatch, SubscriberId, WatchGuard};
pub use stores::{BagStore, ScalarSpec, ScalarStore};
pub use types::*;
