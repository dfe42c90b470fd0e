//! Drives store refresh/subscription lifecycles from identity transitions.

use crate::remote::{IdentityProvider, Subscription};
use crate::types::Identity;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Monotonic counter bumped on every identity transition.
///
/// A store samples the generation before issuing a remote call and checks
/// it again when the call completes; a mismatch means the session changed
/// underneath the call and its result must not touch the (re)initialized
/// store.
#[derive(Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Generation(Arc::new(AtomicU64::new(0)))
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// The store-side surface the coordinator drives.
pub trait ManagedStore: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `ensure_init` has run. Uninitialized stores are skipped;
    /// their own `ensure_init` performs the first-login equivalent.
    fn initialized(&self) -> bool;

    /// Refresh from the remote, then (re)open the realtime subscription
    /// scoped to `identity`.
    fn activate(&self, identity: &Identity);

    /// Close the realtime subscription and reset to the idle-empty state.
    fn deactivate(&self);
}

/// Listens to identity transitions and walks every registered store through
/// login/logout. An identity switch is a logout immediately followed by a
/// login; a repeated notification for the current identity is a no-op.
pub struct SessionCoordinator {
    identity: Arc<dyn IdentityProvider>,
    stores: RwLock<Vec<Arc<dyn ManagedStore>>>,
    generation: Generation,
    /// Last identity acted upon; also serializes transitions.
    current: Mutex<Option<Identity>>,
    watch: Mutex<Option<Box<dyn Subscription>>>,
}

impl SessionCoordinator {
    pub fn new(identity: Arc<dyn IdentityProvider>, generation: Generation) -> Arc<Self> {
        Arc::new(SessionCoordinator {
            identity,
            stores: RwLock::new(Vec::new()),
            generation,
            current: Mutex::new(None),
            watch: Mutex::new(None),
        })
    }

    pub fn generation(&self) -> Generation {
        self.generation.clone()
    }

    pub fn register(&self, store: Arc<dyn ManagedStore>) {
        self.stores.write().push(store);
    }

    /// Install the identity watch. Also records the identity current at
    /// start time so a later duplicate notification is recognized.
    pub fn start(self: Arc<Self>) {
        *self.current.lock() = self.identity.current_identity();

        let weak: Weak<SessionCoordinator> = Arc::downgrade(&self);
        let handle = self.identity.watch_identity(Box::new(move |next| {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.transition(next);
            }
        }));
        *self.watch.lock() = Some(handle);
    }

    /// Cancel the identity watch and tear down every store's subscription.
    pub fn stop(&self) {
        if let Some(mut handle) = self.watch.lock().take() {
            handle.close();
        }
        for store in self.stores.read().iter() {
            store.deactivate();
        }
    }

    /// Apply one identity transition. Transitions are serialized; a
    /// notification carrying the identity already in effect does nothing.
    pub fn transition(&self, next: Option<Identity>) {
        let mut current = self.current.lock();
        if *current == next {
            debug!(identity = ?next, "duplicate identity notification, no-op");
            return;
        }
        let previous = current.clone();
        *current = next.clone();

        if previous.is_some() {
            let generation = self.generation.bump();
            debug!(identity = ?previous, generation, "session logout");
            for store in self.initialized_stores() {
                store.deactivate();
            }
        }

        if let Some(identity) = next {
            let generation = self.generation.bump();
            debug!(%identity, generation, "session login");
            for store in self.initialized_stores() {
                store.activate(&identity);
            }
        }
    }

    fn initialized_stores(&self) -> Vec<Arc<dyn ManagedStore>> {
        self.stores
            .read()
            .iter()
            .filter(|s| s.initialized())
            .cloned()
            .collect()
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Some(mut handle) = self.watch.lock().take() {
            handle.close();
        }
    }
}
