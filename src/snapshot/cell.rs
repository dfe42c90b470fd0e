//! The minimal building block every resource store is built from.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A store's cached state at one version.
///
/// `data` is always well-defined; there is no "absent" state. A failed
/// refresh leaves the previous `data` in place and only sets `error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Snapshot<T> {
    /// Initial state: zero value, loading until the first refresh settles.
    pub fn initial(data: T) -> Self {
        Snapshot {
            data,
            loading: true,
            error: None,
        }
    }

    /// Idle state: zero value, nothing in flight, no error.
    pub fn idle(data: T) -> Self {
        Snapshot {
            data,
            loading: false,
            error: None,
        }
    }
}

/// A shallow structural merge against the current snapshot.
///
/// Unset fields keep their current value. `error` is itself optional-valued,
/// so a patch distinguishes "leave error alone" from "clear error".
pub struct SnapshotPatch<T> {
    data: Option<T>,
    loading: Option<bool>,
    error: Option<Option<String>>,
}

impl<T> SnapshotPatch<T> {
    pub fn new() -> Self {
        SnapshotPatch {
            data: None,
            loading: None,
            error: None,
        }
    }

    pub fn data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(Some(message.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    fn apply(self, snapshot: &mut Snapshot<T>) {
        if let Some(data) = self.data {
            snapshot.data = data;
        }
        if let Some(loading) = self.loading {
            snapshot.loading = loading;
        }
        if let Some(error) = self.error {
            snapshot.error = error;
        }
    }
}

impl<T> Default for SnapshotPatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for SnapshotPatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotPatch")
            .field("data", &self.data)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

/// Identifier of a registered subscriber.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

type Listener<T> = Arc<dyn Fn(&Snapshot<T>) + Send + Sync>;

/// A queued state change. Updates are computed against the state current at
/// apply time, which is what makes key-scoped collection patches safe under
/// interleaving.
enum Pending<T> {
    Patch(SnapshotPatch<T>),
    Update(Box<dyn FnOnce(&Snapshot<T>) -> SnapshotPatch<T> + Send>),
}

/// Holds one snapshot and fans every new version out to subscribers.
///
/// `set` and `update` are safe from any thread, including from inside a
/// subscriber callback: changes are queued and applied in submission order,
/// never re-entrantly, and each subscriber always observes a complete
/// snapshot value.
pub struct SnapshotCell<T: Clone> {
    state: RwLock<Snapshot<T>>,
    listeners: RwLock<HashMap<SubscriberId, Listener<T>>>,
    next_listener: AtomicU64,
    pending: Mutex<VecDeque<Pending<T>>>,
    /// Held by whichever thread is currently applying queued changes.
    drain: Mutex<()>,
}

impl<T: Clone> SnapshotCell<T> {
    pub fn new(initial: Snapshot<T>) -> Self {
        SnapshotCell {
            state: RwLock::new(initial),
            listeners: RwLock::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            pending: Mutex::new(VecDeque::new()),
            drain: Mutex::new(()),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Snapshot<T> {
        self.state.read().clone()
    }

    /// Merge a patch into the snapshot and notify subscribers.
    pub fn set(&self, patch: SnapshotPatch<T>) {
        self.pending.lock().push_back(Pending::Patch(patch));
        self.drain_queue();
    }

    /// Compute a patch from the state current at apply time, then merge it.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Snapshot<T>) -> SnapshotPatch<T> + Send + 'static,
    {
        self.pending.lock().push_back(Pending::Update(Box::new(f)));
        self.drain_queue();
    }

    /// Register a subscriber. Every subsequent applied change invokes it
    /// with the new snapshot. Notification order across subscribers is
    /// unspecified but complete.
    pub fn subscribe<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn(&Snapshot<T>) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(id, Arc::new(listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.listeners.write().remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Apply queued changes in order. Exactly one thread drains at a time;
    /// a change queued while another thread (or an outer frame of this
    /// thread, via a subscriber callback) is draining is picked up by that
    /// drainer before it returns.
    fn drain_queue(&self) {
        loop {
            let Some(guard) = self.drain.try_lock() else {
                return;
            };

            loop {
                let next = self.pending.lock().pop_front();
                let Some(item) = next else { break };

                let snapshot = {
                    let mut state = self.state.write();
                    let patch = match item {
                        Pending::Patch(patch) => patch,
                        Pending::Update(f) => f(&state),
                    };
                    patch.apply(&mut state);
                    state.clone()
                };
                self.notify(&snapshot);
            }

            drop(guard);

            // A patch may have been queued between the last pop and the
            // release above; re-check so it is not stranded.
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }

    fn notify(&self, snapshot: &Snapshot<T>) {
        let listeners: Vec<Listener<T>> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

/// RAII subscription to a cell; unsubscribes on drop.
pub struct WatchGuard<T: Clone + 'static> {
    cell: Arc<SnapshotCell<T>>,
    id: SubscriberId,
}

impl<T: Clone + 'static> WatchGuard<T> {
    pub fn new(cell: Arc<SnapshotCell<T>>, id: SubscriberId) -> Self {
        WatchGuard { cell, id }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl<T: Clone + 'static> Drop for WatchGuard<T> {
    fn drop(&mut self) {
        self.cell.unsubscribe(self.id);
    }
}
