//! Store for the bag of consumable bait items.

use crate::error::{Result, SyncError};
use crate::realtime::{bag_signal, BagSignal, RealtimeBridge};
use crate::remote::{bounded_call, ChangeEvent, IdentityProvider, PushChannel, RemoteBoundary};
use crate::session::{Generation, ManagedStore};
use crate::snapshot::{Snapshot, SnapshotCell, SnapshotPatch, WatchGuard};
use crate::types::{AdjustedEntry, BagEntry, Identity};
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Once, Weak};
use std::time::Duration;
use tracing::{debug, warn};

const READ_PROC: &str = "get_my_baits";
const ADJUST_PROC: &str = "adjust_my_bait";
const TABLE: &str = "user_bait";
const FILTER_COLUMN: &str = "user_id";

/// Cached view of the bait bag, keyed by entry id.
///
/// Entries persist at `qty = 0` rather than being removed, so the bag is a
/// superset of everything the player has ever held. All rollback and
/// reconciliation is scoped to the mutated entry: a mutation settling on
/// one key never clobbers concurrent changes to another.
pub struct BagStore {
    cell: Arc<SnapshotCell<Vec<BagEntry>>>,
    remote: Arc<dyn RemoteBoundary>,
    identity: Arc<dyn IdentityProvider>,
    bridge: RealtimeBridge,
    generation: Generation,
    timeout: Duration,
    init: Once,
    weak: Weak<BagStore>,
}

impl BagStore {
    pub fn new(
        remote: Arc<dyn RemoteBoundary>,
        identity: Arc<dyn IdentityProvider>,
        channel: Arc<dyn PushChannel>,
        generation: Generation,
        timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| BagStore {
            cell: Arc::new(SnapshotCell::new(Snapshot::initial(Vec::new()))),
            remote,
            identity,
            bridge: RealtimeBridge::new(channel, TABLE, FILTER_COLUMN),
            generation,
            timeout,
            init: Once::new(),
            weak: weak.clone(),
        })
    }

    /// Current snapshot. Triggers [`ensure_init`](Self::ensure_init) on
    /// first observation.
    pub fn observe(&self) -> Snapshot<Vec<BagEntry>> {
        self.ensure_init();
        self.cell.get()
    }

    /// Subscribe to every subsequent snapshot. Also triggers init.
    pub fn watch<F>(&self, listener: F) -> WatchGuard<Vec<BagEntry>>
    where
        F: Fn(&Snapshot<Vec<BagEntry>>) + Send + Sync + 'static,
    {
        self.ensure_init();
        let id = self.cell.subscribe(listener);
        WatchGuard::new(Arc::clone(&self.cell), id)
    }

    /// One-time lazy initialization; the first-login equivalent.
    pub fn ensure_init(&self) {
        self.init.call_once(|| match self.identity.current_identity() {
            Some(identity) => self.activate(&identity),
            None => self.cell.set(Self::idle_patch()),
        });
    }

    /// Re-read the full bag (zero-quantity entries included).
    pub fn refresh(&self) -> Result<()> {
        let Some(_identity) = self.identity.current_identity() else {
            self.cell.set(Self::idle_patch());
            return Ok(());
        };

        let generation = self.generation.current();
        self.cell.set(SnapshotPatch::new().loading(true).clear_error());

        let result = bounded_call(&self.remote, READ_PROC, json!({}), self.timeout);
        if self.generation.current() != generation {
            debug!(store = "bag", "dropping stale refresh completion");
            return Ok(());
        }

        match result {
            Ok(value) => match parse_entries(value) {
                Ok(entries) => {
                    self.cell
                        .set(SnapshotPatch::new().data(entries).loading(false).clear_error());
                    Ok(())
                }
                Err(e) => {
                    self.cell
                        .set(SnapshotPatch::new().loading(false).error(e.to_string()));
                    Err(e)
                }
            },
            Err(e) => {
                self.cell
                    .set(SnapshotPatch::new().loading(false).error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Adjust the quantity of the entry with `id` by `delta`, optimistically.
    ///
    /// An id the local cache does not hold is never fabricated into a new
    /// entry: the store triggers a corrective refresh and reports the miss.
    /// Rollback restores the entry's full pre-mutation quantity, and both
    /// rollback and reconciliation touch only this entry.
    pub fn adjust(&self, id: u64, delta: i64) -> Result<()> {
        if self.identity.current_identity().is_none() {
            return Err(SyncError::NotAuthenticated);
        }

        let generation = self.generation.current();
        let prev_qty = match self.cell.get().data.iter().find(|e| e.id == id) {
            Some(entry) => entry.qty,
            None => {
                let _ = self.refresh();
                return Err(SyncError::UnknownEntry(id));
            }
        };

        self.cell.update(move |snap| {
            qty_patch(snap, id, |qty| qty.saturating_add(delta).max(0))
        });

        let result = bounded_call(
            &self.remote,
            ADJUST_PROC,
            json!({ "p_bait_id": id, "p_delta": delta }),
            self.timeout,
        );
        if self.generation.current() != generation {
            debug!(store = "bag", "dropping stale mutation completion");
            return Ok(());
        }

        match result {
            Ok(value) => match serde_json::from_value::<AdjustedEntry>(value) {
                Ok(confirmed) => {
                    if self.knows(confirmed.id) {
                        self.cell.update(move |snap| {
                            qty_patch(snap, confirmed.id, |_| confirmed.qty.max(0)).clear_error()
                        });
                        Ok(())
                    } else {
                        // Confirmation for an entry we never saw; re-read.
                        self.refresh()
                    }
                }
                Err(e) => {
                    warn!(store = "bag", error = %e, "malformed adjustment confirmation, refreshing");
                    self.refresh()
                }
            },
            Err(e) => {
                let message = e.to_string();
                self.cell
                    .update(move |snap| qty_patch(snap, id, |_| prev_qty).error(message));
                Err(e)
            }
        }
    }

    fn on_event(&self, event: &ChangeEvent) {
        match bag_signal(event) {
            BagSignal::Upsert { id, qty } if self.knows(id) => {
                self.cell.update(move |snap| qty_patch(snap, id, |_| qty));
            }
            BagSignal::Cleared { id } if self.knows(id) => {
                self.cell.update(move |snap| qty_patch(snap, id, |_| 0));
            }
            // Unknown key or unusable shape: re-read instead of guessing.
            BagSignal::Upsert { .. } | BagSignal::Cleared { .. } | BagSignal::Resync => {
                warn!(store = "bag", "unresolvable realtime event, refreshing");
                if let Err(e) = self.refresh() {
                    debug!(store = "bag", error = %e, "corrective refresh failed");
                }
            }
        }
    }

    fn knows(&self, id: u64) -> bool {
        self.cell.get().data.iter().any(|e| e.id == id)
    }

    fn open_realtime(&self, identity: &Identity) {
        let weak = self.weak.clone();
        let opened = self.bridge.open(
            identity,
            Box::new(move |event| {
                if let Some(store) = weak.upgrade() {
                    store.on_event(&event);
                }
            }),
        );
        if let Err(e) = opened {
            warn!(store = "bag", error = %e, "realtime subscription failed");
        }
    }

    fn idle_patch() -> SnapshotPatch<Vec<BagEntry>> {
        SnapshotPatch::new().data(Vec::new()).loading(false).clear_error()
    }
}

impl ManagedStore for BagStore {
    fn name(&self) -> &str {
        "bag"
    }

    fn initialized(&self) -> bool {
        self.init.is_completed()
    }

    fn activate(&self, identity: &Identity) {
        let _ = self.refresh();
        self.open_realtime(identity);
    }

    fn deactivate(&self) {
        self.bridge.close();
        self.cell.set(Self::idle_patch());
    }
}

/// Patch only the entry with `id`, leaving every other entry untouched.
/// Missing ids produce an empty patch (the entry may have been reset away
/// by a logout between queueing and apply).
fn qty_patch<F>(snap: &Snapshot<Vec<BagEntry>>, id: u64, f: F) -> SnapshotPatch<Vec<BagEntry>>
where
    F: FnOnce(i64) -> i64,
{
    match snap.data.iter().position(|e| e.id == id) {
        Some(index) => {
            let mut entries = snap.data.clone();
            entries[index].qty = f(entries[index].qty).max(0);
            SnapshotPatch::new().data(entries)
        }
        None => SnapshotPatch::new(),
    }
}

/// A null result reads as an empty bag, matching the remote's contract.
fn parse_entries(value: JsonValue) -> Result<Vec<BagEntry>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(value)?)
}
