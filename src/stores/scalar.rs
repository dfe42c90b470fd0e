//! Store for a single remotely-owned numeric value (gold, xp).

use crate::error::{Result, SyncError};
use crate::realtime::{scalar_signal, RealtimeBridge, ScalarSignal};
use crate::remote::{bounded_call, ChangeEvent, IdentityProvider, PushChannel, RemoteBoundary};
use crate::session::{Generation, ManagedStore};
use crate::snapshot::{Snapshot, SnapshotCell, SnapshotPatch, WatchGuard};
use crate::types::Identity;
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Once, Weak};
use std::time::Duration;
use tracing::{debug, warn};

/// Wiring of one scalar resource to its remote procedures and backing table.
#[derive(Clone, Copy, Debug)]
pub struct ScalarSpec {
    pub name: &'static str,
    pub read_proc: &'static str,
    pub adjust_proc: &'static str,
    pub delta_param: &'static str,
    /// Field of the RPC result and the realtime row that carries the value.
    pub value_field: &'static str,
    pub table: &'static str,
    pub filter_column: &'static str,
}

impl ScalarSpec {
    /// The player's gold balance.
    pub const GOLD: ScalarSpec = ScalarSpec {
        name: "gold",
        read_proc: "get_my_gold",
        adjust_proc: "adjust_my_gold",
        delta_param: "p_delta",
        value_field: "amount",
        table: "user_gold",
        filter_column: "user_id",
    };

    /// The player's experience counter.
    pub const XP: ScalarSpec = ScalarSpec {
        name: "xp",
        read_proc: "get_my_xp",
        adjust_proc: "user_xp_increase",
        delta_param: "p_delta",
        value_field: "xp",
        table: "user_xp",
        filter_column: "id",
    };
}

/// Cached view of one scalar resource.
///
/// The remote service owns the value; this store keeps a snapshot, applies
/// mutations optimistically, reconciles against the authoritative result,
/// and adopts realtime pushes directly (for a single slot the remote value
/// always wins, so whole-value replacement is correct).
pub struct ScalarStore {
    spec: ScalarSpec,
    cell: Arc<SnapshotCell<i64>>,
    remote: Arc<dyn RemoteBoundary>,
    identity: Arc<dyn IdentityProvider>,
    bridge: RealtimeBridge,
    generation: Generation,
    timeout: Duration,
    init: Once,
    weak: Weak<ScalarStore>,
}

impl ScalarStore {
    pub fn new(
        spec: ScalarSpec,
        remote: Arc<dyn RemoteBoundary>,
        identity: Arc<dyn IdentityProvider>,
        channel: Arc<dyn PushChannel>,
        generation: Generation,
        timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| ScalarStore {
            spec,
            cell: Arc::new(SnapshotCell::new(Snapshot::initial(0))),
            remote,
            identity,
            bridge: RealtimeBridge::new(channel, spec.table, spec.filter_column),
            generation,
            timeout,
            init: Once::new(),
            weak: weak.clone(),
        })
    }

    /// Current snapshot. Triggers [`ensure_init`](Self::ensure_init) on
    /// first observation so the store is born lazily.
    pub fn observe(&self) -> Snapshot<i64> {
        self.ensure_init();
        self.cell.get()
    }

    /// Subscribe to every subsequent snapshot. Also triggers init.
    pub fn watch<F>(&self, listener: F) -> WatchGuard<i64>
    where
        F: Fn(&Snapshot<i64>) + Send + Sync + 'static,
    {
        self.ensure_init();
        let id = self.cell.subscribe(listener);
        WatchGuard::new(Arc::clone(&self.cell), id)
    }

    /// One-time lazy initialization: performs the first-login equivalent
    /// for this store. Blocking; runs at most once per store.
    pub fn ensure_init(&self) {
        self.init.call_once(|| match self.identity.current_identity() {
            Some(identity) => self.activate(&identity),
            None => self.cell.set(Self::idle_patch()),
        });
    }

    /// Re-read the authoritative value.
    ///
    /// Unauthenticated is not an error: the store settles at its idle zero
    /// state. A failed read keeps the previous `data` (stale-but-available)
    /// and only records the error.
    pub fn refresh(&self) -> Result<()> {
        let Some(_identity) = self.identity.current_identity() else {
            self.cell.set(Self::idle_patch());
            return Ok(());
        };

        let generation = self.generation.current();
        self.cell.set(SnapshotPatch::new().loading(true).clear_error());

        let result = bounded_call(&self.remote, self.spec.read_proc, json!({}), self.timeout);
        if self.generation.current() != generation {
            debug!(store = self.spec.name, "dropping stale refresh completion");
            return Ok(());
        }

        match result {
            Ok(value) => {
                let data = parse_value(&value, self.spec.value_field).unwrap_or(0).max(0);
                self.cell
                    .set(SnapshotPatch::new().data(data).loading(false).clear_error());
                Ok(())
            }
            Err(e) => {
                self.cell
                    .set(SnapshotPatch::new().loading(false).error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Adjust the value by `delta`, optimistically.
    ///
    /// The clamped speculative value is visible to subscribers before the
    /// remote round trip. On confirmation the server's value is adopted;
    /// on rejection the full pre-mutation value is restored and the error
    /// recorded. Requires an identity.
    pub fn adjust(&self, delta: i64) -> Result<()> {
        if self.identity.current_identity().is_none() {
            return Err(SyncError::NotAuthenticated);
        }

        let generation = self.generation.current();
        let prev = self.cell.get().data;
        let optimistic = prev.saturating_add(delta).max(0);
        self.cell.set(SnapshotPatch::new().data(optimistic));

        let result = bounded_call(
            &self.remote,
            self.spec.adjust_proc,
            json!({ self.spec.delta_param: delta }),
            self.timeout,
        );
        if self.generation.current() != generation {
            debug!(store = self.spec.name, "dropping stale mutation completion");
            return Ok(());
        }

        match result {
            Ok(value) => {
                // A confirmation without the value field settles on the
                // optimistic value rather than guessing.
                let data = parse_value(&value, self.spec.value_field)
                    .unwrap_or(optimistic)
                    .max(0);
                self.cell.set(SnapshotPatch::new().data(data).clear_error());
                Ok(())
            }
            Err(e) => {
                self.cell
                    .set(SnapshotPatch::new().data(prev).error(e.to_string()));
                Err(e)
            }
        }
    }

    fn on_event(&self, event: &ChangeEvent) {
        match scalar_signal(event, self.spec.value_field) {
            ScalarSignal::Value(value) => {
                self.cell.set(
                    SnapshotPatch::new()
                        .data(value.max(0))
                        .loading(false)
                        .clear_error(),
                );
            }
            ScalarSignal::Resync => {
                warn!(store = self.spec.name, "unresolvable realtime event, refreshing");
                if let Err(e) = self.refresh() {
                    debug!(store = self.spec.name, error = %e, "corrective refresh failed");
                }
            }
        }
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
            warn!(store = self.spec.name, error = %e, "realtime subscription failed");
        }
    }

    fn idle_patch() -> SnapshotPatch<i64> {
        SnapshotPatch::new().data(0).loading(false).clear_error()
    }
}

impl ManagedStore for ScalarStore {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn initialized(&self) -> bool {
        self.init.is_completed()
    }

    fn activate(&self, identity: &Identity) {
        // A failed refresh is already recorded in the snapshot.
        let _ = self.refresh();
        self.open_realtime(identity);
    }

    fn deactivate(&self) {
        self.bridge.close();
        self.cell.set(Self::idle_patch());
    }
}

fn parse_value(value: &JsonValue, field: &str) -> Option<i64> {
    value.get(field).and_then(JsonValue::as_i64)
}
