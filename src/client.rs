//! The client facade tying stores, session lifecycle, and shop calls together.

use crate::error::{Result, SyncError};
use crate::remote::{bounded_call, IdentityProvider, PushChannel, RemoteBoundary};
use crate::session::{Generation, ManagedStore, SessionCoordinator};
use crate::stores::{BagStore, ScalarSpec, ScalarStore};
use crate::types::{CatalogItem, PurchaseReceipt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Upper bound on any single remote call issued by the stores.
    pub remote_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            remote_timeout: Duration::from_secs(8),
        }
    }
}

/// One cached view of every remote resource for a running client.
///
/// Construct exactly one per process and share it; stores are lazy (born on
/// first observation) and live for the client's lifetime, with only their
/// subscriptions torn down and recreated across identity transitions. Tests
/// construct fresh instances with fake collaborators; there is no ambient
/// global state.
pub struct SyncClient {
    config: ClientConfig,
    identity: Arc<dyn IdentityProvider>,
    remote: Arc<dyn RemoteBoundary>,
    session: Arc<SessionCoordinator>,
    gold: Arc<ScalarStore>,
    xp: Arc<ScalarStore>,
    baits: Arc<BagStore>,
}

impl SyncClient {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        remote: Arc<dyn RemoteBoundary>,
        channel: Arc<dyn PushChannel>,
        config: ClientConfig,
    ) -> Self {
        let generation = Generation::new();
        let session = SessionCoordinator::new(Arc::clone(&identity), generation.clone());

        let gold = ScalarStore::new(
            ScalarSpec::GOLD,
            Arc::clone(&remote),
            Arc::clone(&identity),
            Arc::clone(&channel),
            generation.clone(),
            config.remote_timeout,
        );
        let xp = ScalarStore::new(
            ScalarSpec::XP,
            Arc::clone(&remote),
            Arc::clone(&identity),
            Arc::clone(&channel),
            generation.clone(),
            config.remote_timeout,
        );
        let baits = BagStore::new(
            Arc::clone(&remote),
            Arc::clone(&identity),
            Arc::clone(&channel),
            generation,
            config.remote_timeout,
        );

        session.register(Arc::clone(&gold) as Arc<dyn ManagedStore>);
        session.register(Arc::clone(&xp) as Arc<dyn ManagedStore>);
        session.register(Arc::clone(&baits) as Arc<dyn ManagedStore>);
        Arc::clone(&session).start();

        SyncClient {
            config,
            identity,
            remote,
            session,
            gold,
            xp,
            baits,
        }
    }

    pub fn gold(&self) -> &ScalarStore {
        &self.gold
    }

    pub fn xp(&self) -> &ScalarStore {
        &self.xp
    }

    pub fn baits(&self) -> &BagStore {
        &self.baits
    }

    /// Eagerly initialize every store (normally they initialize lazily on
    /// first observation).
    pub fn ensure_init_all(&self) {
        self.gold.ensure_init();
        self.xp.ensure_init();
        self.baits.ensure_init();
    }

    /// Cancel the identity watch and close every realtime subscription.
    pub fn shutdown(&self) {
        self.session.stop();
    }

    // --- Shop ---

    /// Ordered read of the bait reference catalog. Presentation data only;
    /// not cached and not synced.
    pub fn bait_catalog(&self) -> Result<Vec<CatalogItem>> {
        let rows = self
            .remote
            .fetch_ordered("baits", &["id", "title", "display", "price"], "id")
            .map_err(|e| SyncError::Remote(e.message))?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(SyncError::from))
            .collect()
    }

    /// Buy `qty` of a catalog bait, spending gold server-side.
    ///
    /// On success the bag is re-read as a correction; the gold store
    /// converges through its realtime subscription.
    pub fn purchase_bait(&self, bait_id: u64, qty: i64) -> Result<PurchaseReceipt> {
        if self.identity.current_identity().is_none() {
            return Err(SyncError::NotAuthenticated);
        }

        let value = bounded_call(
            &self.remote,
            "purchase_bait",
            json!({ "p_bait_id": bait_id, "p_qty": qty }),
            self.config.remote_timeout,
        )?;
        let receipt: PurchaseReceipt = serde_json::from_value(value)?;

        if let Err(e) = self.baits.refresh() {
            debug!(error = %e, "post-purchase bag refresh failed");
        }
        Ok(receipt)
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.session.stop();
    }
}
