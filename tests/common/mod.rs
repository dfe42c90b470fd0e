//! In-memory fakes for the collaborator boundaries.
#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tacklebox::{
    ChangeEvent, ClientConfig, Identity, IdentityProvider, PushChannel, RemoteBoundary,
    RemoteError, RowFilter, Subscription, SyncClient,
};

// --- Identity ---

/// Scriptable identity provider; `login`/`logout` drive the watch callbacks.
type IdentityListeners = Arc<Mutex<HashMap<u64, Arc<dyn Fn(Option<Identity>) + Send + Sync>>>>;

#[derive(Default)]
pub struct FakeIdentity {
    current: Mutex<Option<Identity>>,
    listeners: IdentityListeners,
    next_id: AtomicU64,
}

impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn login(&self, id: &str) {
        *self.current.lock() = Some(Identity::new(id));
        self.notify();
    }

    pub fn logout(&self) {
        *self.current.lock() = None;
        self.notify();
    }

    fn notify(&self) {
        let current = self.current.lock().clone();
        let listeners: Vec<_> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(current.clone());
        }
    }
}

impl IdentityProvider for FakeIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.current.lock().clone()
    }

    fn watch_identity(
        &self,
        callback: Box<dyn Fn(Option<Identity>) + Send + Sync>,
    ) -> Box<dyn Subscription> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().insert(id, Arc::from(callback));
        Box::new(WatchHandle {
            listeners: Arc::clone(&self.listeners),
            id,
        })
    }
}

// --- Remote boundary ---

type Handler = Arc<dyn Fn(JsonValue) -> Result<JsonValue, RemoteError> + Send + Sync>;

/// Scriptable RPC boundary. Unscripted procedures fail, which keeps tests
/// honest about which calls they expect.
#[derive(Default)]
pub struct FakeRemote {
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<(String, JsonValue)>>,
    catalog: Mutex<Vec<JsonValue>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond<F>(&self, name: &str, handler: F)
    where
        F: Fn(JsonValue) -> Result<JsonValue, RemoteError> + Send + Sync + 'static,
    {
        self.handlers.lock().insert(name.to_string(), Arc::new(handler));
    }

    pub fn respond_value(&self, name: &str, value: JsonValue) {
        self.respond(name, move |_| Ok(value.clone()));
    }

    pub fn fail(&self, name: &str, message: &str) {
        let message = message.to_string();
        self.respond(name, move |_| Err(RemoteError::new(message.clone())));
    }

    pub fn set_catalog(&self, rows: Vec<JsonValue>) {
        *self.catalog.lock() = rows;
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|(n, _)| n == name).count()
    }

    pub fn last_params(&self, name: &str) -> Option<JsonValue> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
    }
}

impl RemoteBoundary for FakeRemote {
    fn call(&self, name: &str, params: JsonValue) -> Result<JsonValue, RemoteError> {
        self.calls.lock().push((name.to_string(), params.clone()));
        let handler = self.handlers.lock().get(name).cloned();
        match handler {
            Some(handler) => handler(params),
            None => Err(RemoteError::new(format!("no handler for {name}"))),
        }
    }

    fn fetch_ordered(
        &self,
        _table: &str,
        _columns: &[&str],
        _order_column: &str,
    ) -> Result<Vec<JsonValue>, RemoteError> {
        Ok(self.catalog.lock().clone())
    }
}

// --- Push channel ---

pub struct FakeSub {
    pub topic: String,
    pub table: String,
    pub filter: RowFilter,
    callback: Box<dyn Fn(ChangeEvent) + Send + Sync>,
    closed: AtomicBool,
}

impl FakeSub {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Scriptable push channel; `push` delivers an event to every open
/// subscription on the given table.
#[derive(Default)]
pub struct FakeChannel {
    subs: Mutex<Vec<Arc<FakeSub>>>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, table: &str, event: ChangeEvent) {
        let subs: Vec<_> = self.subs.lock().iter().cloned().collect();
        for sub in subs {
            if sub.table == table && !sub.is_closed() {
                (sub.callback)(event.clone());
            }
        }
    }

    pub fn subscriptions(&self) -> Vec<Arc<FakeSub>> {
        self.subs.lock().clone()
    }

    pub fn open_count(&self) -> usize {
        self.subs.lock().iter().filter(|s| !s.is_closed()).count()
    }
}

impl PushChannel for FakeChannel {
    fn subscribe(
        &self,
        topic: &str,
        table: &str,
        filter: RowFilter,
        on_event: Box<dyn Fn(ChangeEvent) + Send + Sync>,
    ) -> Result<Box<dyn Subscription>, RemoteError> {
        let sub = Arc::new(FakeSub {
            topic: topic.to_string(),
            table: table.to_string(),
            filter,
            callback: on_event,
            closed: AtomicBool::new(false),
        });
        self.subs.lock().push(Arc::clone(&sub));
        Ok(Box::new(FakeHandle { sub }))
    }
}

struct FakeHandle {
    sub: Arc<FakeSub>,
}

impl Subscription for FakeHandle {
    fn close(&mut self) {
        self.sub.closed.store(true, Ordering::SeqCst);
    }
}

struct WatchHandle {
    listeners: IdentityListeners,
    id: u64,
}

impl Subscription for WatchHandle {
    fn close(&mut self) {
        self.listeners.lock().remove(&self.id);
    }
}

// --- Harness ---

pub struct Harness {
    pub identity: Arc<FakeIdentity>,
    pub remote: Arc<FakeRemote>,
    pub channel: Arc<FakeChannel>,
    pub client: SyncClient,
}

/// A client over fresh fakes with the default (long) timeout.
pub fn harness() -> Harness {
    harness_with(ClientConfig::default())
}

pub fn harness_with(config: ClientConfig) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let identity = FakeIdentity::new();
    let remote = FakeRemote::new();
    let channel = FakeChannel::new();
    let client = SyncClient::new(
        Arc::clone(&identity) as Arc<dyn IdentityProvider>,
        Arc::clone(&remote) as Arc<dyn RemoteBoundary>,
        Arc::clone(&channel) as Arc<dyn PushChannel>,
        config,
    );
    Harness {
        identity,
        remote,
        channel,
        client,
    }
}
