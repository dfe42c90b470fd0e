//! Subscription handle management for one store's backing table.

use crate::error::{Result, SyncError};
use crate::remote::{ChangeEvent, PushChannel, RowFilter, Subscription};
use crate::types::Identity;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Owns at most one open push-channel subscription, scoped to the current
/// identity and a specific backing table.
pub struct RealtimeBridge {
    channel: Arc<dyn PushChannel>,
    table: String,
    /// Row column that carries the owning identity.
    filter_column: String,
    handle: Mutex<Option<Box<dyn Subscription>>>,
}

impl RealtimeBridge {
    pub fn new(
        channel: Arc<dyn PushChannel>,
        table: impl Into<String>,
        filter_column: impl Into<String>,
    ) -> Self {
        RealtimeBridge {
            channel,
            table: table.into(),
            filter_column: filter_column.into(),
            handle: Mutex::new(None),
        }
    }

    /// Open a subscription scoped to `identity`, closing any previous one
    /// first. Events are delivered to `on_event` until [`close`](Self::close).
    pub fn open(
        &self,
        identity: &Identity,
        on_event: Box<dyn Fn(ChangeEvent) + Send + Sync>,
    ) -> Result<()> {
        let topic = format!("{}:{}", self.table, identity.id);
        let filter = RowFilter::eq(self.filter_column.clone(), identity.id.clone());

        let mut slot = self.handle.lock();
        if let Some(mut old) = slot.take() {
            old.close();
        }

        debug!(table = %self.table, identity = %identity, "opening realtime subscription");
        let handle = self
            .channel
            .subscribe(&topic, &self.table, filter, on_event)
            .map_err(|e| SyncError::Subscription(e.message))?;
        *slot = Some(handle);
        Ok(())
    }

    /// Close the subscription. Idempotent; safe when never opened.
    pub fn close(&self) {
        if let Some(mut handle) = self.handle.lock().take() {
            debug!(table = %self.table, "closing realtime subscription");
            handle.close();
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.lock().is_some()
    }
}

impl Drop for RealtimeBridge {
    fn drop(&mut self) {
        self.close();
    }
}
