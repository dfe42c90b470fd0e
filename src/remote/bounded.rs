//! Timeout guard for remote procedure calls.

use crate::error::{Result, SyncError};
use crate::remote::RemoteBoundary;
use crossbeam_channel::{bounded, RecvTimeoutError};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Invoke `remote.call(name, params)` with an upper bound on how long the
/// caller will wait.
///
/// The call itself runs on a short-lived worker thread; on timeout the
/// worker is abandoned (its eventual result is dropped on the floor) and
/// the caller gets [`SyncError::Timeout`]. A store treats that exactly like
/// a remote rejection: rollback for mutations, stale-retain for refreshes.
pub fn bounded_call(
    remote: &Arc<dyn RemoteBoundary>,
    name: &str,
    params: JsonValue,
    timeout: Duration,
) -> Result<JsonValue> {
    let (tx, rx) = bounded(1);
    let remote = Arc::clone(remote);
    let name_owned = name.to_string();
    std::thread::spawn(move || {
        // Receiver may be gone after a timeout; ignore the send error.
        let _ = tx.send(remote.call(&name_owned, params));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SyncError::Remote(e.message)),
        Err(RecvTimeoutError::Timeout) => Err(SyncError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            // Worker panicked before sending.
            Err(SyncError::Remote("remote call aborted".to_string()))
        }
    }
}
