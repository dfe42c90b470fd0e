//! Translation of raw change events into store-level signals.
//!
//! The push channel delivers whatever the backend sent; rows may be partial,
//! missing, or of the wrong shape. Decoding never guesses: anything that
//! cannot be resolved into a concrete local patch becomes a `Resync`, which
//! the owning store answers with a full `refresh()`.

use crate::remote::{ChangeEvent, ChangeOp};
use serde_json::Value as JsonValue;

/// What a scalar store should do with an inbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarSignal {
    /// Adopt this authoritative value directly.
    Value(i64),
    /// Shape mismatch; re-read from the remote.
    Resync,
}

/// Decode an event for a scalar resource whose row carries `field`.
pub fn scalar_signal(event: &ChangeEvent, field: &str) -> ScalarSignal {
    match event.after.as_ref().and_then(|row| int_field(row, field)) {
        Some(value) => ScalarSignal::Value(value),
        None => ScalarSignal::Resync,
    }
}

/// What the bag store should do with an inbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BagSignal {
    /// Row created or updated: patch this entry's quantity.
    Upsert { id: u64, qty: i64 },
    /// Row deleted: the entry survives with quantity zero.
    Cleared { id: u64 },
    /// Key or shape could not be resolved; re-read from the remote.
    Resync,
}

/// Decode an event for the bag resource. Rows carry `id` and `qty`.
pub fn bag_signal(event: &ChangeEvent) -> BagSignal {
    match event.op {
        ChangeOp::Delete => match event.before.as_ref().and_then(|row| id_field(row)) {
            Some(id) => BagSignal::Cleared { id },
            None => BagSignal::Resync,
        },
        ChangeOp::Insert | ChangeOp::Update => {
            let Some(row) = event.after.as_ref() else {
                return BagSignal::Resync;
            };
            match id_field(row) {
                // A present row with a missing qty is treated as zero.
                Some(id) => BagSignal::Upsert {
                    id,
                    qty: int_field(row, "qty").unwrap_or(0).max(0),
                },
                None => BagSignal::Resync,
            }
        }
    }
}

fn int_field(row: &JsonValue, field: &str) -> Option<i64> {
    row.get(field).and_then(JsonValue::as_i64)
}

fn id_field(row: &JsonValue) -> Option<u64> {
    row.get("id").and_then(JsonValue::as_u64)
}
