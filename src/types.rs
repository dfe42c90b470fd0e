//! Core types for the synchronization layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated principal whose resources the stores cache.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque identifier assigned by the identity provider.
    pub id: String,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Identity { id: id.into() }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// One consumable item held in the bag.
///
/// Entries are never removed once seen: a deletion on the remote side is
/// reflected as `qty = 0`, so the bag is a superset of everything the
/// player has ever held.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagEntry {
    pub id: u64,
    pub title: String,
    /// Short display glyph, typically an emoji.
    pub display: String,
    pub qty: i64,
}

/// One row of the bait reference catalog (presentation data, not synced).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u64,
    pub title: String,
    pub display: String,
    pub price: i64,
}

/// Authoritative result of a bag adjustment returned by the remote.
#[derive(Clone, Debug, Deserialize)]
pub struct AdjustedEntry {
    pub id: u64,
    pub qty: i64,
}

/// Authoritative result of a purchase returned by the remote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub id: u64,
    pub title: String,
    pub display: String,
    pub unit_price: i64,
    pub purchased: i64,
    pub cost: i64,
    pub gold_before: i64,
    pub gold_after: i64,
    pub qty_before: i64,
    pub qty_after: i64,
}
