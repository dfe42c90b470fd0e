//! Resource stores: cached snapshots with optimistic mutation and
//! realtime reconciliation.

mod bag;
mod scalar;

pub use bag::BagStore;
pub use scalar::{ScalarSpec, ScalarStore};
