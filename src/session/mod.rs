//! Session lifecycle coordination across resource stores.

mod coordinator;

pub use coordinator::{Generation, ManagedStore, SessionCoordinator};
