//! Collaborator boundaries: identity, remote procedures, push channel.

mod bounded;
mod traits;

pub use bounded::bounded_call;
pub use traits::{
    ChangeEvent, ChangeOp, IdentityProvider, PushChannel, RemoteBoundary, RemoteError, RowFilter,
    Subscription,
};
