//! Realtime bridge: push-channel subscriptions and defensive event decoding.

mod bridge;
mod decode;

pub use bridge::RealtimeBridge;
pub use decode::{bag_signal, scalar_signal, BagSignal, ScalarSignal};
