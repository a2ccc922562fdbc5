//! Snapshot transports backed by the remote API.

mod polling;

pub use polling::{PollingTransport, SnapshotTracker};
