//! hearth-core - Core library for Hearth
//!
//! This crate contains the task sync engine shared by every Hearth front-end:
//! the live subscription manager, the canonical task store, version conflict
//! detection and resolution, local reminder scheduling, and the connectivity
//! lifecycle that ties them together.

pub mod api;
pub mod config;
pub mod conflict;
pub mod connectivity;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod reminders;
pub mod state;
pub mod store;
pub mod subscription;
pub mod transport;
pub mod util;

#[cfg(test)]
pub mod testing;

pub use error::{Error, Result, SubscriptionError};
pub use models::{Task, TaskId};
pub use state::SyncState;
