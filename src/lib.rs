//! Offline-first sync server for baby care events and growth measurements.
//!
//! Devices pair once to receive a bearer credential, then push edited records
//! and pull everything accepted since their last watermark. Concurrent edits
//! to the same record are settled with last-write-wins; every accepted write
//! is stamped with a token from one monotonic server clock.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod sync;

pub use error::{AuthError, Result, SyncError, ValidationError};
pub use sync::SyncEngine;
