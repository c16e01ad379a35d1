//! Offline-first synchronization.
//!
//! Devices push edited records and pull everything accepted since their last
//! watermark. The server orders accepted writes with a monotonic clock and
//! settles concurrent edits with last-write-wins.

pub mod credentials;
pub mod engine;
pub mod resolver;

pub use credentials::{bearer_token, hash_token, CredentialStore, PairResponse};
pub use engine::{PullResponse, PushResponse, PushResult, SyncEngine};
pub use resolver::{resolve, Resolution};

/// Current time as Unix seconds.
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
