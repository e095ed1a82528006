//! Incremental synchronization of the local store with the server.

mod engine;
pub mod error;
mod window;

pub use self::engine::{FeedSyncEngine, SyncOutcome};
pub use self::window::{FORWARD_LIMIT, FORWARD_SPAN, SyncWindow, WindowStep, distant_past};
