//! Error types for the [`sync`](super) module.
//!
//! These never escape the engine: every failure is logged and reported as
//! [`SyncOutcome::Failed`](super::SyncOutcome::Failed).

use derive_more::{Display, Error};

/// A synchronization error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The search request failed or timed out.
    #[display("remote search failed")]
    Remote,
    #[display("item store error")]
    Store,
    /// A window's lower bound was not before its upper bound.
    #[display("empty search window")]
    EmptyWindow,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote | Self::Store)
    }
}
