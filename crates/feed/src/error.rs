//! Feed Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The row and sync modules carry
//! their own, narrower kinds.

use derive_more::{Display, Error};

/// A feed error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the collaborator a feed operation failed in.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A query or update of the local item store failed.
    #[display("item store error")]
    Store,
    /// Reading or writing a stored preview failed.
    #[display("thumbnail storage error")]
    Storage,
    #[display("remote request failed")]
    Remote,
    /// Image bytes could not be recognised or have no area.
    #[display("could not decode image")]
    Decode,
    #[display("configuration error")]
    Config,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store | Self::Remote)
    }
}
