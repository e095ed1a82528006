//! Error types for the [`row`](super) module.

use derive_more::{Display, Error};

/// A row layout error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for row operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("cannot lay out a row without thumbnails")]
    EmptyRow,
    /// The thumbnails have no width to scale, or one has no height.
    #[display("row thumbnails have no width")]
    ZeroWidth,
    /// The spacing alone is at least as wide as the row.
    #[display("row spacing leaves no room for thumbnails")]
    NoRoom,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
