//! The remote media API, as seen by the feed.
//!
//! Transport details (authentication, HTTP, WebDAV bodies) live behind
//! [`MediaTransport`]; the feed only issues date-bounded searches and
//! preview downloads.

#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockTransport;
use async_trait::async_trait;
use derive_more::{Display, Error};
use mosaic_store::RemoteFile;
use std::sync::Arc;
use time::OffsetDateTime;

pub type TransportHandle = Arc<dyn MediaTransport + Send + Sync>;
/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, exn::Exn<RemoteError>>;

/// A failed remote call, as reported by the server or the transport.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("remote error {code}: {description}")]
pub struct RemoteError {
    /// HTTP status, or a negative transport code.
    pub code: i64,
    pub description: String,
}
impl RemoteError {
    pub const TIMEOUT: i64 = -1001;
    pub const CANCELLED: i64 = -999;

    pub fn new(code: i64, description: impl Into<String>) -> Self {
        Self { code, description: description.into() }
    }

    pub fn timeout() -> Self {
        Self::new(Self::TIMEOUT, "the request timed out")
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        self.code == Self::TIMEOUT || self.code == 429 || (500..600).contains(&self.code)
    }
}

/// A media search over `(lower, upper)`, both exclusive, on `date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Server location to search below.
    pub path: String,
    pub lower: OffsetDateTime,
    pub upper: OffsetDateTime,
    /// Maximum number of records; `0` means no cap.
    pub limit: usize,
    pub include_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    /// The account the server answered for.
    pub account: String,
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    /// Server path of the file.
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub icon_size: u32,
    /// Revision tag of the preview already held; lets the server skip
    /// sending unchanged bytes.
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewResponse {
    pub preview: Option<Vec<u8>>,
    pub icon: Option<Vec<u8>>,
    /// Revision tag of the returned preview.
    pub etag: Option<String>,
}

#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn search_media(&self, query: &SearchQuery) -> Result<SearchResponse>;

    async fn download_preview(&self, request: &PreviewRequest) -> Result<PreviewResponse>;
}
