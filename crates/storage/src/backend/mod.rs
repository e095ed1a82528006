//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the filesystem seam the
//! thumbnail pipeline uses to look up and persist downloaded previews.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for thumbnail storage.
///
/// All operations are asynchronous so that a slow disk never blocks the
/// worker that is resolving a thumbnail.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use mosaic_storage::{ThumbnailPaths, backend::StorageBackend, error::Result};
///
/// async fn cached_icon(backend: &dyn StorageBackend, id: &str, etag: &str) -> Result<Option<Vec<u8>>> {
///     let paths = ThumbnailPaths::derive(id, etag)?;
///     if backend.exists(&paths.icon).await? {
///         Ok(Some(backend.read(&paths.icon).await?))
///     } else {
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating or overwriting the file.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;
}
