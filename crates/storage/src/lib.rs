//! Local file storage for downloaded previews and icons.
//!
//! The feed never talks to the filesystem directly: it goes through a
//! [`StorageBackend`] rooted at the thumbnail directory, and derives every
//! file location from an item identifier and its revision tag with
//! [`ThumbnailPaths`].

pub mod backend;
pub mod error;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::path::ThumbnailPaths;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
