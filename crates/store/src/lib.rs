//! Local item store for the media feed.
//!
//! The store is the local mirror of the remote media listing. It is not the
//! source of truth: the server is. Every synchronization pass converts remote
//! records into [`Item`]s and reconciles them against what the store already
//! knows for the same date window, through the [`MediaStore`] trait.
//!
//! # Implementations
//! - [`Repository`]: SQLite via `sqlx`, with embedded migrations.
//! - `MemoryStore` (feature `mock`): a `HashMap` behind a lock, for tests.

mod api;
mod db;
mod diff;
pub mod error;
#[cfg(feature = "mock")]
mod memory;
mod models;
mod predicate;
mod repo;
mod row;

pub use crate::api::MediaStore;
pub use crate::db::Database;
pub use crate::diff::Diff;
#[cfg(feature = "mock")]
pub use crate::memory::MemoryStore;
pub use crate::models::{Item, MediaKind, RemoteFile};
pub use crate::predicate::{DateWindow, Predicate, Sort, SortField};
pub use crate::repo::Repository;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn MediaStore + Send + Sync>;
