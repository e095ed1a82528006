//! The storage seam consumed by the feed.

use crate::diff::Diff;
use crate::error::Result;
use crate::models::{Item, RemoteFile};
use crate::predicate::{Predicate, Sort};
use async_trait::async_trait;

/// Unified interface for the local item store.
///
/// Implementations serialize their own writes, so concurrent synchronization
/// passes (a forward poll racing backward pagination) may call
/// [`diff`](Self::diff) at the same time.
///
/// # Examples
///
/// ```
/// use mosaic_store::{MediaStore, Predicate, Sort, SortField, error::Result};
///
/// async fn oldest_date(store: &dyn MediaStore) -> Result<Option<time::OffsetDateTime>> {
///     let predicate = Predicate::new("alice", "/Photos");
///     let oldest = store.first(&predicate, Sort::oldest(SortField::Date)).await?;
///     Ok(oldest.map(|item| item.date))
/// }
/// ```
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// All items matching `predicate`, in `sort` order.
    async fn query(&self, predicate: &Predicate, sort: Sort) -> Result<Vec<Item>>;

    /// The first item matching `predicate` in `sort` order.
    ///
    /// Default implementation runs the full [`query()`](Self::query) and keeps
    /// the head.
    async fn first(&self, predicate: &Predicate, sort: Sort) -> Result<Option<Item>> {
        Ok(self.query(predicate, sort).await?.into_iter().next())
    }

    /// Converts remote records into items. Converting the same record twice
    /// yields an equal item; records that aren't photos or videos are dropped.
    async fn convert(&self, files: &[RemoteFile]) -> Result<Vec<Item>> {
        Ok(files.iter().filter_map(RemoteFile::to_item).collect())
    }

    /// Reconciles `incoming` against the `existing` items of one window and
    /// applies the result: updated items are upserted, missing ones deleted.
    async fn diff(&self, incoming: Vec<Item>, existing: Vec<Item>) -> Result<Diff>;

    /// Records the revision tag of the preview that was just downloaded.
    async fn persist_resource_etag(&self, id: &str, etag: &str) -> Result<()>;
}
