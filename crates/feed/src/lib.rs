//! Media feed core: window-expanding synchronization with a remote media
//! listing, and a deduplicated thumbnail pipeline that lays thumbnails out
//! in fixed-width rows.
//!
//! Data flows one way:
//!
//! 1. [`FeedSyncEngine`](sync::FeedSyncEngine) pulls records from the server
//!    and reconciles them into the local store.
//! 2. [`FeedController`](controller::FeedController) re-reads the store and
//!    publishes the filtered, sorted item list.
//! 3. The UI groups the list into rows and hands each row to a
//!    [`RowAssembler`](row::RowAssembler), which resolves thumbnails through
//!    the [`Pipeline`](thumbnail::Pipeline) and publishes the laid-out row.

pub mod controller;
pub mod error;
pub mod image;
pub mod remote;
pub mod row;
mod scope;
pub mod sync;
pub mod thumbnail;

pub use crate::scope::{FeedScope, FilterState};
use crate::controller::FeedController;
use crate::error::{ErrorKind, Result};
use crate::image::ImageCache;
use crate::remote::TransportHandle;
use crate::row::RowAssembler;
use crate::sync::FeedSyncEngine;
use crate::thumbnail::{FetchSettings, Pipeline, ThumbnailFetcher, WorkerPool};
use exn::ResultExt;
use mosaic_config::Config;
use mosaic_storage::BackendHandle;
use mosaic_storage::backend::LocalBackend;
use mosaic_store::{Database, Item, Repository, StoreHandle};
use std::sync::Arc;

/// A feed wired up from configuration: SQLite store, on-disk thumbnails,
/// and the given transport.
pub struct Feed {
    pub controller: FeedController,
    pub pipeline: Pipeline,
    database: Database,
}

impl Feed {
    /// Opens the store, publishes what it already holds, then polls the
    /// server once for recent media. A failed poll is logged, not returned.
    pub async fn open(config: &Config, transport: TransportHandle) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Config)?;
        let path = config.database().or_raise(|| ErrorKind::Config)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Storage)?;
        }
        let database = Database::connect(&path).await.or_raise(|| ErrorKind::Store)?;
        let store: StoreHandle = Arc::new(Repository::from(&database));

        let thumbnails = config.thumbnail_dir().or_raise(|| ErrorKind::Config)?;
        let backend: BackendHandle = Arc::new(LocalBackend::new("thumbnails", &thumbnails).or_raise(|| ErrorKind::Storage)?);
        let cache = ImageCache::with_placeholder_ttl(config.placeholder_ttl());
        let settings = FetchSettings::from_config(config);
        let fetcher = ThumbnailFetcher::new(cache, backend, transport.clone(), store.clone(), settings);
        let pipeline = Pipeline::new(fetcher, WorkerPool::new(config.workers));

        let scope = FeedScope::from_config(config);
        let sync = FeedSyncEngine::new(store.clone(), transport, scope, config.search_timeout());
        let controller = FeedController::new(store, Arc::new(sync));
        tracing::info!(
            account = %config.account,
            database = %path.display(),
            thumbnails = %thumbnails.display(),
            workers = config.workers,
            "Opened media feed"
        );
        controller.load_data().await?;
        let outcome = controller.on_pull_to_refresh().await?;
        tracing::debug!(?outcome, "Initial poll finished");
        Ok(Self { controller, pipeline, database })
    }

    /// Starts assembling one row. Await [`RowAssembler::assemble`] (or watch
    /// [`RowAssembler::subscribe`]) for the result.
    pub fn row(&self, items: Vec<Item>, target_width: f64, spacing: f64) -> RowAssembler {
        let mut row = RowAssembler::new(items, target_width, spacing);
        row.dispatch(&self.pipeline);
        row
    }

    /// Drops queued thumbnail fetches and closes the store.
    pub async fn close(&self) {
        let cancelled = self.pipeline.pool.cancel_all();
        tracing::debug!(cancelled, "Closing media feed");
        self.database.close().await;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockTransport, PreviewResponse};
    use crate::sync::SyncOutcome;
    use crate::testing::{item, png, remote};
    use mosaic_store::MediaKind;
    use time::OffsetDateTime;

    #[tokio::test]
    async fn test_open_sync_and_render_row() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            account: "alice".to_string(),
            media_path: "/Photos".to_string(),
            database: Some(dir.path().join("db").join("items.db")),
            thumbnail_dir: Some(dir.path().join("thumbs")),
            ..Config::default()
        };
        let transport = Arc::new(MockTransport::new("alice"));
        let recent = OffsetDateTime::now_utc() - time::Duration::days(1);
        transport.push_files(vec![remote("a", "image/jpeg", recent), remote("b", "video/mp4", recent)]).await;
        let a = item("a", MediaKind::Image);
        transport.set_preview(a.path(), Ok(PreviewResponse { icon: Some(png(20, 10)), ..Default::default() })).await;

        let feed = Feed::open(&config, transport.clone()).await.unwrap();
        let items = feed.controller.items().borrow().clone();
        assert_eq!(items.len(), 2, "opening runs the first poll");
        assert_eq!(feed.controller.on_pull_to_refresh().await.unwrap(), SyncOutcome::Unchanged);

        let mut row = feed.row(items.to_vec(), 300.0, 4.0);
        let published = row.assemble().await.unwrap();
        assert_eq!(published.thumbnails.len(), 2);
        assert!(dir.path().join("thumbs/a/e1.small.ico").exists());
        feed.close().await;
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let transport = Arc::new(MockTransport::new("alice"));
        let err = Feed::open(&Config::default(), transport).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Config));
    }
}
