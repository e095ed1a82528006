use super::layout::layout;
use crate::thumbnail::{Pipeline, Resolution, Thumbnail, WorkerPool};
use mosaic_store::Item;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// A finished row, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Thumbnails in display order, with their scaled sizes filled in.
    pub thumbnails: Vec<Thumbnail>,
    pub shrink_ratio: f64,
}

/// Bookkeeping for one row while its thumbnails arrive.
#[derive(Debug)]
pub struct RowState {
    expected: usize,
    accumulated: HashMap<String, Thumbnail>,
    finalized: bool,
    shrink_ratio: f64,
}
impl RowState {
    fn new(expected: usize) -> Self {
        Self { expected, accumulated: HashMap::with_capacity(expected), finalized: false, shrink_ratio: 1.0 }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn shrink_ratio(&self) -> f64 {
        self.shrink_ratio
    }

    pub fn contains(&self, id: &str) -> bool {
        self.accumulated.contains_key(id)
    }
}

/// Collects the thumbnails of one row and lays the row out exactly once.
///
/// An assembler belongs to one set of items. When the row's items change,
/// build a new assembler rather than patching this one.
///
/// Results come in through [`accept`](Self::accept), either inline (cache
/// hits during [`dispatch`](Self::dispatch)) or from the worker pool via the
/// row's channel, drained by [`assemble`](Self::assemble). The first time
/// every item has a result the row is laid out and published on the
/// [`watch`] channel returned by [`subscribe`](Self::subscribe); anything
/// that arrives later is ignored.
pub struct RowAssembler {
    /// Row items in display order, one per identifier.
    items: Vec<Item>,
    state: RowState,
    target_width: f64,
    spacing: f64,
    reply: Option<mpsc::UnboundedSender<Thumbnail>>,
    /// Identifies this row's channel to the pool without keeping it open.
    handle: mpsc::WeakUnboundedSender<Thumbnail>,
    results: mpsc::UnboundedReceiver<Thumbnail>,
    published: watch::Sender<Option<Arc<Row>>>,
}

impl RowAssembler {
    pub fn new(items: Vec<Item>, target_width: f64, spacing: f64) -> Self {
        let mut seen = HashSet::new();
        let items: Vec<Item> = items.into_iter().filter(|item| seen.insert(item.id.clone())).collect();
        let (reply, results) = mpsc::unbounded_channel();
        let (published, _) = watch::channel(None);
        Self {
            state: RowState::new(items.len()),
            items,
            target_width,
            spacing,
            handle: reply.downgrade(),
            reply: Some(reply),
            results,
            published,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn state(&self) -> &RowState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Row>>> {
        self.published.subscribe()
    }

    /// The published row, once finalized.
    pub fn row(&self) -> Option<Arc<Row>> {
        self.published.borrow().clone()
    }

    /// Requests every item's thumbnail. Cached thumbnails are accepted
    /// immediately; the rest are queued on the pool. Returns how many items
    /// were queued.
    ///
    /// Only the first call does anything.
    pub fn dispatch(&mut self, pipeline: &Pipeline) -> usize {
        let Some(reply) = self.reply.take() else {
            return 0;
        };
        let mut queued = 0;
        let items = self.items.clone();
        for item in &items {
            match pipeline.resolve(item, &reply) {
                Resolution::Cached(thumbnail) => {
                    self.accept(thumbnail);
                },
                Resolution::Submitted(_) => queued += 1,
            }
        }
        tracing::debug!(items = items.len(), queued, "Dispatched row");
        queued
    }

    /// Records one result. Returns `true` if this result finalized the row.
    ///
    /// Results for identifiers outside the row, repeated results, and
    /// anything after finalization are ignored.
    pub fn accept(&mut self, thumbnail: Thumbnail) -> bool {
        if self.state.finalized
            || self.state.accumulated.contains_key(&thumbnail.id)
            || !self.items.iter().any(|item| item.id == thumbnail.id)
        {
            return false;
        }
        self.state.accumulated.insert(thumbnail.id.clone(), thumbnail);
        if self.state.accumulated.len() < self.state.expected {
            return false;
        }
        self.finalize();
        true
    }

    fn finalize(&mut self) {
        self.state.finalized = true;
        let mut thumbnails: Vec<Thumbnail> =
            self.items.iter().filter_map(|item| self.state.accumulated.get(&item.id).cloned()).collect();
        match layout(&thumbnails, self.target_width, self.spacing) {
            Ok(row) => {
                for (thumbnail, size) in thumbnails.iter_mut().zip(row.sizes) {
                    thumbnail.scaled = size;
                }
                self.state.shrink_ratio = row.shrink_ratio;
            },
            Err(err) => {
                // Publish at natural size rather than never showing the row.
                tracing::warn!(error = ?err, "Row layout failed");
                for thumbnail in &mut thumbnails {
                    thumbnail.scaled = thumbnail.image.natural_size();
                }
            },
        }
        let row = Row { thumbnails, shrink_ratio: self.state.shrink_ratio };
        self.published.send_replace(Some(Arc::new(row)));
    }

    /// Drains pool results until the row is finalized.
    ///
    /// Returns `None` if every outstanding unit went away first (for example
    /// because it was cancelled). Call after [`dispatch`](Self::dispatch), or
    /// the row's own reply channel keeps this waiting forever.
    pub async fn assemble(&mut self) -> Option<Arc<Row>> {
        while !self.state.finalized {
            let thumbnail = self.results.recv().await?;
            self.accept(thumbnail);
        }
        self.row()
    }

    /// Withdraws this row from the queued fetches for items that have no
    /// result yet. A fetch another row also waits on keeps running for that
    /// row. Returns how many fetches this row left.
    pub fn cancel_pending_fetches(&self, pool: &WorkerPool) -> usize {
        let Some(reply) = self.handle.upgrade() else {
            return 0;
        };
        self.items.iter().filter(|item| !self.state.contains(&item.id) && pool.cancel(&item.id, &reply)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{CachedImageState, Glyph, ImageCache, ImageHandle, Size};
    use crate::remote::{MockTransport, PreviewResponse};
    use crate::testing::{item, png};
    use crate::thumbnail::{FetchSettings, ThumbnailFetcher};
    use mosaic_storage::backend::MockBackend;
    use mosaic_store::{MediaKind, MemoryStore};
    use rstest::rstest;

    fn sized(id: &str, width: u32, height: u32) -> Thumbnail {
        let mut image = ImageHandle::glyph(Glyph::Photo, 1);
        image.width = width;
        image.height = height;
        Thumbnail::actual(id, image)
    }

    fn row_of(ids: &[&str]) -> RowAssembler {
        let items = ids.iter().map(|id| item(id, MediaKind::Image)).collect();
        RowAssembler::new(items, 300.0, 10.0)
    }

    #[rstest]
    #[case::in_order(&["a", "b", "c"])]
    #[case::reversed(&["c", "b", "a"])]
    #[case::middle_first(&["b", "c", "a"])]
    fn test_finalizes_once_in_any_order(#[case] arrival: &[&str]) {
        let mut row = row_of(&["a", "b", "c"]);
        let mut watcher = row.subscribe();
        let finalized: Vec<bool> = arrival.iter().map(|id| row.accept(sized(id, 100, 100))).collect();
        assert_eq!(finalized, [false, false, true]);
        assert!(row.state().is_finalized());
        assert!(watcher.has_changed().unwrap());

        let published = watcher.borrow_and_update().clone().unwrap();
        let ids: Vec<_> = published.thumbnails.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"], "display order, not arrival order");
        assert!((published.shrink_ratio - 280.0 / 300.0).abs() < 1e-9);

        assert!(!row.accept(sized("a", 1, 1)));
        assert!(!watcher.has_changed().unwrap(), "published exactly once");
    }

    #[test]
    fn test_duplicates_and_strangers_are_ignored() {
        let mut row = row_of(&["a", "b"]);
        assert!(!row.accept(sized("a", 100, 50)));
        assert!(!row.accept(sized("a", 100, 50)));
        assert!(!row.accept(sized("zz", 100, 50)));
        assert_eq!(row.state().received(), 1);
        assert!(row.accept(sized("b", 50, 100)));
        let published = row.row().unwrap();
        assert_eq!(published.thumbnails[0].scaled, Size::new(200.0, 100.0));
        assert!((published.shrink_ratio - 1.16).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_items_count_once() {
        let mut row = row_of(&["a", "a", "b"]);
        assert_eq!(row.state().expected(), 2);
        row.accept(sized("a", 10, 10));
        assert!(row.accept(sized("b", 10, 10)));
    }

    fn pipeline(cache: ImageCache, transport: Arc<MockTransport>) -> Pipeline {
        let fetcher = ThumbnailFetcher::new(
            cache,
            Arc::new(MockBackend::default()),
            transport,
            Arc::new(MemoryStore::new()),
            FetchSettings::default(),
        );
        Pipeline::new(fetcher, WorkerPool::new(2))
    }

    #[tokio::test]
    async fn test_cached_row_finalizes_during_dispatch() {
        let cache = ImageCache::new();
        cache.set("a", CachedImageState::Actual(ImageHandle::decode(png(100, 50)).unwrap()));
        cache.set("b", CachedImageState::Placeholder);
        let transport = Arc::new(MockTransport::new("alice"));
        let pipeline = pipeline(cache, transport.clone());

        let mut row = row_of(&["a", "b"]);
        assert_eq!(row.dispatch(&pipeline), 0);
        assert!(row.state().is_finalized());
        let published = row.assemble().await.unwrap();
        assert!(published.thumbnails[1].placeholder);
        assert!(transport.preview_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_assemble_collects_pool_results() {
        let transport = Arc::new(MockTransport::new("alice"));
        let a = item("a", MediaKind::Image);
        transport.set_preview(a.path(), Ok(PreviewResponse { icon: Some(png(100, 50)), ..Default::default() })).await;
        let pipeline = pipeline(ImageCache::new(), transport.clone());

        let mut row = row_of(&["a", "b"]);
        assert_eq!(row.dispatch(&pipeline), 2);
        let published = row.assemble().await.unwrap();
        assert!(!published.thumbnails[0].placeholder);
        // No preview registered for "b", so it degrades to the stock glyph.
        assert!(published.thumbnails[1].placeholder);
        assert_eq!(published.thumbnails[1].image.natural_size(), Size::new(128.0, 128.0));
    }

    #[tokio::test]
    async fn test_two_rows_share_one_fetch() {
        let transport = Arc::new(MockTransport::new("alice"));
        let a = item("a", MediaKind::Image);
        transport.set_preview(a.path(), Ok(PreviewResponse { icon: Some(png(10, 10)), ..Default::default() })).await;
        let pipeline = pipeline(ImageCache::new(), transport.clone());

        let mut first = row_of(&["a"]);
        let mut second = row_of(&["a"]);
        first.dispatch(&pipeline);
        second.dispatch(&pipeline);
        assert!(first.assemble().await.is_some());
        assert!(second.assemble().await.is_some());
        assert_eq!(transport.preview_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_row_never_finalizes() {
        let transport = Arc::new(MockTransport::new("alice"));
        let pipeline = pipeline(ImageCache::new(), transport);
        let pool = WorkerPool::new(1);
        let pipeline = Pipeline::new(pipeline.fetcher, pool.clone());

        let mut row = row_of(&["a", "b"]);
        // Nothing has been polled yet on this single-threaded runtime, so
        // both units are still queued.
        row.dispatch(&pipeline);
        assert_eq!(row.cancel_pending_fetches(&pool), 2);
        assert_eq!(row.assemble().await, None);
        assert!(!row.state().is_finalized());
    }

    #[tokio::test]
    async fn test_cancelling_one_row_keeps_a_shared_fetch_alive() {
        let transport = Arc::new(MockTransport::new("alice"));
        let a = item("a", MediaKind::Image);
        transport.set_preview(a.path(), Ok(PreviewResponse { icon: Some(png(10, 10)), ..Default::default() })).await;
        let pipeline = pipeline(ImageCache::new(), transport.clone());
        let pool = pipeline.pool.clone();

        let mut off_screen = row_of(&["a"]);
        let mut visible = row_of(&["a"]);
        off_screen.dispatch(&pipeline);
        visible.dispatch(&pipeline);
        assert_eq!(off_screen.cancel_pending_fetches(&pool), 1);

        let published = visible.assemble().await.unwrap();
        assert!(!published.thumbnails[0].placeholder);
        assert_eq!(off_screen.assemble().await, None);
        assert_eq!(transport.preview_requests().await.len(), 1);
    }
}
