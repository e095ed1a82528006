//! Thumbnail resolution: one fetch per item, run on a bounded pool.

mod fetcher;
mod pool;

pub use self::fetcher::{FetchSettings, ThumbnailFetcher};
pub use self::pool::{Submission, WorkerPool};
use crate::image::{ImageHandle, Size};
use mosaic_store::Item;
use tokio::sync::mpsc;

/// The outcome of resolving one item's thumbnail for a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub id: String,
    pub image: ImageHandle,
    /// The image is a stock glyph standing in for a failed fetch.
    pub placeholder: bool,
    /// Display size; zero until the row has been laid out.
    pub scaled: Size,
}
impl Thumbnail {
    pub fn actual(id: impl Into<String>, image: ImageHandle) -> Self {
        Self { id: id.into(), image, placeholder: false, scaled: Size::default() }
    }

    pub fn placeholder(id: impl Into<String>, image: ImageHandle) -> Self {
        Self { id: id.into(), image, placeholder: true, scaled: Size::default() }
    }
}

/// How a request for one item's thumbnail was served.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Answered from the cache without any I/O.
    Cached(Thumbnail),
    /// Handed to the pool; the result arrives on the reply channel.
    Submitted(Submission),
}

/// The fetcher and the pool that runs it, shared by every row.
#[derive(Clone)]
pub struct Pipeline {
    pub fetcher: ThumbnailFetcher,
    pub pool: WorkerPool,
}
impl Pipeline {
    pub fn new(fetcher: ThumbnailFetcher, pool: WorkerPool) -> Self {
        Self { fetcher, pool }
    }

    pub fn resolve(&self, item: &Item, reply: &mpsc::UnboundedSender<Thumbnail>) -> Resolution {
        if let Some(thumbnail) = self.fetcher.cached(item) {
            return Resolution::Cached(thumbnail);
        }
        let fetcher = self.fetcher.clone();
        let owned = item.clone();
        let submission = self.pool.submit(&item.id, reply.clone(), async move { fetcher.fetch(&owned).await });
        Resolution::Submitted(submission)
    }
}
