use super::Thumbnail;
use crate::error::{ErrorKind, Result};
use crate::image::{CachedImageState, Glyph, ImageCache, ImageHandle};
use crate::remote::{PreviewRequest, TransportHandle};
use exn::ResultExt;
use mosaic_config::Config;
use mosaic_storage::{BackendHandle, ThumbnailPaths};
use mosaic_store::{Item, StoreHandle};
use tracing::instrument;

/// Sizes used when asking the server for previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub preview_width: u32,
    pub preview_height: u32,
    pub icon_size: u32,
    /// Edge length of the stock glyph used for failed fetches.
    pub placeholder_size: u32,
}
impl FetchSettings {
    /// Previews are requested at half the viewport size.
    pub fn from_config(config: &Config) -> Self {
        Self {
            preview_width: (config.viewport.width / 2).max(1),
            preview_height: (config.viewport.height / 2).max(1),
            icon_size: config.icon_size,
            placeholder_size: config.placeholder_size,
        }
    }
}
impl Default for FetchSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Resolves one item's thumbnail.
///
/// Lookup happens in three layers, stopping at the first that answers:
///
/// 1. **Cache** - an actual image, or a recorded failure, is returned without
///    any I/O.
/// 2. **Local icon** - `<id>/<etag>.small.ico` in the storage backend, if it
///    exists and decodes.
/// 3. **Remote** - a preview download. The downloaded files are written to
///    the backend and the returned revision tag is recorded in the store.
///
/// A failed download caches a placeholder so the same item isn't requested
/// again on every render. [`fetch`](Self::fetch) never fails.
#[derive(Clone)]
pub struct ThumbnailFetcher {
    cache: ImageCache,
    backend: BackendHandle,
    transport: TransportHandle,
    store: StoreHandle,
    settings: FetchSettings,
}

impl ThumbnailFetcher {
    pub fn new(
        cache: ImageCache,
        backend: BackendHandle,
        transport: TransportHandle,
        store: StoreHandle,
        settings: FetchSettings,
    ) -> Self {
        Self { cache, backend, transport, store, settings }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// The cache layer on its own. Never touches storage or the network.
    pub fn cached(&self, item: &Item) -> Option<Thumbnail> {
        match self.cache.get(&item.id)? {
            CachedImageState::Actual(image) => Some(Thumbnail::actual(&item.id, image)),
            CachedImageState::Placeholder => Some(self.placeholder(item)),
        }
    }

    #[instrument(skip_all, fields(id = %item.id))]
    pub async fn fetch(&self, item: &Item) -> Thumbnail {
        if let Some(thumbnail) = self.cached(item) {
            return thumbnail;
        }
        let paths = match ThumbnailPaths::derive(&item.id, &item.etag) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::warn!(error = ?err, "Item cannot be mapped to a thumbnail location");
                return self.fail(item);
            },
        };
        if let Some(image) = self.local(&paths).await {
            self.cache.set(&item.id, CachedImageState::Actual(image.clone()));
            return Thumbnail::actual(&item.id, image);
        }
        match self.download(item, &paths).await {
            Ok(Some(image)) => {
                self.cache.set(&item.id, CachedImageState::Actual(image.clone()));
                Thumbnail::actual(&item.id, image)
            },
            Ok(None) => {
                tracing::debug!("Server returned no icon");
                self.fail(item)
            },
            Err(err) => {
                tracing::warn!(error = ?err, retryable = err.is_retryable(), "Thumbnail download failed");
                self.fail(item)
            },
        }
    }

    async fn local(&self, paths: &ThumbnailPaths) -> Option<ImageHandle> {
        if !self.exists(&paths.icon).await {
            return None;
        }
        let bytes = match self.backend.read(&paths.icon).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = ?err, path = %paths.icon.display(), "Stored icon is unreadable");
                return None;
            },
        };
        match ImageHandle::decode(bytes) {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::debug!(error = ?err, path = %paths.icon.display(), "Stored icon does not decode");
                None
            },
        }
    }

    async fn download(&self, item: &Item, paths: &ThumbnailPaths) -> Result<Option<ImageHandle>> {
        // Only a complete local pair makes a conditional request worthwhile.
        let etag = match self.exists(&paths.icon).await && self.exists(&paths.preview).await {
            true => item.resource_etag.clone(),
            false => None,
        };
        let request = PreviewRequest {
            path: item.path(),
            width: self.settings.preview_width,
            height: self.settings.preview_height,
            icon_size: self.settings.icon_size,
            etag,
        };
        let response = self.transport.download_preview(&request).await.or_raise(|| ErrorKind::Remote)?;
        let Some(icon) = response.icon else {
            return Ok(None);
        };
        // Nothing is stored unless the icon decodes.
        let image = ImageHandle::decode(icon.clone())?;
        if let Some(preview) = &response.preview {
            self.store_file(&paths.preview, preview).await;
        }
        self.store_file(&paths.icon, &icon).await;
        if let Some(etag) = &response.etag
            && let Err(err) = self.store.persist_resource_etag(&item.id, etag).await
        {
            // The item may have been deleted while the download ran.
            tracing::warn!(error = ?err, "Could not record preview revision");
        }
        Ok(Some(image))
    }

    async fn exists(&self, path: &std::path::Path) -> bool {
        self.backend.exists(path).await.unwrap_or_else(|err| {
            tracing::debug!(error = ?err, path = %path.display(), "Existence check failed");
            false
        })
    }

    async fn store_file(&self, path: &std::path::Path, data: &[u8]) {
        if let Err(err) = self.backend.write(path, data).await {
            tracing::warn!(error = ?err, backend = self.backend.name(), path = %path.display(), "Could not store downloaded file");
        }
    }

    fn placeholder(&self, item: &Item) -> Thumbnail {
        let glyph = ImageHandle::glyph(Glyph::for_kind(item.kind), self.settings.placeholder_size);
        Thumbnail::placeholder(&item.id, glyph)
    }

    fn fail(&self, item: &Item) -> Thumbnail {
        self.cache.set(&item.id, CachedImageState::Placeholder);
        self.placeholder(item)
    }
}
