use super::ImageHandle;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// What is known about one item's thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedImageState {
    Actual(ImageHandle),
    /// A fetch failed; show the stock glyph instead of retrying.
    Placeholder,
}

#[derive(Debug)]
struct Entry {
    state: CachedImageState,
    stored: Instant,
}

/// Process-wide thumbnail cache keyed by item identifier.
///
/// Cloning the cache clones a handle: every clone reads and writes the same
/// map. Writes replace the whole entry, so the last writer wins. There is no
/// capacity bound; the feed drops the cache wholesale when the account
/// changes.
///
/// Placeholders can expire. Once a placeholder is older than the configured
/// TTL, [`get`](Self::get) treats it as absent and the next row render goes
/// back to the server for it.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    placeholder_ttl: Option<Duration>,
}

impl ImageCache {
    /// A cache whose placeholders never expire.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder_ttl(placeholder_ttl: Option<Duration>) -> Self {
        Self { entries: Arc::default(), placeholder_ttl }
    }

    pub fn get(&self, id: &str) -> Option<CachedImageState> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            let entry = entries.get(id)?;
            if !self.is_expired(entry) {
                return Some(entry.state.clone());
            }
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have replaced the entry in between.
        if entries.get(id).is_some_and(|entry| self.is_expired(entry)) {
            entries.remove(id);
            tracing::trace!(id, "Placeholder expired");
        }
        None
    }

    pub fn set(&self, id: impl Into<String>, state: CachedImageState) {
        let entry = Entry { state, stored: Instant::now() };
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(id.into(), entry);
    }

    pub fn remove(&self, id: &str) -> Option<CachedImageState> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(id).map(|entry| entry.state)
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        match (&entry.state, self.placeholder_ttl) {
            (CachedImageState::Placeholder, Some(ttl)) => entry.stored.elapsed() >= ttl,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Glyph;

    fn actual() -> CachedImageState {
        CachedImageState::Actual(ImageHandle::glyph(Glyph::Photo, 10))
    }

    #[test]
    fn test_absent_means_unknown() {
        let cache = ImageCache::new();
        assert_eq!(cache.get("oc1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = ImageCache::new();
        cache.set("oc1", CachedImageState::Placeholder);
        cache.set("oc1", actual());
        assert_eq!(cache.get("oc1"), Some(actual()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ImageCache::new();
        let other = cache.clone();
        other.set("oc1", actual());
        assert_eq!(cache.get("oc1"), Some(actual()));
        assert_eq!(cache.remove("oc1"), Some(actual()));
        assert!(other.is_empty());
    }

    #[test]
    fn test_placeholders_are_permanent_without_ttl() {
        let cache = ImageCache::new();
        cache.set("oc1", CachedImageState::Placeholder);
        assert_eq!(cache.get("oc1"), Some(CachedImageState::Placeholder));
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_expires_after_ttl() {
        let cache = ImageCache::with_placeholder_ttl(Some(Duration::from_secs(300)));
        cache.set("oc1", CachedImageState::Placeholder);
        cache.set("oc2", actual());
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("oc1"), Some(CachedImageState::Placeholder));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("oc1"), None);
        assert_eq!(cache.len(), 1, "expired placeholder is dropped");
        assert_eq!(cache.get("oc2"), Some(actual()), "actual images never expire");
    }
}
