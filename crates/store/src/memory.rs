//! In-memory item store for testing.

use crate::api::MediaStore;
use crate::diff::Diff;
use crate::error::{ErrorKind, Result};
use crate::models::Item;
use crate::predicate::{Predicate, Sort};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory [`MediaStore`] keyed by item identifier.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, Item>>,
    diffs: AtomicUsize,
}
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|item| (item.id.clone(), item)).collect()),
            diffs: AtomicUsize::new(0),
        }
    }

    /// Snapshot of every stored item, sorted by identifier.
    pub async fn items(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    pub async fn get(&self, id: &str) -> Option<Item> {
        self.items.read().await.get(id).cloned()
    }

    pub async fn insert(&self, item: Item) {
        self.items.write().await.insert(item.id.clone(), item);
    }

    /// Number of reconciliations that have been applied.
    pub fn diffs(&self) -> usize {
        self.diffs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStore for MemoryStore {
    async fn query(&self, predicate: &Predicate, sort: Sort) -> Result<Vec<Item>> {
        let mut items: Vec<Item> =
            self.items.read().await.values().filter(|item| predicate.matches(item)).cloned().collect();
        sort.apply(&mut items);
        Ok(items)
    }

    async fn diff(&self, incoming: Vec<Item>, existing: Vec<Item>) -> Result<Diff> {
        let diff = Diff::plan(incoming, &existing);
        let mut items = self.items.write().await;
        for item in &diff.updated {
            let mut item = item.clone();
            if item.resource_etag.is_none()
                && let Some(current) = items.get(&item.id)
            {
                item.resource_etag = current.resource_etag.clone();
            }
            items.insert(item.id.clone(), item);
        }
        for id in &diff.deleted {
            items.remove(id);
        }
        self.diffs.fetch_add(1, Ordering::SeqCst);
        Ok(diff)
    }

    async fn persist_resource_etag(&self, id: &str, etag: &str) -> Result<()> {
        let mut items = self.items.write().await;
        let Some(item) = items.get_mut(id) else {
            exn::bail!(ErrorKind::ItemNotFound(id.to_string()));
        };
        item.resource_etag = Some(etag.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use crate::predicate::SortField;
    use time::macros::datetime;

    fn item(id: &str, kind: MediaKind) -> Item {
        Item {
            id: id.to_string(),
            account: "alice".to_string(),
            server_url: "/Photos".to_string(),
            file_name: format!("{id}.bin"),
            etag: "e1".to_string(),
            resource_etag: None,
            kind,
            date: datetime!(2024-01-01 0:00 UTC),
            creation_date: datetime!(2024-01-01 0:00 UTC),
            upload_date: datetime!(2024-01-01 0:00 UTC),
            uploading: false,
        }
    }

    #[tokio::test]
    async fn test_query_applies_predicate_and_sort() {
        let store = MemoryStore::with_items([item("b", MediaKind::Image), item("a", MediaKind::Image), item("v", MediaKind::Video)]);
        let predicate = Predicate::new("alice", "/").with_kinds([MediaKind::Image]);
        let items = store.query(&predicate, Sort::oldest(SortField::Date)).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_diff_keeps_resource_etag() {
        let store = MemoryStore::with_items([item("a", MediaKind::Image)]);
        store.persist_resource_etag("a", "r1").await.unwrap();
        let mut changed = item("a", MediaKind::Image);
        changed.etag = "e2".to_string();
        store.diff(vec![changed], store.items().await).await.unwrap();
        let stored = store.get("a").await.unwrap();
        assert_eq!(stored.etag, "e2");
        assert_eq!(stored.resource_etag.as_deref(), Some("r1"));
        assert_eq!(store.diffs(), 1);
    }

    #[tokio::test]
    async fn test_persist_resource_etag_unknown_item() {
        let store = MemoryStore::new();
        let err = store.persist_resource_etag("missing", "x").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ItemNotFound(_)));
    }
}
