use crate::models::Item;
use std::collections::{HashMap, HashSet};

/// What reconciling a batch of remote items against the local window changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Items that were new, or whose revision tag changed.
    pub updated: Vec<Item>,
    /// Identifiers that were in the window locally but absent remotely.
    pub deleted: Vec<String>,
}
impl Diff {
    /// Works out the changes without applying them.
    ///
    /// An incoming item counts as updated unless an existing item with the
    /// same identifier carries the same revision tag. Every existing item
    /// whose identifier is missing from `incoming` is deleted.
    pub fn plan(incoming: Vec<Item>, existing: &[Item]) -> Self {
        let known: HashMap<&str, &str> = existing.iter().map(|i| (i.id.as_str(), i.etag.as_str())).collect();
        let seen: HashSet<&str> = incoming.iter().map(|i| i.id.as_str()).collect();
        let deleted = existing.iter().filter(|i| !seen.contains(i.id.as_str())).map(|i| i.id.clone()).collect();
        let updated = incoming
            .iter()
            .filter(|item| known.get(item.id.as_str()) != Some(&item.etag.as_str()))
            .cloned()
            .collect();
        Self { updated, deleted }
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.deleted.is_empty()
    }
}
