//! Which items the feed shows.

use mosaic_config::Config;
use mosaic_store::{MediaKind, Predicate, SortField};

/// The user's media type toggles.
///
/// With neither set the feed shows everything. When both are set,
/// `image_only` wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    pub image_only: bool,
    pub video_only: bool,
}
impl FilterState {
    pub fn kinds(self) -> Vec<MediaKind> {
        match (self.image_only, self.video_only) {
            (true, _) => vec![MediaKind::Image],
            (false, true) => vec![MediaKind::Video],
            (false, false) => vec![MediaKind::Image, MediaKind::Video],
        }
    }
}

/// The account and server location a feed is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedScope {
    pub account: String,
    pub media_path: String,
    pub include_hidden: bool,
    pub sort: SortField,
}
impl FeedScope {
    pub fn new(account: impl Into<String>, media_path: impl Into<String>) -> Self {
        Self { account: account.into(), media_path: media_path.into(), include_hidden: false, sort: SortField::Date }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            account: config.account.clone(),
            media_path: config.media_path.clone(),
            include_hidden: config.include_hidden,
            sort: config.sort,
        }
    }

    /// Items of this scope that pass `filter`, excluding uploads in progress.
    pub fn predicate(&self, filter: FilterState) -> Predicate {
        Predicate::new(&self.account, &self.media_path).with_kinds(filter.kinds())
    }
}
