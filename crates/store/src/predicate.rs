//! Query predicates and sort orders understood by every [`MediaStore`](crate::MediaStore).

use crate::models::{Item, MediaKind};
use time::OffsetDateTime;

/// An open interval on [`Item::date`]; both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub after: OffsetDateTime,
    pub before: OffsetDateTime,
}
impl DateWindow {
    pub fn contains(&self, date: OffsetDateTime) -> bool {
        date > self.after && date < self.before
    }
}

/// Selects the items that belong to one account's media feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub account: String,
    /// Items must live at or below this server location.
    pub path_prefix: String,
    /// Accepted media kinds; empty matches nothing.
    pub kinds: Vec<MediaKind>,
    pub include_uploading: bool,
    pub window: Option<DateWindow>,
}
impl Predicate {
    /// Both kinds, no upload-in-progress items, no date window.
    pub fn new(account: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            path_prefix: path_prefix.into(),
            kinds: vec![MediaKind::Image, MediaKind::Video],
            include_uploading: false,
            window: None,
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = MediaKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        item.account == self.account
            && item.server_url.starts_with(&self.path_prefix)
            && self.kinds.contains(&item.kind)
            && (self.include_uploading || !item.uploading)
            && self.window.is_none_or(|window| window.contains(item.date))
    }
}

/// Which of the three item timestamps orders the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SortField {
    #[default]
    Date,
    CreationDate,
    UploadDate,
}
impl SortField {
    pub fn of(self, item: &Item) -> OffsetDateTime {
        match self {
            Self::Date => item.date,
            Self::CreationDate => item.creation_date,
            Self::UploadDate => item.upload_date,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::CreationDate => "creation_date",
            Self::UploadDate => "upload_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub ascending: bool,
}
impl Sort {
    pub fn newest(field: SortField) -> Self {
        Self { field, ascending: false }
    }

    pub fn oldest(field: SortField) -> Self {
        Self { field, ascending: true }
    }

    /// Sorts in place; ties are broken by identifier so every store returns
    /// the same order.
    pub fn apply(self, items: &mut [Item]) {
        items.sort_by(|a, b| {
            let ordering = self.field.of(a).cmp(&self.field.of(b)).then_with(|| a.id.cmp(&b.id));
            match self.ascending {
                true => ordering,
                false => ordering.reverse(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn item(id: &str, kind: MediaKind, date: OffsetDateTime) -> Item {
        Item {
            id: id.to_string(),
            account: "alice".to_string(),
            server_url: "/Photos/2024".to_string(),
            file_name: format!("{id}.jpg"),
            etag: "e".to_string(),
            resource_etag: None,
            kind,
            date,
            creation_date: date,
            upload_date: date,
            uploading: false,
        }
    }

    #[test]
    fn test_matches_scope() {
        let predicate = Predicate::new("alice", "/Photos");
        let mut candidate = item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC));
        assert!(predicate.matches(&candidate));
        candidate.account = "bob".to_string();
        assert!(!predicate.matches(&candidate));
    }

    #[test]
    fn test_matches_excludes_uploads_and_other_paths() {
        let predicate = Predicate::new("alice", "/Photos");
        let mut uploading = item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC));
        uploading.uploading = true;
        assert!(!predicate.matches(&uploading));
        let mut elsewhere = item("b", MediaKind::Image, datetime!(2024-01-01 0:00 UTC));
        elsewhere.server_url = "/Documents".to_string();
        assert!(!predicate.matches(&elsewhere));
    }

    #[test]
    fn test_matches_kinds() {
        let predicate = Predicate::new("alice", "/").with_kinds([MediaKind::Video]);
        assert!(!predicate.matches(&item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC))));
        assert!(predicate.matches(&item("b", MediaKind::Video, datetime!(2024-01-01 0:00 UTC))));
    }

    #[test]
    fn test_window_bounds_are_exclusive() {
        let window = DateWindow {
            after: datetime!(2024-01-01 0:00 UTC),
            before: datetime!(2024-02-01 0:00 UTC),
        };
        let predicate = Predicate::new("alice", "/").within(window);
        assert!(!predicate.matches(&item("a", MediaKind::Image, window.after)));
        assert!(!predicate.matches(&item("b", MediaKind::Image, window.before)));
        assert!(predicate.matches(&item("c", MediaKind::Image, datetime!(2024-01-15 0:00 UTC))));
    }

    #[test]
    fn test_sort_newest_first_with_id_tiebreak() {
        let mut items = vec![
            item("b", MediaKind::Image, datetime!(2024-01-01 0:00 UTC)),
            item("c", MediaKind::Image, datetime!(2024-03-01 0:00 UTC)),
            item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC)),
        ];
        Sort::newest(SortField::Date).apply(&mut items);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
        Sort::oldest(SortField::Date).apply(&mut items);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
