//! SQLite-backed [`MediaStore`].

use crate::Database;
use crate::api::MediaStore;
use crate::diff::Diff;
use crate::error::{ErrorKind, Result};
use crate::models::Item;
use crate::predicate::{Predicate, Sort};
use crate::row::ItemRow;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::instrument;

/// Repository for the `items` table.
///
/// Reconciliation runs in a single transaction per window, so a reader never
/// observes half of a diff.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn select<'a>(predicate: &'a Predicate, sort: Sort, limit: Option<i64>) -> QueryBuilder<'a, Sqlite> {
        let mut builder = QueryBuilder::new(include_str!("../queries/select_items.sql"));
        builder.push(" WHERE account = ").push_bind(predicate.account.as_str());
        // BEGINSWITH without LIKE, so `%` and `_` in folder names stay literal.
        builder
            .push(" AND substr(server_url, 1, length(")
            .push_bind(predicate.path_prefix.as_str())
            .push(")) = ")
            .push_bind(predicate.path_prefix.as_str());
        builder.push(" AND kind IN (");
        let mut kinds = builder.separated(", ");
        for kind in &predicate.kinds {
            kinds.push_bind(kind.to_string());
        }
        kinds.push_unseparated(")");
        if !predicate.include_uploading {
            builder.push(" AND uploading = 0");
        }
        if let Some(window) = predicate.window {
            builder.push(" AND date > ").push_bind(window.after.unix_timestamp());
            // Rows hold whole seconds, so a fractional upper bound rounds up.
            let before = window.before.unix_timestamp() + i64::from(window.before.nanosecond() > 0);
            builder.push(" AND date < ").push_bind(before);
        }
        let direction = if sort.ascending { "ASC" } else { "DESC" };
        builder.push(format_args!(" ORDER BY {} {direction}, id {direction}", sort.field.column()));
        if let Some(limit) = limit {
            builder.push(" LIMIT ").push_bind(limit);
        }
        builder
    }

    async fn fetch(&self, predicate: &Predicate, sort: Sort, limit: Option<i64>) -> Result<Vec<Item>> {
        if predicate.kinds.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ItemRow> = Self::select(predicate, sort, limit)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Item::try_from).collect()
    }

    /// Insert or replace a single item, keeping any stored preview revision
    /// tag when the incoming item has none.
    pub async fn upsert(&self, item: &Item) -> Result<()> {
        let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Database)?;
        Self::upsert_with(&mut *conn, item).await
    }

    async fn upsert_with(conn: &mut sqlx::SqliteConnection, item: &Item) -> Result<()> {
        let row = ItemRow::from(item);
        sqlx::query(include_str!("../queries/upsert_item.sql"))
            .bind(row.id)
            .bind(row.account)
            .bind(row.server_url)
            .bind(row.file_name)
            .bind(row.etag)
            .bind(row.resource_etag)
            .bind(row.kind)
            .bind(row.date)
            .bind(row.creation_date)
            .bind(row.upload_date)
            .bind(row.uploading)
            .execute(conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[async_trait]
impl MediaStore for Repository {
    async fn query(&self, predicate: &Predicate, sort: Sort) -> Result<Vec<Item>> {
        self.fetch(predicate, sort, None).await
    }

    async fn first(&self, predicate: &Predicate, sort: Sort) -> Result<Option<Item>> {
        Ok(self.fetch(predicate, sort, Some(1)).await?.into_iter().next())
    }

    #[instrument(skip_all, fields(incoming = incoming.len(), existing = existing.len()))]
    async fn diff(&self, incoming: Vec<Item>, existing: Vec<Item>) -> Result<Diff> {
        let diff = Diff::plan(incoming, &existing);
        if diff.is_empty() {
            return Ok(diff);
        }
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for item in &diff.updated {
            Self::upsert_with(&mut *tx, item).await?;
        }
        for id in &diff.deleted {
            sqlx::query(include_str!("../queries/delete_item.sql"))
                .bind(id)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(updated = diff.updated.len(), deleted = diff.deleted.len(), "Reconciled item window");
        Ok(diff)
    }

    async fn persist_resource_etag(&self, id: &str, etag: &str) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/update_resource_etag.sql"))
            .bind(etag)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::ItemNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use crate::predicate::{DateWindow, SortField};
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn item(id: &str, kind: MediaKind, date: OffsetDateTime) -> Item {
        Item {
            id: id.to_string(),
            account: "alice".to_string(),
            server_url: "/Photos".to_string(),
            file_name: format!("{id}.bin"),
            etag: "e1".to_string(),
            resource_etag: None,
            kind,
            date,
            creation_date: date,
            upload_date: date,
            uploading: false,
        }
    }

    async fn repository() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    #[tokio::test]
    async fn test_diff_inserts_then_query_sorts() {
        let repo = repository().await;
        let incoming = vec![
            item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC)),
            item("b", MediaKind::Video, datetime!(2024-03-01 0:00 UTC)),
            item("c", MediaKind::Image, datetime!(2024-02-01 0:00 UTC)),
        ];
        let diff = repo.diff(incoming, vec![]).await.unwrap();
        assert_eq!(diff.updated.len(), 3);
        let predicate = Predicate::new("alice", "/");
        let items = repo.query(&predicate, Sort::newest(SortField::Date)).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        let oldest = repo.first(&predicate, Sort::oldest(SortField::Date)).await.unwrap().unwrap();
        assert_eq!(oldest.id, "a");
    }

    #[tokio::test]
    async fn test_query_filters_kind_window_and_uploads() {
        let repo = repository().await;
        let mut uploading = item("u", MediaKind::Image, datetime!(2024-02-10 0:00 UTC));
        uploading.uploading = true;
        let incoming = vec![
            item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC)),
            item("b", MediaKind::Video, datetime!(2024-02-15 0:00 UTC)),
            item("c", MediaKind::Image, datetime!(2024-02-01 0:00 UTC)),
            uploading,
        ];
        repo.diff(incoming, vec![]).await.unwrap();
        let window = DateWindow {
            after: datetime!(2024-01-15 0:00 UTC),
            before: datetime!(2024-03-01 0:00 UTC),
        };
        let predicate = Predicate::new("alice", "/Photos").with_kinds([MediaKind::Image]).within(window);
        let items = repo.query(&predicate, Sort::newest(SortField::Date)).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["c"]);
    }

    #[tokio::test]
    async fn test_window_edges_match_in_memory_predicate() {
        let repo = repository().await;
        let stored = item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC));
        repo.diff(vec![stored.clone()], vec![]).await.unwrap();
        let windows = [
            (datetime!(2023-12-31 23:59:59.5 UTC), datetime!(2024-01-01 0:00:00.5 UTC)),
            (datetime!(2024-01-01 0:00 UTC), datetime!(2024-01-02 0:00 UTC)),
            (datetime!(2023-12-31 0:00 UTC), datetime!(2024-01-01 0:00 UTC)),
            (datetime!(2023-12-31 0:00 UTC), datetime!(2023-12-31 23:59:59.5 UTC)),
        ];
        for (after, before) in windows {
            let predicate = Predicate::new("alice", "/").within(DateWindow { after, before });
            let found = !repo.query(&predicate, Sort::newest(SortField::Date)).await.unwrap().is_empty();
            assert_eq!(found, predicate.matches(&stored), "{after} .. {before}");
        }
    }

    #[tokio::test]
    async fn test_path_prefix_is_literal() {
        let repo = repository().await;
        let mut odd = item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC));
        odd.server_url = "/Photos_2024".to_string();
        repo.diff(vec![odd], vec![]).await.unwrap();
        let predicate = Predicate::new("alice", "/Photos%");
        assert!(repo.query(&predicate, Sort::newest(SortField::Date)).await.unwrap().is_empty());
        let predicate = Predicate::new("alice", "/Photos_");
        assert_eq!(repo.query(&predicate, Sort::newest(SortField::Date)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_diff_deletes_missing_and_skips_unchanged() {
        let repo = repository().await;
        let existing = vec![
            item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC)),
            item("b", MediaKind::Image, datetime!(2024-01-02 0:00 UTC)),
        ];
        repo.diff(existing.clone(), vec![]).await.unwrap();
        let diff = repo.diff(vec![existing[0].clone()], existing).await.unwrap();
        assert!(diff.updated.is_empty());
        assert_eq!(diff.deleted, ["b"]);
        let items = repo.query(&Predicate::new("alice", "/"), Sort::newest(SortField::Date)).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_resource_etag_survives_content_update() {
        let repo = repository().await;
        let original = item("a", MediaKind::Image, datetime!(2024-01-01 0:00 UTC));
        repo.upsert(&original).await.unwrap();
        repo.persist_resource_etag("a", "preview-1").await.unwrap();
        let mut changed = original.clone();
        changed.etag = "e2".to_string();
        let current = repo.query(&Predicate::new("alice", "/"), Sort::newest(SortField::Date)).await.unwrap();
        repo.diff(vec![changed], current).await.unwrap();
        let stored = repo.first(&Predicate::new("alice", "/"), Sort::newest(SortField::Date)).await.unwrap().unwrap();
        assert_eq!(stored.etag, "e2");
        assert_eq!(stored.resource_etag.as_deref(), Some("preview-1"));
    }

    #[tokio::test]
    async fn test_persist_resource_etag_unknown_item() {
        let repo = repository().await;
        let err = repo.persist_resource_etag("missing", "x").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ItemNotFound(_)));
    }
}
