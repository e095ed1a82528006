use crate::error::{Error, ErrorKind};
use crate::models::{Item, MediaKind};
use exn::{OptionExt, ResultExt};
use time::OffsetDateTime;

#[derive(sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub(crate) id: String,
    pub(crate) account: String,
    pub(crate) server_url: String,
    pub(crate) file_name: String,
    pub(crate) etag: String,
    pub(crate) resource_etag: Option<String>,
    pub(crate) kind: String,
    pub(crate) date: i64,
    pub(crate) creation_date: i64,
    pub(crate) upload_date: i64,
    pub(crate) uploading: bool,
}
impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            account: item.account.clone(),
            server_url: item.server_url.clone(),
            file_name: item.file_name.clone(),
            etag: item.etag.clone(),
            resource_etag: item.resource_etag.clone(),
            kind: item.kind.to_string(),
            date: item.date.unix_timestamp(),
            creation_date: item.creation_date.unix_timestamp(),
            upload_date: item.upload_date.unix_timestamp(),
            uploading: item.uploading,
        }
    }
}
impl TryFrom<ItemRow> for Item {
    type Error = Error;
    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: row.kind.parse::<MediaKind>().ok().ok_or_raise(|| ErrorKind::InvalidData("media kind"))?,
            date: OffsetDateTime::from_unix_timestamp(row.date).or_raise(|| ErrorKind::InvalidData("date"))?,
            creation_date: OffsetDateTime::from_unix_timestamp(row.creation_date)
                .or_raise(|| ErrorKind::InvalidData("creation date"))?,
            upload_date: OffsetDateTime::from_unix_timestamp(row.upload_date)
                .or_raise(|| ErrorKind::InvalidData("upload date"))?,
            id: row.id,
            account: row.account,
            server_url: row.server_url,
            file_name: row.file_name,
            etag: row.etag,
            resource_etag: row.resource_etag,
            uploading: row.uploading,
        })
    }
}
