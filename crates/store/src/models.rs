//! Store models.

use derive_more::Display;
use std::str::FromStr;
use time::OffsetDateTime;

/// Whether an item is a still image or a video.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaKind {
    #[display("image")]
    Image,
    #[display("video")]
    Video,
}
impl MediaKind {
    /// Classifies a MIME content type. Anything that is neither an image nor
    /// a video does not belong in the feed.
    ///
    /// ```
    /// use mosaic_store::MediaKind;
    /// assert_eq!(MediaKind::from_content_type("image/heic"), Some(MediaKind::Image));
    /// assert_eq!(MediaKind::from_content_type("Video/MP4"), Some(MediaKind::Video));
    /// assert_eq!(MediaKind::from_content_type("text/plain"), None);
    /// ```
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let (top, _) = content_type.split_once('/')?;
        match top.to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn is_video(self) -> bool {
        self == Self::Video
    }
}
impl FromStr for MediaKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            _ => Err(()),
        }
    }
}

/// One photo or video known to the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Server-side file identifier; unique and stable across renames.
    pub id: String,
    pub account: String,
    /// Parent location of the file on the server.
    pub server_url: String,
    pub file_name: String,
    /// Revision tag of the file content.
    pub etag: String,
    /// Revision tag of the last downloaded preview, if any.
    pub resource_etag: Option<String>,
    pub kind: MediaKind,
    /// Capture date (falls back to last modification on the server).
    pub date: OffsetDateTime,
    pub creation_date: OffsetDateTime,
    pub upload_date: OffsetDateTime,
    /// An upload of this file is still in progress.
    pub uploading: bool,
}
impl Item {
    /// Server path of the file, relative to the account's home.
    pub fn path(&self) -> String {
        match self.server_url.ends_with('/') {
            true => format!("{}{}", self.server_url, self.file_name),
            false => format!("{}/{}", self.server_url, self.file_name),
        }
    }
}

/// A file record as returned by a remote media search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub account: String,
    pub server_url: String,
    pub file_name: String,
    pub etag: String,
    pub content_type: String,
    pub date: OffsetDateTime,
    pub creation_date: OffsetDateTime,
    pub upload_date: OffsetDateTime,
}
impl RemoteFile {
    /// Converts the record into a store item. Returns `None` for content
    /// that isn't a photo or a video.
    pub fn to_item(&self) -> Option<Item> {
        Some(Item {
            id: self.id.clone(),
            account: self.account.clone(),
            server_url: self.server_url.clone(),
            file_name: self.file_name.clone(),
            etag: self.etag.clone(),
            resource_etag: None,
            kind: MediaKind::from_content_type(&self.content_type)?,
            date: whole_seconds(self.date),
            creation_date: whole_seconds(self.creation_date),
            upload_date: whole_seconds(self.upload_date),
            uploading: false,
        })
    }
}

/// Drops the sub-second part; the SQLite store keeps whole seconds.
fn whole_seconds(date: OffsetDateTime) -> OffsetDateTime {
    date - time::Duration::nanoseconds(i64::from(date.nanosecond()))
}
