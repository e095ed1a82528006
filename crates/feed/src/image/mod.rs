//! Image handles and the shared thumbnail cache.

mod cache;

pub use self::cache::{CachedImageState, ImageCache};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use mosaic_store::MediaKind;
use std::io::Cursor;
use std::sync::Arc;

/// Stock artwork shown in place of a thumbnail that could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    Photo,
    Video,
}
impl Glyph {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::Photo,
            MediaKind::Video => Self::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Encoded image bytes, as stored on disk.
    Encoded(Arc<[u8]>),
    Glyph(Glyph),
}

/// A width and height in logical points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}
impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An image ready to hand to the UI, together with its natural dimensions.
///
/// Cloning is cheap: encoded bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub source: ImageSource,
    pub width: u32,
    pub height: u32,
}
impl ImageHandle {
    /// Reads the dimensions of encoded image bytes without decoding pixels.
    ///
    /// Images with no area are rejected, so every handle can be laid out.
    pub fn decode(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let bytes = bytes.into();
        let (width, height) = image::ImageReader::new(Cursor::new(&bytes[..]))
            .with_guessed_format()
            .or_raise(|| ErrorKind::Decode)?
            .into_dimensions()
            .or_raise(|| ErrorKind::Decode)?;
        if width == 0 || height == 0 {
            exn::bail!(ErrorKind::Decode);
        }
        Ok(Self { source: ImageSource::Encoded(bytes), width, height })
    }

    /// A square stock glyph with an edge of `size` points.
    pub fn glyph(glyph: Glyph, size: u32) -> Self {
        Self { source: ImageSource::Glyph(glyph), width: size, height: size }
    }

    pub fn is_glyph(&self) -> bool {
        matches!(self.source, ImageSource::Glyph(_))
    }

    pub fn natural_size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}
