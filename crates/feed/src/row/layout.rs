use super::error::{ErrorKind, Result};
use crate::image::Size;
use crate::thumbnail::Thumbnail;

/// Display sizes for one row, in the order the thumbnails were given.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    /// Each thumbnail scaled to the height of the tallest one.
    pub sizes: Vec<Size>,
    /// Factor that makes the scaled thumbnails and the gaps between them
    /// exactly fill the target width. Above 1 means the row is stretched.
    pub shrink_ratio: f64,
}

/// Scales every thumbnail to a common height, then works out how much the
/// whole row has to shrink (or grow) to fit `target_width`.
///
/// ```
/// use mosaic_feed::image::{Glyph, ImageHandle};
/// use mosaic_feed::row::layout;
/// use mosaic_feed::thumbnail::Thumbnail;
///
/// let wide = Thumbnail::actual("a", ImageHandle { width: 100, height: 50, ..ImageHandle::glyph(Glyph::Photo, 1) });
/// let tall = Thumbnail::actual("b", ImageHandle { width: 50, height: 100, ..ImageHandle::glyph(Glyph::Photo, 1) });
/// let row = layout(&[wide, tall], 300.0, 10.0).unwrap();
/// assert_eq!(row.sizes[0].width, 200.0);
/// assert!((row.shrink_ratio - 1.16).abs() < 1e-9);
/// ```
pub fn layout(thumbnails: &[Thumbnail], target_width: f64, spacing: f64) -> Result<RowLayout> {
    if thumbnails.is_empty() {
        exn::bail!(ErrorKind::EmptyRow);
    }
    let naturals: Vec<Size> = thumbnails.iter().map(|t| t.image.natural_size()).collect();
    if naturals.iter().any(|size| size.height <= 0.0) {
        exn::bail!(ErrorKind::ZeroWidth);
    }
    let max_height = naturals.iter().map(|size| size.height).fold(0.0, f64::max);
    let sizes: Vec<Size> = naturals
        .iter()
        .map(|size| {
            let scale = max_height / size.height;
            Size::new(size.width * scale, size.height * scale)
        })
        .collect();
    let total_width: f64 = sizes.iter().map(|size| size.width).sum();
    if total_width <= 0.0 {
        exn::bail!(ErrorKind::ZeroWidth);
    }
    // Thumbnail counts are tiny, so the conversion is exact.
    let gaps = (thumbnails.len() - 1) as f64;
    let available = target_width - spacing * gaps;
    if available <= 0.0 {
        exn::bail!(ErrorKind::NoRoom);
    }
    Ok(RowLayout { sizes, shrink_ratio: available / total_width })
}
