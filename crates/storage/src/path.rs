//! Path validation and thumbnail file naming.
//!
//! Every stored preview lives at a location derived purely from the item
//! identifier and its revision tag, so a changed revision tag naturally
//! points at a file that does not exist yet.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

const PREVIEW_SUFFIX: &str = "preview.ico";
const ICON_SUFFIX: &str = "small.ico";

/// Validates a storage path for security and correctness.
/// Ensures that paths don't escape the storage root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use mosaic_storage::validate_path;
/// assert!(validate_path("oc123/abc.small.ico").is_ok());
/// assert!(validate_path("../etc/passwd").is_err());
/// assert_eq!(validate_path("a/./b//c.ico").unwrap(), Path::new("a/b/c.ico"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Storage locations of the full preview and the small icon for one revision
/// of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailPaths {
    pub preview: PathBuf,
    pub icon: PathBuf,
}
impl ThumbnailPaths {
    /// Derives `<id>/<etag>.preview.ico` and `<id>/<etag>.small.ico`.
    ///
    /// Both parts must be usable as a single path segment: an identifier like
    /// `"../x"` would otherwise let a hostile server place files anywhere
    /// under the storage root.
    ///
    /// ```
    /// use mosaic_storage::ThumbnailPaths;
    /// let paths = ThumbnailPaths::derive("00000123oc", "5f1e").unwrap();
    /// assert_eq!(paths.icon.to_str(), Some("00000123oc/5f1e.small.ico"));
    /// assert_eq!(paths.preview.to_str(), Some("00000123oc/5f1e.preview.ico"));
    /// assert!(ThumbnailPaths::derive("..", "5f1e").is_err());
    /// ```
    pub fn derive(id: &str, etag: &str) -> Result<Self> {
        let id = segment(id)?;
        let etag = segment(etag)?;
        Ok(Self {
            preview: validate(Path::new(id).join(format!("{etag}.{PREVIEW_SUFFIX}")))?,
            icon: validate(Path::new(id).join(format!("{etag}.{ICON_SUFFIX}")))?,
        })
    }
}

fn segment(value: &str) -> Result<&str> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    match invalid {
        true => exn::bail!(ErrorKind::InvalidKey(value.to_string())),
        false => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate(Path::new("oc1/e1.small.ico")).unwrap(), Path::new("oc1/e1.small.ico"));
        assert_eq!(validate(Path::new("simple.ico")).unwrap(), Path::new("simple.ico"));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(validate(Path::new("a//b//c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/./b/./c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/b/..")).unwrap(), Path::new("a"));
        assert_eq!(validate(Path::new("oc1///")).unwrap(), Path::new("oc1"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate(Path::new("../etc/passwd")).is_err());
        assert!(validate(Path::new("a/../../b")).is_err());
        assert!(validate(Path::new("..")).is_err());
    }

    #[test]
    fn test_invalid_or_empty() {
        assert!(validate(Path::new("a\0b")).is_err());
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new("./.")).is_err());
        assert!(validate(Path::new("//")).is_err());
    }

    #[test]
    fn test_derive_is_pure() {
        let first = ThumbnailPaths::derive("oc42", "etag-1").unwrap();
        let second = ThumbnailPaths::derive("oc42", "etag-1").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.icon, Path::new("oc42/etag-1.small.ico"));
        assert_eq!(first.preview, Path::new("oc42/etag-1.preview.ico"));
    }

    #[test]
    fn test_derive_changes_with_revision() {
        let old = ThumbnailPaths::derive("oc42", "etag-1").unwrap();
        let new = ThumbnailPaths::derive("oc42", "etag-2").unwrap();
        assert_ne!(old.icon, new.icon);
    }

    #[test]
    fn test_derive_rejects_bad_segments() {
        for (id, etag) in [("", "e"), ("oc", ""), ("..", "e"), ("a/b", "e"), ("oc", "x/../../y"), ("oc", "a\\b")] {
            let err = ThumbnailPaths::derive(id, etag).unwrap_err();
            assert!(matches!(&*err, ErrorKind::InvalidKey(_)), "{id:?}/{etag:?} should be rejected");
        }
    }
}
