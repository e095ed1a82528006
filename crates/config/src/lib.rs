//! Layered configuration for the media feed.
//!
//! Values are merged in order, later layers winning:
//! 1. built-in defaults,
//! 2. a TOML, YAML or JSON file (picked by extension),
//! 3. `MOSAIC_`-prefixed environment variables, with `__` separating nested
//!    keys (`MOSAIC_VIEWPORT__WIDTH=1440`).
//!
//! The merged result is validated before it is handed out.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use mosaic_store::SortField;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "MOSAIC_";
const DEFAULT_FILE: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1080, height: 1920 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account whose media the feed shows.
    pub account: String,
    /// Server location the feed is scoped to; items below it are included.
    pub media_path: String,
    /// Ask the server for hidden files too.
    pub include_hidden: bool,
    /// Timestamp the feed is ordered by, newest first.
    pub sort: SortField,
    /// Concurrent thumbnail fetches.
    pub workers: usize,
    /// Logical screen size; remote previews are requested at half of it.
    pub viewport: Viewport,
    pub icon_size: u32,
    /// Logical edge length of the stock glyph shown for failed thumbnails.
    pub placeholder_size: u32,
    /// Seconds before a failed thumbnail is retried. `None` never retries.
    pub placeholder_ttl_secs: Option<u64>,
    pub search_timeout_secs: u64,
    /// Defaults to the platform cache directory.
    pub thumbnail_dir: Option<PathBuf>,
    /// Defaults to `items.db` in the platform data directory.
    pub database: Option<PathBuf>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            account: String::new(),
            media_path: "/".to_string(),
            include_hidden: false,
            sort: SortField::Date,
            workers: 8,
            viewport: Viewport::default(),
            icon_size: 512,
            placeholder_size: 128,
            placeholder_ttl_secs: Some(300),
            search_timeout_secs: 300,
            thumbnail_dir: None,
            database: None,
        }
    }
}

impl Config {
    /// Load from the given file, or from `config.toml` in the platform
    /// configuration directory. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => project_dirs()?.config_dir().join(DEFAULT_FILE),
        };
        let config = Self::from_figment(Self::figment(&path)?)?;
        tracing::debug!(path = %path.display(), account = %config.account, "Loaded configuration");
        Ok(config)
    }

    /// The layered provider stack, without extracting it.
    pub fn figment(path: &Path) -> Result<Figment> {
        let defaults = Figment::from(Serialized::defaults(Config::default()));
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        let figment = match extension.as_deref() {
            Some("toml") => defaults.merge(Toml::file(path)),
            Some("yaml" | "yml") => defaults.merge(Yaml::file(path)),
            Some("json") => defaults.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("account", "must not be empty"));
        }
        if !self.media_path.starts_with('/') {
            exn::bail!(ErrorKind::Invalid("media_path", "must start with '/'"));
        }
        if self.workers == 0 {
            exn::bail!(ErrorKind::Invalid("workers", "must be at least 1"));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            exn::bail!(ErrorKind::Invalid("viewport", "width and height must be nonzero"));
        }
        if self.icon_size == 0 {
            exn::bail!(ErrorKind::Invalid("icon_size", "must be nonzero"));
        }
        if self.placeholder_size == 0 {
            exn::bail!(ErrorKind::Invalid("placeholder_size", "must be nonzero"));
        }
        if self.search_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("search_timeout_secs", "must be nonzero"));
        }
        Ok(())
    }

    pub fn placeholder_ttl(&self) -> Option<Duration> {
        self.placeholder_ttl_secs.map(Duration::from_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn thumbnail_dir(&self) -> Result<PathBuf> {
        match &self.thumbnail_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.cache_dir().join("thumbnails")),
        }
    }

    pub fn database(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("items.db")),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "mosaic").ok_or_raise(|| ErrorKind::NoHomeDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use std::io::Write;

    fn valid() -> Config {
        Config { account: "alice".to_string(), ..Config::default() }
    }

    #[test]
    fn test_defaults_need_an_account() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid("account", _)));
        valid().validate().unwrap();
    }

    #[rstest]
    #[case::relative_path(Config { media_path: "Photos".to_string(), ..valid() }, "media_path")]
    #[case::no_workers(Config { workers: 0, ..valid() }, "workers")]
    #[case::flat_viewport(Config { viewport: Viewport { width: 1080, height: 0 }, ..valid() }, "viewport")]
    #[case::no_icon(Config { icon_size: 0, ..valid() }, "icon_size")]
    #[case::no_placeholder(Config { placeholder_size: 0, ..valid() }, "placeholder_size")]
    #[case::no_timeout(Config { search_timeout_secs: 0, ..valid() }, "search_timeout_secs")]
    fn test_invalid_values(#[case] config: Config, #[case] key: &str) {
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(k, _) if *k == key));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Config::figment(Path::new("mosaic.ini")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "account: bob\nworkers: 2\nviewport:\n  width: 800\n  height: 600").unwrap();
        let config = Config::from_figment(Config::figment(file.path()).unwrap()).unwrap();
        assert_eq!(config.account, "bob");
        assert_eq!(config.workers, 2);
        assert_eq!(config.viewport, Viewport { width: 800, height: 600 });
        assert_eq!(config.icon_size, 512);
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mosaic.toml",
                r#"
                    account = "alice"
                    media_path = "/Photos"
                    sort = "upload_date"
                    placeholder_ttl_secs = 60
                "#,
            )?;
            jail.set_env("MOSAIC_ACCOUNT", "carol");
            jail.set_env("MOSAIC_VIEWPORT__WIDTH", "1440");
            let config = Config::load(Some(Path::new("mosaic.toml"))).unwrap();
            assert_eq!(config.account, "carol");
            assert_eq!(config.media_path, "/Photos");
            assert_eq!(config.sort, SortField::UploadDate);
            assert_eq!(config.viewport.width, 1440);
            assert_eq!(config.viewport.height, 1920);
            assert_eq!(config.placeholder_ttl(), Some(Duration::from_secs(60)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("MOSAIC_ACCOUNT", "dave");
            let config = Config::load(Some(Path::new("absent.json"))).unwrap();
            assert_eq!(config.workers, 8);
            assert_eq!(config.search_timeout(), Duration::from_secs(300));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = Config { thumbnail_dir: Some(PathBuf::from("/tmp/thumbs")), ..valid() };
        assert_eq!(config.thumbnail_dir().unwrap(), PathBuf::from("/tmp/thumbs"));
    }
}
