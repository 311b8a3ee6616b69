//! Cache configuration.
//!
//! A cache reads its policy from a small TOML table:
//!
//! ```toml
//! readonly = false
//! sync_rate = 100
//! keys = ["SLOT", "EAPI", "DESCRIPTION", "_eclasses_"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Policy settings for a [`MetadataCache`](crate::MetadataCache).
///
/// Backend capability flags (auto-commit, key cleansing, eclass
/// serialization) are declared by the backend itself; this only carries
/// what the caller chooses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Reject every mutation. Combined with the backend's own flag.
    pub readonly: bool,

    /// Number of pending writes tolerated before the cache flushes.
    /// Zero flushes after every write.
    pub sync_rate: usize,

    /// Custom key set; the standard metadata keys when unset.
    pub keys: Option<Vec<String>>,
}

impl CacheConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_cache::CacheConfig;
    ///
    /// let config = CacheConfig::from_toml("sync_rate = 50").unwrap();
    /// assert_eq!(config.sync_rate, 50);
    /// assert!(!config.readonly);
    /// ```
    pub fn from_toml(input: &str) -> Result<Self> {
        parse(input, Path::new("<inline>"))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config from {}", path.display()), e))?;
        let config = parse(&content, path)?;
        debug!("Loaded cache config from {}", path.display());
        Ok(config)
    }

    /// The key schema this configuration selects.
    pub fn schema(&self) -> Schema {
        match &self.keys {
            Some(keys) => Schema::new(keys.iter().cloned()),
            None => Schema::default(),
        }
    }
}

fn parse(input: &str, path: &Path) -> Result<CacheConfig> {
    toml::from_str(input).map_err(|e| Error::InvalidConfig {
        path: PathBuf::from(path),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = CacheConfig::from_toml("").unwrap();
        assert_eq!(config, CacheConfig::default());
        assert_eq!(config.sync_rate, 0);
        assert_eq!(config.schema(), Schema::default());
    }

    #[test]
    fn custom_keys() {
        let config = CacheConfig::from_toml("keys = [\"SLOT\", \"EAPI\"]\nreadonly = true").unwrap();
        assert!(config.readonly);
        let schema = config.schema();
        assert!(schema.contains("SLOT"));
        assert!(!schema.contains("DEPEND"));
    }

    #[test]
    fn invalid_toml() {
        let err = CacheConfig::from_toml("sync_rate = \"often\"").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { ref path, .. } if path == Path::new("<inline>")));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sync_rate = 25").unwrap();
        let config = CacheConfig::load(file.path()).unwrap();
        assert_eq!(config.sync_rate, 25);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CacheConfig::load(&dir.path().join("cache.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn serialize_round_trip() {
        let config = CacheConfig {
            readonly: true,
            sync_rate: 7,
            keys: Some(vec!["SLOT".to_string()]),
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(CacheConfig::from_toml(&text).unwrap(), config);
    }
}
