use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::record::MetadataRecord;

/// Reserved key holding the inherited eclass provenance map.
pub const ECLASSES_KEY: &str = "_eclasses_";

/// The standard set of metadata keys a cache entry may carry.
///
/// These are the ebuild-defined variables the package manager extracts plus
/// the cache bookkeeping keys (`_mtime_`, `_md5_`, `_eclasses_`).
///
/// See [PMS 14.2](https://projects.gentoo.org/pms/9/pms.html#mddict-cache-file-format).
pub const METADATA_KEYS: &[&str] = &[
    "DEPEND",
    "RDEPEND",
    "SLOT",
    "SRC_URI",
    "RESTRICT",
    "HOMEPAGE",
    "LICENSE",
    "DESCRIPTION",
    "KEYWORDS",
    "INHERITED",
    "IUSE",
    "REQUIRED_USE",
    "PDEPEND",
    "BDEPEND",
    "IDEPEND",
    "PROPERTIES",
    "DEFINED_PHASES",
    "EAPI",
    "_mtime_",
    "_md5_",
    ECLASSES_KEY,
];

/// A closed set of keys accepted in a [`MetadataRecord`].
///
/// # Examples
///
/// ```
/// use portage_cache::{MetadataRecord, Schema};
///
/// let schema = Schema::default();
/// assert!(schema.contains("SLOT"));
///
/// let mut record = MetadataRecord::new();
/// record.insert("FOO", "bar");
/// assert!(schema.validate(&record).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    keys: BTreeSet<String>,
}

impl Schema {
    /// Build a schema from a custom key set.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `key` belongs to the schema.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Iterate over the registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Reject records carrying any key outside the schema.
    pub fn validate(&self, record: &MetadataRecord) -> Result<()> {
        match record.keys().find(|key| !self.contains(key)) {
            Some(key) => Err(Error::InvalidArgument(format!(
                "unknown metadata key: {key}"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::new(METADATA_KEYS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_has_bookkeeping_keys() {
        let schema = Schema::default();
        for key in ["_mtime_", "_md5_", ECLASSES_KEY, "EAPI", "DEFINED_PHASES"] {
            assert!(schema.contains(key), "{key} missing");
        }
        assert_eq!(schema.keys().count(), METADATA_KEYS.len());
    }

    #[test]
    fn validate_accepts_known_keys() {
        let mut record = MetadataRecord::new();
        record.insert("SLOT", "0");
        record.insert("DESCRIPTION", "Test");
        assert!(Schema::default().validate(&record).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_key() {
        let mut record = MetadataRecord::new();
        record.insert("SLOT", "0");
        record.insert("PROVIDE", "virtual/foo");
        let err = Schema::default().validate(&record).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("PROVIDE")));
    }

    #[test]
    fn custom_schema() {
        let schema = Schema::new(["SLOT", "EAPI"]);
        assert!(schema.contains("EAPI"));
        assert!(!schema.contains("DESCRIPTION"));
    }
}
