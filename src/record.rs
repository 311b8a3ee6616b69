use std::collections::BTreeMap;
use std::fmt;

use portage_atom::Slot;

use crate::eclass::{deconstruct_eclasses, EclassMap};
use crate::error::{Error, Result};
use crate::schema::ECLASSES_KEY;

/// A single metadata value.
///
/// Everything is text except the eclass provenance, which is held decoded
/// in memory and flattened to text only when a cache stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// Plain string value, e.g. `SLOT` or `DEPEND`.
    Text(String),
    /// Decoded `_eclasses_` value.
    Eclasses(EclassMap),
}

impl MetadataValue {
    /// Whether the value carries no data. Empty values are dropped by
    /// caches that cleanse keys.
    pub fn is_empty(&self) -> bool {
        match self {
            MetadataValue::Text(s) => s.is_empty(),
            MetadataValue::Eclasses(map) => map.is_empty(),
        }
    }

    /// The text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            MetadataValue::Eclasses(_) => None,
        }
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<EclassMap> for MetadataValue {
    fn from(map: EclassMap) -> Self {
        MetadataValue::Eclasses(map)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetadataValue::Text(s) => f.write_str(s),
            MetadataValue::Eclasses(map) => f.write_str(&deconstruct_eclasses(map)),
        }
    }
}

/// Metadata for one package version, as stored in a metadata cache.
///
/// Keys missing from the record are absent, not empty. Which keys are
/// allowed is decided by the [`Schema`](crate::Schema) of the cache the
/// record is stored in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    values: BTreeMap<String, MetadataValue>,
}

impl MetadataRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a md5-dict cache file's contents.
    ///
    /// Lines are `KEY=VALUE` pairs in arbitrary order. Blank lines and
    /// lines without `=` are skipped. All values, `_eclasses_` included,
    /// are kept as text.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_cache::MetadataRecord;
    ///
    /// let input = "\
    /// EAPI=8
    /// DESCRIPTION=Example package
    /// SLOT=0/1.2
    /// ";
    /// let record = MetadataRecord::parse(input).unwrap();
    /// assert_eq!(record.get_text("DESCRIPTION"), Some("Example package"));
    /// assert_eq!(record.slot().unwrap().subslot.as_deref(), Some("1.2"));
    /// ```
    pub fn parse(input: &str) -> Result<MetadataRecord> {
        let mut record = MetadataRecord::new();
        for line in input.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    return Err(Error::InvalidCacheEntry(format!("empty key in {line:?}")));
                }
                record.insert(key, value);
            }
        }
        Ok(record)
    }

    /// Serialize back to md5-dict format: sorted `KEY=VALUE` lines with a
    /// trailing newline. Decoded eclasses are flattened to their text form.
    pub fn serialize(&self) -> String {
        let mut lines: Vec<String> = self
            .values
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        lines.push(String::new()); // trailing newline
        lines.join("\n")
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Option<MetadataValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.values.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MetadataValue> {
        self.values.get_mut(key)
    }

    /// Look up a text value.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(MetadataValue::as_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every key whose value is empty.
    pub fn retain_non_empty(&mut self) {
        self.values.retain(|_, value| !value.is_empty());
    }

    /// The decoded eclass map, if present in decoded form.
    pub fn eclasses(&self) -> Option<&EclassMap> {
        match self.values.get(ECLASSES_KEY) {
            Some(MetadataValue::Eclasses(map)) => Some(map),
            _ => None,
        }
    }

    /// Parse `SLOT` into a `Slot`, honoring the `slot/subslot` form.
    ///
    /// Returns `None` when the key is missing, empty, or not text.
    pub fn slot(&self) -> Option<Slot> {
        let s = self.get_text("SLOT")?.trim();
        if s.is_empty() {
            return None;
        }
        if let Some((slot, subslot)) = s.split_once('/') {
            Some(Slot::with_subslot(slot, subslot))
        } else {
            Some(Slot::new(s))
        }
    }
}

impl FromIterator<(String, MetadataValue)> for MetadataRecord {
    fn from_iter<T: IntoIterator<Item = (String, MetadataValue)>>(iter: T) -> Self {
        MetadataRecord {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eclass::EclassEntry;

    const EXAMPLE_CACHE: &str = "\
DEFINED_PHASES=install test unpack
DEPEND=>=sys-devel/clang-10.0.0_rc1:* dev-python/setuptools
DESCRIPTION=Python bindings for sys-devel/clang
EAPI=7
HOMEPAGE=https://llvm.org/
IUSE=test python_targets_python3_6 python_targets_python3_7
KEYWORDS=~amd64 ~x86
LICENSE=Apache-2.0-with-LLVM-exceptions UoI-NCSA
RDEPEND=>=sys-devel/clang-10.0.0_rc1:*
SLOT=0
_eclasses_=llvm.org\t/var/db/repos/gentoo/eclass\t1580000000
_md5_=4539d849d3cea8ac84debad9b3154143
";

    #[test]
    fn parse_example() {
        let record = MetadataRecord::parse(EXAMPLE_CACHE).unwrap();
        assert_eq!(record.len(), 12);
        assert_eq!(record.get_text("EAPI"), Some("7"));
        assert_eq!(
            record.get_text("DEPEND"),
            Some(">=sys-devel/clang-10.0.0_rc1:* dev-python/setuptools")
        );
        assert_eq!(
            record.get_text(ECLASSES_KEY),
            Some("llvm.org\t/var/db/repos/gentoo/eclass\t1580000000")
        );
        // Stored text is not decoded at this layer.
        assert!(record.eclasses().is_none());
    }

    #[test]
    fn serialize_round_trip() {
        let record = MetadataRecord::parse(EXAMPLE_CACHE).unwrap();
        assert_eq!(record.serialize(), EXAMPLE_CACHE);
        assert_eq!(MetadataRecord::parse(&record.serialize()).unwrap(), record);
    }

    #[test]
    fn value_containing_equals() {
        let record = MetadataRecord::parse("SRC_URI=https://x.org/?a=b\n").unwrap();
        assert_eq!(record.get_text("SRC_URI"), Some("https://x.org/?a=b"));
    }

    #[test]
    fn empty_key_rejected() {
        let err = MetadataRecord::parse("=oops\n").unwrap_err();
        assert!(matches!(err, Error::InvalidCacheEntry(_)));
    }

    #[test]
    fn empty_lines_ignored() {
        let record = MetadataRecord::parse("\nDESCRIPTION=Test\n\nSLOT=0\n\n").unwrap();
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn slot_parsing() {
        let mut record = MetadataRecord::new();
        assert!(record.slot().is_none());
        record.insert("SLOT", "0");
        assert_eq!(record.slot().unwrap().slot, "0");
        record.insert("SLOT", "0/2.1");
        let slot = record.slot().unwrap();
        assert_eq!(slot.slot, "0");
        assert_eq!(slot.subslot, Some("2.1".to_string()));
        record.insert("SLOT", "");
        assert!(record.slot().is_none());
    }

    #[test]
    fn retain_non_empty() {
        let mut record = MetadataRecord::new();
        record.insert("SLOT", "0");
        record.insert("DEPEND", "");
        record.insert(ECLASSES_KEY, EclassMap::new());
        record.retain_non_empty();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["SLOT"]);
    }

    #[test]
    fn serialize_flattens_eclasses() {
        let mut eclasses = EclassMap::new();
        eclasses.insert("eutils".to_string(), EclassEntry::new("/e", 10));
        let mut record = MetadataRecord::new();
        record.insert(ECLASSES_KEY, eclasses);
        assert_eq!(record.serialize(), "_eclasses_=eutils\t/e\t10\n");
    }
}
