use std::collections::BTreeMap;

use crate::cpv::Cpv;
use crate::error::{Error, Result};

const SEPARATOR: char = '\t';

/// Provenance of one inherited eclass: where it was loaded from and when it
/// was last modified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EclassEntry {
    /// Source path of the eclass file. Empty for entries read from the
    /// legacy two-field format.
    pub path: String,
    /// Modification time of the eclass file.
    pub mtime: i64,
}

impl EclassEntry {
    /// Create an entry from a path and modification time.
    pub fn new(path: impl Into<String>, mtime: i64) -> Self {
        EclassEntry {
            path: path.into(),
            mtime,
        }
    }
}

/// Inherited eclasses keyed by eclass name.
pub type EclassMap = BTreeMap<String, EclassEntry>;

/// Encode an eclass map into its flat tab-separated form.
///
/// Every entry contributes three tokens, `name`, `path` and `mtime`, all
/// joined by a single tab. An empty map encodes to the empty string.
///
/// # Examples
///
/// ```
/// use portage_cache::{deconstruct_eclasses, EclassEntry, EclassMap};
///
/// let mut eclasses = EclassMap::new();
/// eclasses.insert("eutils".to_string(), EclassEntry::new("/repo/eclass", 5678));
/// assert_eq!(deconstruct_eclasses(&eclasses), "eutils\t/repo/eclass\t5678");
/// ```
pub fn deconstruct_eclasses(eclasses: &EclassMap) -> String {
    let mut out = String::new();
    for (name, entry) in eclasses {
        if !out.is_empty() {
            out.push(SEPARATOR);
        }
        out.push_str(name);
        out.push(SEPARATOR);
        out.push_str(&entry.path);
        out.push(SEPARATOR);
        out.push_str(&entry.mtime.to_string());
    }
    out
}

/// Decode the flat tab-separated form back into an eclass map.
///
/// Accepts both the `name path mtime` layout and the legacy `name mtime`
/// layout. A token count divisible by three always selects the former.
/// Otherwise an even count selects the legacy layout only when the second
/// token is all digits; any other shape is reported as corruption.
///
/// Whitespace-only input decodes to an empty map. When a name repeats,
/// the last occurrence wins.
///
/// # Examples
///
/// ```
/// use portage_cache::{reconstruct_eclasses, Cpv};
///
/// let cpv = Cpv::parse("dev-libs/foo-1.0").unwrap();
/// let eclasses = reconstruct_eclasses(&cpv, "libtool\t1234\teutils\t5678").unwrap();
/// assert_eq!(eclasses["libtool"].path, "");
/// assert_eq!(eclasses["eutils"].mtime, 5678);
/// ```
pub fn reconstruct_eclasses(cpv: &Cpv, raw: &str) -> Result<EclassMap> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(EclassMap::new());
    }

    let tokens: Vec<&str> = trimmed.split(SEPARATOR).collect();
    let count = tokens.len();

    let with_paths = if count % 3 == 0 {
        true
    } else if count % 2 == 0 {
        !is_digits(tokens[1])
    } else {
        return Err(Error::corruption(
            cpv,
            format!("invalid token length {count} (must be mod 3 or mod 2)"),
        ));
    };

    let mut eclasses = EclassMap::new();
    if with_paths {
        for chunk in tokens.chunks(3) {
            let [name, path, mtime] = chunk else {
                return Err(Error::corruption(
                    cpv,
                    format!("malformed modification time in {raw:?}: missing value"),
                ));
            };
            eclasses.insert(name.to_string(), EclassEntry::new(*path, parse_mtime(cpv, raw, mtime)?));
        }
    } else {
        for chunk in tokens.chunks_exact(2) {
            let (name, mtime) = (chunk[0], chunk[1]);
            eclasses.insert(name.to_string(), EclassEntry::new("", parse_mtime(cpv, raw, mtime)?));
        }
    }
    Ok(eclasses)
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn parse_mtime(cpv: &Cpv, raw: &str, token: &str) -> Result<i64> {
    token.parse::<i64>().map_err(|e| Error::CacheCorruption {
        cpv: cpv.to_string(),
        message: format!("malformed modification time {token:?} in {raw:?}"),
        source: Some(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpv() -> Cpv {
        Cpv::parse("dev-libs/foo-1.0").unwrap()
    }

    fn map(entries: &[(&str, &str, i64)]) -> EclassMap {
        entries
            .iter()
            .map(|(name, path, mtime)| (name.to_string(), EclassEntry::new(*path, *mtime)))
            .collect()
    }

    #[test]
    fn encode_empty() {
        assert_eq!(deconstruct_eclasses(&EclassMap::new()), "");
    }

    #[test]
    fn encode_sorted_triples() {
        let eclasses = map(&[
            ("toolchain-funcs", "/var/db/repos/gentoo/eclass", 1700000000),
            ("eutils", "/var/db/repos/gentoo/eclass", 1600000000),
        ]);
        assert_eq!(
            deconstruct_eclasses(&eclasses),
            "eutils\t/var/db/repos/gentoo/eclass\t1600000000\t\
             toolchain-funcs\t/var/db/repos/gentoo/eclass\t1700000000"
        );
    }

    #[test]
    fn decode_encoded() {
        let eclasses = map(&[
            ("eutils", "/repo/eclass", 1),
            ("multilib", "/repo/eclass", 22),
            ("flag-o-matic", "/overlay/eclass", 333),
        ]);
        let decoded = reconstruct_eclasses(&cpv(), &deconstruct_eclasses(&eclasses)).unwrap();
        assert_eq!(decoded, eclasses);
    }

    #[test]
    fn decode_empty_and_whitespace() {
        assert!(reconstruct_eclasses(&cpv(), "").unwrap().is_empty());
        assert!(reconstruct_eclasses(&cpv(), " \n\t ").unwrap().is_empty());
    }

    #[test]
    fn decode_legacy_pairs() {
        let decoded = reconstruct_eclasses(&cpv(), "libtool\t1234\teutils\t5678").unwrap();
        assert_eq!(decoded, map(&[("libtool", "", 1234), ("eutils", "", 5678)]));
    }

    #[test]
    fn decode_six_tokens_prefers_paths() {
        // Divisible by 3 wins even when the second token is numeric.
        let decoded = reconstruct_eclasses(&cpv(), "a\t1\t2\tb\t3\t4").unwrap();
        assert_eq!(decoded, map(&[("a", "1", 2), ("b", "3", 4)]));
    }

    #[test]
    fn decode_pair_count_with_path_second_token() {
        // Four tokens, second not numeric: read as triples, which can't fit.
        let err = reconstruct_eclasses(&cpv(), "a\t/path\t1\tb").unwrap_err();
        assert!(matches!(err, Error::CacheCorruption { .. }));
    }

    #[test]
    fn decode_two_tokens_non_numeric() {
        let err = reconstruct_eclasses(&cpv(), "a\tb").unwrap_err();
        match err {
            Error::CacheCorruption { cpv, message, .. } => {
                assert_eq!(cpv, "dev-libs/foo-1.0");
                assert!(message.contains("malformed modification time"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_invalid_length() {
        let err = reconstruct_eclasses(&cpv(), "a\tb\tc\td\te").unwrap_err();
        assert!(
            matches!(err, Error::CacheCorruption { ref message, .. } if message.contains("invalid token length 5"))
        );
    }

    #[test]
    fn decode_bad_mtime_keeps_source() {
        let err = reconstruct_eclasses(&cpv(), "eutils\t/repo/eclass\tyesterday").unwrap_err();
        match err {
            Error::CacheCorruption {
                message, source, ..
            } => {
                assert!(message.contains("yesterday"));
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_last_duplicate_wins() {
        let decoded = reconstruct_eclasses(&cpv(), "eutils\t/a\t1\teutils\t/b\t2").unwrap();
        assert_eq!(decoded, map(&[("eutils", "/b", 2)]));
    }
}
