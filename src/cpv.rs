use std::fmt;
use std::str::FromStr;

use winnow::ascii::{digit0, digit1};
use winnow::combinator::{alt, opt, repeat};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::error::{Error, Result};

/// A package coordinate: one version of one package in one category.
///
/// Coordinates key both the metadata cache and, through [`Cpv::key`], the
/// slot conflict tracker. Ordering and equality are purely textual; version
/// comparison semantics are out of scope here.
///
/// See [PMS 3.1](https://projects.gentoo.org/pms/9/pms.html#restrictions-upon-names).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cpv {
    category: String,
    package: String,
    version: String,
}

impl Cpv {
    /// Parse a `category/package-version` string.
    ///
    /// The package name ends at the first `-` that introduces a complete
    /// version, so names containing dashes and digits are handled.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_cache::Cpv;
    ///
    /// let cpv = Cpv::parse("media-fonts/font-adobe-100dpi-1.0.3-r2").unwrap();
    /// assert_eq!(cpv.category(), "media-fonts");
    /// assert_eq!(cpv.package(), "font-adobe-100dpi");
    /// assert_eq!(cpv.version(), "1.0.3-r2");
    /// assert_eq!(cpv.key(), "media-fonts/font-adobe-100dpi");
    /// ```
    pub fn parse(input: &str) -> Result<Cpv> {
        let invalid = || Error::InvalidCpv(input.to_string());

        let (category, rest) = input.split_once('/').ok_or_else(invalid)?;
        parse_category.parse(category).map_err(|_| invalid())?;

        for (idx, _) in rest.match_indices('-') {
            let (package, version) = (&rest[..idx], &rest[idx + 1..]);
            if parse_version.parse(version).is_ok() && parse_package.parse(package).is_ok() {
                return Ok(Cpv {
                    category: category.to_string(),
                    package: package.to_string(),
                    version: version.to_string(),
                });
            }
        }

        Err(invalid())
    }

    /// The category, e.g. `dev-lang`.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The package name without version, e.g. `rust`.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The full version string including any revision.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The unversioned `category/package` key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.category, self.package)
    }
}

impl fmt::Display for Cpv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}-{}", self.category, self.package, self.version)
    }
}

impl FromStr for Cpv {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Cpv::parse(s)
    }
}

// Winnow parsers

fn is_category_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-')
}

fn is_package_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '-')
}

fn parse_category<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., is_category_char)
        .verify(|name: &str| !name.starts_with(['-', '.']))
        .parse_next(input)
}

fn parse_package<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., is_package_char)
        .verify(|name: &str| !name.starts_with('-') && !name.ends_with('-'))
        .parse_next(input)
}

fn parse_suffix(input: &mut &str) -> ModalResult<()> {
    ('_', alt(("alpha", "beta", "pre", "rc", "p")), digit0)
        .void()
        .parse_next(input)
}

fn parse_version(input: &mut &str) -> ModalResult<()> {
    digit1.parse_next(input)?;
    let _: () = repeat(0.., ('.', digit1).void()).parse_next(input)?;
    opt(one_of('a'..='z')).parse_next(input)?;
    let _: () = repeat(0.., parse_suffix).parse_next(input)?;
    opt(("-r", digit1)).parse_next(input)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let cpv = Cpv::parse("dev-lang/rust-1.75.0").unwrap();
        assert_eq!(cpv.category(), "dev-lang");
        assert_eq!(cpv.package(), "rust");
        assert_eq!(cpv.version(), "1.75.0");
        assert_eq!(cpv.key(), "dev-lang/rust");
    }

    #[test]
    fn parse_revision_and_suffixes() {
        let cpv = Cpv::parse("sys-devel/gcc-13.2.1_p20240113-r1").unwrap();
        assert_eq!(cpv.package(), "gcc");
        assert_eq!(cpv.version(), "13.2.1_p20240113-r1");

        let cpv = Cpv::parse("app-misc/foo-1.0b_rc2_pre3").unwrap();
        assert_eq!(cpv.version(), "1.0b_rc2_pre3");
    }

    #[test]
    fn package_name_with_version_like_parts() {
        let cpv = Cpv::parse("dev-libs/libfoo-2-bar-3.1").unwrap();
        assert_eq!(cpv.package(), "libfoo-2-bar");
        assert_eq!(cpv.version(), "3.1");
    }

    #[test]
    fn display_round_trip() {
        for s in [
            "dev-lang/rust-1.75.0",
            "sys-devel/gcc-13.2.1_p20240113-r1",
            "media-fonts/font-adobe-100dpi-1.0.3-r2",
        ] {
            assert_eq!(Cpv::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn invalid_cpv() {
        for s in [
            "",
            "dev-lang",
            "dev-lang/rust",
            "/rust-1.0",
            "-dev/rust-1.0",
            "dev-lang/-1.0",
            "dev-lang/rust-1.0-",
            "dev-lang/rust-1.0_omega",
        ] {
            assert!(
                matches!(Cpv::parse(s), Err(Error::InvalidCpv(_))),
                "{s} should be rejected"
            );
        }
    }

    #[test]
    fn ordering_is_textual() {
        let a: Cpv = "dev-lang/python-3.11.8".parse().unwrap();
        let b: Cpv = "dev-lang/python-3.12.2".parse().unwrap();
        assert!(a < b);
    }
}
