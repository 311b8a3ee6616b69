use std::num::ParseIntError;
use std::path::PathBuf;

/// Error type for metadata cache and slot tracking operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Mutation attempted on a cache or backend marked read-only.
    #[error("cache is read-only")]
    ReadOnly,

    /// Stored data for a package could not be decoded and must be regenerated.
    #[error("cache corruption for {cpv}: {message}")]
    CacheCorruption {
        /// The package coordinate whose entry is corrupt.
        cpv: String,
        /// Diagnostic text, including the offending raw value.
        message: String,
        /// Underlying integer parse failure, if any.
        #[source]
        source: Option<ParseIntError>,
    },

    /// A backend primitive required by the cache was not provided.
    #[error("{0} is not implemented by this backend")]
    NotImplemented(&'static str),

    /// An argument outside the accepted domain was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A lookup or removal targeted something that is not present.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid package coordinate (`category/package-version`).
    #[error("invalid CPV: {0}")]
    InvalidCpv(String),

    /// Error parsing a md5-dict cache entry.
    #[error("invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration at {path}: {reason}")]
    InvalidConfig {
        /// Source of the configuration (a file path or `<inline>`).
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// I/O failure while reading configuration or backend storage.
    #[error("I/O error {context}: {source}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn corruption(cpv: impl ToString, message: impl Into<String>) -> Self {
        Error::CacheCorruption {
            cpv: cpv.to_string(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for portage-cache operations.
pub type Result<T> = std::result::Result<T, Error>;
