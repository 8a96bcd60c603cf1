// Error types for libpaths
use camino::Utf8PathBuf;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Loader cache {0} is missing or cannot be inspected: {1}")]
    SourceMissing(Utf8PathBuf, #[source] io::Error),

    #[error("Loader cache {0} is empty")]
    SourceEmpty(Utf8PathBuf),

    #[error("Failed to map loader cache {0}: {1}")]
    SourceMap(Utf8PathBuf, #[source] io::Error),

    #[error("Store parse error: {0}")]
    StoreParse(#[from] toml::de::Error),

    #[error("Store serialization error: {0}")]
    StoreSerialize(#[from] toml::ser::Error),

    #[error("Invalid version string: {0:?}")]
    InvalidVersion(String),
}

impl Error {
    /// Whether this error means the system loader cache is unusable.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            Error::SourceMissing(..) | Error::SourceEmpty(_) | Error::SourceMap(..)
        )
    }
}
