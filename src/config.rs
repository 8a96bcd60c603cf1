//! Locations used by the resolver.

use bon::Builder;
use camino::{Utf8Path, Utf8PathBuf};

/// System loader cache consulted on the slow path
pub const DEFAULT_SOURCE_PATH: &str = "/etc/ld.so.cache";

/// Directory guessed for libraries that were never discovered
pub const DEFAULT_FALLBACK_DIR: &str = "/usr/lib";

const STORE_DIR: &str = "modem-manager-gui";
const STORE_FILE: &str = "libpaths.toml";

/// Resolver configuration
///
/// ```
/// use libpaths::LibPathsConfig;
///
/// let config = LibPathsConfig::builder()
///     .source("/etc/ld.so.cache")
///     .store("/tmp/libpaths.toml")
///     .build();
/// assert_eq!(config.store_path().unwrap().as_str(), "/tmp/libpaths.toml");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct LibPathsConfig {
    /// Binary loader cache to scan
    #[builder(into, default = Utf8PathBuf::from(DEFAULT_SOURCE_PATH))]
    source: Utf8PathBuf,

    /// Local store file; the per-user cache directory when unset
    #[builder(into)]
    store: Option<Utf8PathBuf>,

    /// Read and write the local store at all
    #[builder(default = true)]
    persist: bool,

    #[builder(into, default = Utf8PathBuf::from(DEFAULT_FALLBACK_DIR))]
    fallback_dir: Utf8PathBuf,
}

impl LibPathsConfig {
    pub fn source(&self) -> &Utf8Path {
        &self.source
    }

    pub fn fallback_dir(&self) -> &Utf8Path {
        &self.fallback_dir
    }

    /// Resolved local store location, `None` when persistence is off or no
    /// per-user cache directory exists.
    pub fn store_path(&self) -> Option<Utf8PathBuf> {
        if !self.persist {
            return None;
        }
        self.store.clone().or_else(default_store_path)
    }
}

impl Default for LibPathsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `$XDG_CACHE_HOME/modem-manager-gui/libpaths.toml`, or the `~/.cache`
/// equivalent.
pub fn default_store_path() -> Option<Utf8PathBuf> {
    let dir = dirs::cache_dir()?;
    let dir = Utf8PathBuf::try_from(dir).ok()?;
    Some(dir.join(STORE_DIR).join(STORE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_system_locations() {
        let config = LibPathsConfig::default();
        assert_eq!(config.source().as_str(), DEFAULT_SOURCE_PATH);
        assert_eq!(config.fallback_dir().as_str(), DEFAULT_FALLBACK_DIR);
    }

    #[test]
    fn disabling_persistence_hides_store() {
        let config = LibPathsConfig::builder()
            .store("/tmp/store.toml")
            .persist(false)
            .build();
        assert_eq!(config.store_path(), None);
    }

    #[test]
    fn explicit_store_overrides_default() {
        let config = LibPathsConfig::builder().store("/tmp/store.toml").build();
        assert_eq!(config.store_path().unwrap().as_str(), "/tmp/store.toml");
    }
}
