//! Local persisted copy of a resolved registry.
//!
//! The store is a TOML file with one `[cache]` table holding the loader
//! cache modification time and the store format version, plus one table
//! per library:
//!
//! ```toml
//! [cache]
//! timestamp = 1700000000
//! version = 3
//!
//! [libnotify]
//! path = "/usr/lib/x86_64-linux-gnu"
//! majorver = 4
//! minorver = 0
//! releasever = 0
//! ```
//!
//! A store is only trusted when its timestamp equals the loader cache's
//! current one and its format version is recent enough. It is written as
//! a whole, never patched.

use crate::registry::Registry;
use crate::version::Version;
use crate::Error;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as IoWrite};

/// Format version written by this build
pub const STORE_FORMAT_VERSION: i64 = 3;

/// Oldest format version this build still reads
pub const MIN_STORE_FORMAT_VERSION: i64 = 3;

const UNKNOWN: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMeta {
    /// Modification time of the loader cache, seconds since the epoch
    pub timestamp: i64,
    /// Store format version
    pub version: i64,
}

/// One library's persisted fields; `-1` marks an unknown component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLibrary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub majorver: Option<i64>,
    #[serde(default)]
    pub minorver: Option<i64>,
    #[serde(default)]
    pub releasever: Option<i64>,
}

impl StoredLibrary {
    fn version(&self) -> Version {
        let component = |value: Option<i64>| value.and_then(|v| u32::try_from(v).ok());
        Version::from_parts(
            component(self.majorver),
            component(self.minorver),
            component(self.releasever),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedStore {
    pub cache: GlobalMeta,
    #[serde(flatten)]
    pub libraries: BTreeMap<String, StoredLibrary>,
}

/// Why a store could not be used
#[derive(Debug, thiserror::Error)]
pub enum StaleReason {
    #[error("no store location configured")]
    NoLocation,

    #[error("store file does not exist")]
    Missing,

    #[error("store file is unreadable: {0}")]
    Unreadable(#[from] Error),

    #[error("store timestamp {stored} does not match loader cache timestamp {current}")]
    TimestampMismatch { stored: i64, current: i64 },

    #[error("store format version {0} is older than {min}", min = MIN_STORE_FORMAT_VERSION)]
    OutdatedFormat(i64),
}

/// Outcome of loading the store at open time
#[derive(Debug)]
pub enum StoreStatus {
    Fresh(PersistedStore),
    Stale(StaleReason),
}

impl PersistedStore {
    /// Snapshot every registry entry together with the global header.
    pub fn from_registry(registry: &Registry, timestamp: i64) -> Self {
        let libraries = registry
            .iter()
            .map(|entry| {
                let [major, minor, release] = entry
                    .version()
                    .components()
                    .map(|c| c.map_or(UNKNOWN, i64::from));
                let stored = StoredLibrary {
                    path: entry.directory().map(Utf8Path::to_path_buf),
                    majorver: Some(major),
                    minorver: Some(minor),
                    releasever: Some(release),
                };
                (entry.id().to_string(), stored)
            })
            .collect();

        Self {
            cache: GlobalMeta {
                timestamp,
                version: STORE_FORMAT_VERSION,
            },
            libraries,
        }
    }

    /// Load the store and check it against the loader cache timestamp.
    pub fn load(path: &Utf8Path, source_timestamp: i64) -> StoreStatus {
        let store = match Self::read(path) {
            Ok(Some(store)) => store,
            Ok(None) => return StoreStatus::Stale(StaleReason::Missing),
            Err(e) => return StoreStatus::Stale(StaleReason::Unreadable(e)),
        };

        if store.cache.timestamp != source_timestamp {
            return StoreStatus::Stale(StaleReason::TimestampMismatch {
                stored: store.cache.timestamp,
                current: source_timestamp,
            });
        }

        if store.cache.version < MIN_STORE_FORMAT_VERSION {
            return StoreStatus::Stale(StaleReason::OutdatedFormat(store.cache.version));
        }

        StoreStatus::Fresh(store)
    }

    fn read(path: &Utf8Path) -> Result<Option<Self>, Error> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(toml::from_str(&content)?))
    }

    /// Fill the registry's entries from the store. Libraries without a
    /// table, or tables missing a key, leave the matching field unknown.
    pub fn apply_to(&self, registry: &mut Registry) {
        let ids: Vec<String> = registry.iter().map(|e| e.id().to_string()).collect();
        for id in ids {
            let Some(stored) = self.libraries.get(&id) else {
                continue;
            };
            if let Some(entry) = registry.get_mut(&id) {
                entry.restore(stored.path.clone(), stored.version());
            }
        }
    }

    /// Replace the store file with this snapshot.
    pub fn write_to_file(&self, path: &Utf8Path) -> Result<(), Error> {
        let content = toml::to_string_pretty(self)?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // Same directory as the target so the rename stays on one filesystem
        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_layout() {
        let store: PersistedStore = toml::from_str(
            r#"
            [cache]
            timestamp = 1700000000
            version = 3

            [libnotify]
            path = "/usr/lib"
            majorver = 4
            minorver = 0
            releasever = -1

            [libindicate]
            majorver = 7
            "#,
        )
        .unwrap();

        assert_eq!(store.cache.timestamp, 1_700_000_000);
        let notify = &store.libraries["libnotify"];
        assert_eq!(notify.version(), Version::new(4).with_minor(0));
        assert_eq!(notify.path.as_deref(), Some(Utf8Path::new("/usr/lib")));

        let indicate = &store.libraries["libindicate"];
        assert_eq!(indicate.path, None);
        assert_eq!(indicate.version(), Version::new(7));
    }

    #[test]
    fn apply_leaves_missing_libraries_unknown() {
        let store: PersistedStore = toml::from_str(
            "[cache]\ntimestamp = 1\nversion = 3\n\n[libfoo]\npath = \"/lib\"\nmajorver = 2\n",
        )
        .unwrap();

        let mut registry = Registry::seeded(&["libfoo", "libbar"]);
        store.apply_to(&mut registry);

        assert_eq!(
            registry.get("libfoo").unwrap().path().unwrap().as_str(),
            "/lib/libfoo.so.2"
        );
        assert_eq!(registry.get("libbar").unwrap().directory(), None);
        assert!(registry.get("libbar").unwrap().version().is_unknown());
    }

    #[test]
    fn hole_in_stored_version_is_truncated() {
        let stored = StoredLibrary {
            path: None,
            majorver: Some(1),
            minorver: Some(-1),
            releasever: Some(5),
        };
        assert_eq!(stored.version(), Version::new(1));
    }

    #[test]
    fn snapshot_marks_unknown_components() {
        let registry = Registry::seeded(&["libghost"]);
        let store = PersistedStore::from_registry(&registry, 42);
        let ghost = &store.libraries["libghost"];
        assert_eq!(ghost.path, None);
        assert_eq!(ghost.majorver, Some(-1));
        assert_eq!(store.cache.version, STORE_FORMAT_VERSION);
    }
}
