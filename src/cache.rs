//! The resolver handle.
//!
//! [`LibPathsCache`] is opened once with the list of libraries the caller
//! may want to load, answers path and version queries, and is closed at
//! shutdown. Opening takes the fast path when the local store matches the
//! loader cache's modification time; otherwise the loader cache is mapped,
//! scanned once and unmapped, and the store is rewritten on close.

use crate::config::LibPathsConfig;
use crate::internal::extract::parse_library_path;
use crate::internal::string_pool::StringPool;
use crate::registry::{LibraryEntry, Registry};
use crate::store::{PersistedStore, StaleReason, StoreStatus};
use crate::version::Version;
use crate::Error;
use camino::{Utf8Path, Utf8PathBuf};
use memmap2::Mmap;
use std::fmt;
use std::fs::{self, File};
use std::os::unix::fs::MetadataExt;
use tracing::{debug, info, trace, warn};

/// Resolved library locations for one session
///
/// Not meant to be shared between threads; open it once and query it from
/// the thread that owns it.
#[derive(Debug)]
pub struct LibPathsCache {
    registry: Registry,
    config: LibPathsConfig,
    source_timestamp: i64,
    stale: bool,
}

impl LibPathsCache {
    /// Open with the default configuration.
    pub fn open<S: AsRef<str>>(names: &[S]) -> Result<Self, Error> {
        Self::open_with(LibPathsConfig::default(), names)
    }

    /// Open with an explicit configuration.
    ///
    /// Fails only when the loader cache cannot be used at all. Problems with
    /// the local store just route the session through a fresh scan.
    pub fn open_with<S: AsRef<str>>(config: LibPathsConfig, names: &[S]) -> Result<Self, Error> {
        let source = config.source().to_path_buf();
        let metadata =
            fs::metadata(&source).map_err(|e| Error::SourceMissing(source.clone(), e))?;
        let source_timestamp = metadata.mtime();

        let mut registry = Registry::seeded(names);

        let status = match config.store_path() {
            Some(path) => PersistedStore::load(&path, source_timestamp),
            None => StoreStatus::Stale(StaleReason::NoLocation),
        };

        let stale = match status {
            StoreStatus::Fresh(store) => {
                debug!("Using local store for {} libraries", registry.len());
                store.apply_to(&mut registry);
                false
            }
            StoreStatus::Stale(reason) => {
                debug!("Local store not usable: {}", reason);
                let found = scan_source(&source, &mut registry)?;
                info!("Scanned {}: {} matching paths", source, found);
                true
            }
        };

        Ok(Self {
            registry,
            config,
            source_timestamp,
            stale,
        })
    }

    /// Loader-ready path for `name`.
    ///
    /// Falls back to `{fallback_dir}/{name}.so` when the library was never
    /// requested or never found, so the result is always usable as a guess.
    pub fn full_path(&self, name: &str) -> Utf8PathBuf {
        self.registry
            .get(name)
            .and_then(LibraryEntry::path)
            .unwrap_or_else(|| self.config.fallback_dir().join(format!("{}.so", name)))
    }

    /// Whether the discovered version of `name` is at least `required`.
    pub fn meets_minimum(&self, name: &str, required: &Version) -> bool {
        self.registry
            .get(name)
            .is_some_and(|entry| entry.version().satisfies(required))
    }

    pub fn get(&self, name: &str) -> Option<&LibraryEntry> {
        self.registry.get(name)
    }

    /// Requested libraries ordered by name
    pub fn entries(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.registry.iter()
    }

    /// `true` when this session scanned the loader cache instead of
    /// trusting the local store
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Modification time of the loader cache, seconds since the epoch
    pub fn source_timestamp(&self) -> i64 {
        self.source_timestamp
    }

    /// Close the handle, rewriting the local store if this session scanned.
    ///
    /// Dropping the handle has the same effect.
    pub fn close(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !std::mem::take(&mut self.stale) {
            return;
        }
        let Some(path) = self.config.store_path() else {
            return;
        };

        let dirty = self.registry.iter().filter(|e| e.is_dirty()).count();
        let store = PersistedStore::from_registry(&self.registry, self.source_timestamp);
        match store.write_to_file(&path) {
            Ok(()) => debug!(
                "Saved {} libraries ({} resolved) to {}",
                store.libraries.len(),
                dirty,
                path
            ),
            Err(e) => warn!("Failed to save local store {}: {}", path, e),
        }
    }
}

impl Drop for LibPathsCache {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Map the loader cache and record every matching path.
///
/// The mapping only lives for the duration of the scan.
fn scan_source(source: &Utf8Path, registry: &mut Registry) -> Result<usize, Error> {
    let file = File::open(source).map_err(|e| Error::SourceMissing(source.to_path_buf(), e))?;
    let len = file
        .metadata()
        .map_err(|e| Error::SourceMissing(source.to_path_buf(), e))?
        .len();
    if len == 0 {
        return Err(Error::SourceEmpty(source.to_path_buf()));
    }

    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::SourceMap(source.to_path_buf(), e))?;

    let Some(pool) = StringPool::new(&mmap) else {
        warn!("{} does not end with a string pool, using fallback paths", source);
        return Ok(0);
    };

    let mut found = 0;
    for path in pool {
        match parse_library_path(path) {
            Some(library) => {
                if registry.record(library) {
                    found += 1;
                }
            }
            None => trace!("Ignoring {}", path),
        }
    }

    Ok(found)
}

impl fmt::Display for LibPathsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} libraries, loader cache timestamp {} ({})",
            self.registry.len(),
            self.source_timestamp,
            if self.stale { "scanned" } else { "from local store" }
        )?;
        for entry in self.registry.iter() {
            writeln!(
                f,
                "\t{} ({}) => {}",
                entry.id(),
                entry.version(),
                self.full_path(entry.id())
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::LoaderCacheImage;
    use tempfile::TempDir;

    fn setup(paths: &[&str]) -> (TempDir, LibPathsConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let source = root.join("ld.so.cache");
        LoaderCacheImage::from_paths(paths)
            .write_to_file(&source)
            .unwrap();
        let config = LibPathsConfig::builder()
            .source(source)
            .store(root.join("store/libpaths.toml"))
            .build();
        (dir, config)
    }

    #[test]
    fn resolves_requested_libraries_only() {
        let (_dir, config) = setup(&[
            "/usr/lib/x86_64-linux-gnu/libnotify.so.4.0.0",
            "/usr/lib/libindicate.so.7.1.4",
            "/usr/lib/libunrelated.so.1",
        ]);
        let cache = LibPathsCache::open_with(config, &["libnotify", "libindicate", "libghost"]).unwrap();

        assert!(cache.is_stale());
        assert_eq!(cache.entries().count(), 3);
        assert_eq!(
            cache.full_path("libnotify").as_str(),
            "/usr/lib/x86_64-linux-gnu/libnotify.so.4.0.0"
        );
        assert_eq!(cache.full_path("libindicate").as_str(), "/usr/lib/libindicate.so.7.1.4");
        assert_eq!(cache.full_path("libghost").as_str(), "/usr/lib/libghost.so");
        assert_eq!(cache.full_path("libunrelated").as_str(), "/usr/lib/libunrelated.so");
        assert!(cache.get("libunrelated").is_none());
    }

    #[test]
    fn version_queries_use_discovered_versions() {
        let (_dir, config) = setup(&["/usr/lib/libebook-1.2.so.16.1.0"]);
        let cache = LibPathsCache::open_with(config, &["libebook-1.2", "libghost"]).unwrap();

        let v = |s: &str| s.parse::<Version>().unwrap();
        assert!(cache.meets_minimum("libebook-1.2", &v("14.3.0")));
        assert!(!cache.meets_minimum("libebook-1.2", &v("16.3.0")));
        assert!(!cache.meets_minimum("libghost", &v("1")));
        assert!(!cache.meets_minimum("libnever-requested", &Version::UNKNOWN));
    }

    #[test]
    fn missing_source_fails_to_open() {
        let config = LibPathsConfig::builder()
            .source("/nonexistent/ld.so.cache")
            .persist(false)
            .build();
        let err = LibPathsCache::open_with(config, &["libfoo"]).unwrap_err();
        assert!(err.is_source_unavailable());
    }

    #[test]
    fn empty_source_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let source = Utf8PathBuf::try_from(dir.path().join("ld.so.cache")).unwrap();
        fs::write(&source, b"").unwrap();
        let config = LibPathsConfig::builder().source(source).persist(false).build();

        let err = LibPathsCache::open_with(config, &["libfoo"]).unwrap_err();
        assert!(matches!(err, Error::SourceEmpty(_)));
    }

    #[test]
    fn unterminated_source_degrades_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let source = Utf8PathBuf::try_from(dir.path().join("ld.so.cache")).unwrap();
        fs::write(&source, b"\0\0/usr/lib/libfoo.so.1").unwrap();
        let config = LibPathsConfig::builder().source(source).persist(false).build();

        let cache = LibPathsCache::open_with(config, &["libfoo"]).unwrap();
        assert_eq!(cache.full_path("libfoo").as_str(), "/usr/lib/libfoo.so");
    }

    #[test]
    fn display_lists_every_entry() {
        let (_dir, config) = setup(&["/lib/libfoo.so.2.1.3"]);
        let cache = LibPathsCache::open_with(config, &["libfoo", "libbar"]).unwrap();
        let text = cache.to_string();
        assert!(text.contains("libfoo (2.1.3) => /lib/libfoo.so.2.1.3"));
        assert!(text.contains("libbar (unknown) => /usr/lib/libbar.so"));
    }
}
