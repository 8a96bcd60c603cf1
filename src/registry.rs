//! In-memory registry of the libraries a caller asked about.

use crate::internal::extract::ParsedLibrary;
use crate::version::Version;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use tracing::trace;

/// What is known about one requested library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    id: String,
    directory: Option<Utf8PathBuf>,
    version: Version,
    dirty: bool,
}

impl LibraryEntry {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            directory: None,
            version: Version::UNKNOWN,
            dirty: false,
        }
    }

    pub(crate) fn restore(&mut self, directory: Option<Utf8PathBuf>, version: Version) {
        self.directory = directory;
        self.version = version;
    }

    /// Library short name, e.g. `libnotify`
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn directory(&self) -> Option<&Utf8Path> {
        self.directory.as_deref()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Whether a scan changed this entry during the current session
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// File name built from the id and every known version component
    pub fn file_name(&self) -> String {
        let mut name = format!("{}.so", self.id);
        for component in self.version.components().into_iter().map_while(|c| c) {
            name.push('.');
            name.push_str(&component.to_string());
        }
        name
    }

    /// Loader-ready path, if the directory has been discovered
    pub fn path(&self) -> Option<Utf8PathBuf> {
        self.directory.as_ref().map(|dir| dir.join(self.file_name()))
    }
}

/// Map from library short name to its entry, seeded with the requested names
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, LibraryEntry>,
}

impl Registry {
    /// Create a registry holding one empty entry per name
    pub fn seeded<S: AsRef<str>>(names: &[S]) -> Self {
        let entries = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                (name.to_string(), LibraryEntry::new(name))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&LibraryEntry> {
        self.entries.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut LibraryEntry> {
        self.entries.get_mut(id)
    }

    /// Entries ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a library found by the scanner.
    ///
    /// The first discovered directory is kept; the version is replaced by
    /// every match that carries one. Returns `false` when the library was
    /// not requested.
    pub(crate) fn record(&mut self, found: ParsedLibrary) -> bool {
        let Some(entry) = self.entries.get_mut(&found.name) else {
            return false;
        };

        if entry.directory.is_none() {
            trace!("{}: directory {}", entry.id, found.directory);
            entry.directory = Some(found.directory);
            entry.dirty = true;
        }

        if let Some(version) = found.version {
            trace!("{}: version {}", entry.id, version);
            entry.version = version;
            entry.dirty = true;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(name: &str, dir: &str, version: Option<Version>) -> ParsedLibrary {
        ParsedLibrary {
            name: name.to_string(),
            directory: Utf8PathBuf::from(dir),
            version,
        }
    }

    #[test]
    fn ignores_unrequested_libraries() {
        let mut registry = Registry::seeded(&["libnotify"]);
        assert!(!registry.record(found("libz", "/lib", Some(Version::new(1)))));
        assert_eq!(registry.len(), 1);
        assert!(!registry.get("libnotify").unwrap().is_dirty());
    }

    #[test]
    fn first_directory_wins_last_version_wins() {
        let mut registry = Registry::seeded(&["libfoo"]);
        registry.record(found("libfoo", "/usr/lib", Some(Version::new(1))));
        registry.record(found(
            "libfoo",
            "/opt/lib",
            Some(Version::new(2).with_minor(1)),
        ));

        let entry = registry.get("libfoo").unwrap();
        assert_eq!(entry.directory(), Some(Utf8Path::new("/usr/lib")));
        assert_eq!(entry.version(), Version::new(2).with_minor(1));
        assert!(entry.is_dirty());
    }

    #[test]
    fn unversioned_match_keeps_previous_version() {
        let mut registry = Registry::seeded(&["libfoo"]);
        registry.record(found("libfoo", "/usr/lib", Some(Version::new(3))));
        registry.record(found("libfoo", "/usr/lib", None));
        assert_eq!(registry.get("libfoo").unwrap().version(), Version::new(3));
    }

    #[test]
    fn path_uses_every_known_component() {
        let mut entry = LibraryEntry::new("libfoo");
        assert_eq!(entry.path(), None);

        entry.restore(Some("/usr/lib".into()), Version::UNKNOWN);
        assert_eq!(entry.path().unwrap().as_str(), "/usr/lib/libfoo.so");

        entry.restore(Some("/usr/lib".into()), Version::new(2));
        assert_eq!(entry.path().unwrap().as_str(), "/usr/lib/libfoo.so.2");

        entry.restore(Some("/usr/lib".into()), Version::new(2).with_minor(1));
        assert_eq!(entry.path().unwrap().as_str(), "/usr/lib/libfoo.so.2.1");

        entry.restore(
            Some("/usr/lib".into()),
            Version::new(2).with_minor(1).with_release(3),
        );
        assert_eq!(entry.path().unwrap().as_str(), "/usr/lib/libfoo.so.2.1.3");
    }
}
