//! Choosing between optional runtime backends.
//!
//! Each optional feature (desktop notifications, messaging indicators,
//! address books) can be served by one of several shared libraries. A
//! backend enum lists the alternatives in order of preference, and
//! [`select_backend`] picks the first one whose library was found with a
//! recent enough version.

use crate::cache::LibPathsCache;
use crate::version::Version;
use camino::Utf8PathBuf;

/// Every library the optional backends may load
pub const DEFAULT_LIBRARIES: &[&str] = &[
    "libnotify",
    "libcanberra",
    "libebook-1.2",
    "libmessaging-menu",
    "libindicate",
];

/// An alternative implementation of an optional feature
pub trait OptionalBackend: Copy + 'static {
    /// Alternatives, most preferred first
    const CANDIDATES: &'static [Self];

    /// Short name of the shared library that provides this backend
    fn library(&self) -> &'static str;

    /// Lowest acceptable version; unknown means any discovered library
    fn minimum(&self) -> Version {
        Version::UNKNOWN
    }
}

/// A backend that resolved, with the path to hand to the dynamic loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<B> {
    pub backend: B,
    pub path: Utf8PathBuf,
}

/// Pick the first candidate of `B` whose library is usable.
///
/// A library with no minimum only needs a discovered directory; otherwise
/// its discovered version must satisfy the minimum.
pub fn select_backend<B: OptionalBackend>(cache: &LibPathsCache) -> Option<Resolved<B>> {
    B::CANDIDATES.iter().copied().find_map(|backend| {
        let library = backend.library();
        let entry = cache.get(library)?;
        entry.directory()?;

        let minimum = backend.minimum();
        if !minimum.is_unknown() && !entry.version().satisfies(&minimum) {
            return None;
        }

        Some(Resolved {
            backend,
            path: cache.full_path(library),
        })
    })
}

/// Desktop notification popups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    Notify,
}

impl OptionalBackend for NotificationBackend {
    const CANDIDATES: &'static [Self] = &[NotificationBackend::Notify];

    fn library(&self) -> &'static str {
        "libnotify"
    }
}

/// Event sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundBackend {
    Canberra,
}

impl OptionalBackend for SoundBackend {
    const CANDIDATES: &'static [Self] = &[SoundBackend::Canberra];

    fn library(&self) -> &'static str {
        "libcanberra"
    }
}

/// Messaging indicator in the desktop panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorBackend {
    MessagingMenu,
    Indicate,
}

impl OptionalBackend for IndicatorBackend {
    const CANDIDATES: &'static [Self] =
        &[IndicatorBackend::MessagingMenu, IndicatorBackend::Indicate];

    fn library(&self) -> &'static str {
        match self {
            IndicatorBackend::MessagingMenu => "libmessaging-menu",
            IndicatorBackend::Indicate => "libindicate",
        }
    }
}

/// Evolution address book API level, newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressBookApi {
    Ebook16,
    Ebook14,
    Ebook13,
    Ebook12,
}

impl OptionalBackend for AddressBookApi {
    const CANDIDATES: &'static [Self] = &[
        AddressBookApi::Ebook16,
        AddressBookApi::Ebook14,
        AddressBookApi::Ebook13,
        AddressBookApi::Ebook12,
    ];

    fn library(&self) -> &'static str {
        "libebook-1.2"
    }

    fn minimum(&self) -> Version {
        let major = match self {
            AddressBookApi::Ebook16 => 16,
            AddressBookApi::Ebook14 => 14,
            AddressBookApi::Ebook13 => 13,
            AddressBookApi::Ebook12 => 12,
        };
        Version::new(major).with_minor(3).with_release(0)
    }
}
