//! Library version triples.
//!
//! A [`Version`] holds up to three numeric components taken from a shared
//! object's file name suffix (`libnotify.so.4.0.0` -> `4.0.0`). Any
//! component may be unknown, but components are always filled from the
//! left: a known minor implies a known major, a known release implies a
//! known minor.

use crate::Error;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version triple with left-to-right known components
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Version {
    major: Option<u32>,
    minor: Option<u32>,
    release: Option<u32>,
}

impl Version {
    /// No component known
    pub const UNKNOWN: Version = Version {
        major: None,
        minor: None,
        release: None,
    };

    /// Version with only the major component known
    pub const fn new(major: u32) -> Self {
        Self {
            major: Some(major),
            minor: None,
            release: None,
        }
    }

    /// Set the minor component. Ignored while the major is unknown.
    pub fn with_minor(mut self, minor: u32) -> Self {
        if self.major.is_some() {
            self.minor = Some(minor);
        }
        self
    }

    /// Set the release component. Ignored while the minor is unknown.
    pub fn with_release(mut self, release: u32) -> Self {
        if self.minor.is_some() {
            self.release = Some(release);
        }
        self
    }

    /// Build from independent components, truncating at the first unknown one.
    pub fn from_parts(major: Option<u32>, minor: Option<u32>, release: Option<u32>) -> Self {
        let mut version = Version::UNKNOWN;
        if let Some(major) = major {
            version = Version::new(major);
            if let Some(minor) = minor {
                version = version.with_minor(minor);
                if let Some(release) = release {
                    version = version.with_release(release);
                }
            }
        }
        version
    }

    pub fn major(&self) -> Option<u32> {
        self.major
    }

    pub fn minor(&self) -> Option<u32> {
        self.minor
    }

    pub fn release(&self) -> Option<u32> {
        self.release
    }

    pub fn is_unknown(&self) -> bool {
        self.major.is_none()
    }

    /// Components ordered from most to least significant
    pub fn components(&self) -> [Option<u32>; 3] {
        [self.major, self.minor, self.release]
    }

    /// Check whether this (discovered) version is at least `required`.
    ///
    /// An unknown component in `required` means "don't care" for it and
    /// every finer component. A discovered version with an unknown major
    /// never satisfies anything. When `required` names a component this
    /// version does not know, the check fails.
    pub fn satisfies(&self, required: &Version) -> bool {
        if self.major.is_none() {
            return false;
        }

        for (found, wanted) in self.components().into_iter().zip(required.components()) {
            let Some(wanted) = wanted else {
                return true;
            };
            let Some(found) = found else {
                return false;
            };
            match found.cmp(&wanted) {
                Ordering::Greater => return true,
                Ordering::Less => return false,
                Ordering::Equal => continue,
            }
        }

        true
    }
}

/// Parse up to three dot-separated numeric tokens.
///
/// Tokens past the third are ignored and parsing stops at the first
/// non-numeric token. Fails only when not even a major can be read.
impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut numbers = s
            .split('.')
            .take(3)
            .map_while(|token| token.parse::<u32>().ok());

        let major = numbers
            .next()
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;

        Ok(Version::from_parts(Some(major), numbers.next(), numbers.next()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<String> = self
            .components()
            .iter()
            .map_while(|c| c.map(|n| n.to_string()))
            .collect();

        if known.is_empty() {
            write!(f, "unknown")
        } else {
            write!(f, "{}", known.join("."))
        }
    }
}
