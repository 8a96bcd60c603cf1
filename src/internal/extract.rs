//! Turn a cached library path into (short name, directory, version).

use crate::version::Version;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::trace;

/// A shared library path split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedLibrary {
    /// Short name, e.g. `libnotify`
    pub name: String,
    /// Directory holding the library (or the symlink pointing to it)
    pub directory: Utf8PathBuf,
    /// `None` when the file name carries no version suffix
    pub version: Option<Version>,
}

/// Parse an absolute library path.
///
/// If the path is a symbolic link, the name and version come from the link
/// target (one level only) while the directory stays the link's own.
/// Returns `None` for paths that are not shared libraries or whose version
/// suffix cannot be read.
pub(crate) fn parse_library_path(path: &str) -> Option<ParsedLibrary> {
    let path = Utf8Path::new(path);
    let directory = path.parent()?.to_path_buf();
    let file_name = path.file_name()?;

    let target = read_link_name(path);
    let name = target.as_deref().unwrap_or(file_name);

    let (short, suffix) = split_shared_object_name(name)?;
    if short.is_empty() {
        trace!("Skipping {}: empty library name", path);
        return None;
    }

    let version = match suffix {
        Some(suffix) => match suffix.parse::<Version>() {
            Ok(version) => Some(version),
            Err(_) => {
                trace!("Skipping {}: unreadable version suffix {:?}", path, suffix);
                return None;
            }
        },
        None => None,
    };

    Some(ParsedLibrary {
        name: short.to_string(),
        directory,
        version,
    })
}

/// File name of a symlink's target, if `path` is a symlink.
fn read_link_name(path: &Utf8Path) -> Option<String> {
    let is_symlink = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_symlink {
        return None;
    }

    let target = fs::read_link(path).ok()?;
    let target = Utf8PathBuf::try_from(target).ok()?;
    target.file_name().map(str::to_string)
}

/// Split `libfoo.so.1.2.3` into (`libfoo`, `Some("1.2.3")`).
///
/// The first `.so` that is followed by either the end of the name or a dot
/// marks the extension; anything else (`libsoap.so`, `.sock`) is not one.
fn split_shared_object_name(name: &str) -> Option<(&str, Option<&str>)> {
    name.match_indices(".so").find_map(|(index, _)| {
        let rest = &name[index + 3..];
        if rest.is_empty() {
            Some((&name[..index], None))
        } else {
            rest.strip_prefix('.')
                .map(|suffix| (&name[..index], Some(suffix)))
        }
    })
}
