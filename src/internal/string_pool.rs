//! Backward scan over the trailing string pool of a loader cache.
//!
//! The structured header and entry records of `ld.so.cache` are never
//! decoded here. Strings are NUL-terminated and packed at the end of the
//! file, so walking backward from the last byte recovers every absolute
//! path until two adjacent zero bytes (the start-of-table sentinel) or the
//! beginning of the buffer is reached.

use tracing::trace;

/// Lazy iterator over the absolute paths stored in a loader cache buffer
#[derive(Debug)]
pub(crate) struct StringPool<'a> {
    data: &'a [u8],
    /// Index of the zero byte terminating the next segment to inspect
    end: usize,
    done: bool,
}

impl<'a> StringPool<'a> {
    /// Start a scan. Returns `None` if the buffer does not end with a zero
    /// byte, which means it is not a usable string pool.
    pub(crate) fn new(data: &'a [u8]) -> Option<Self> {
        match data.last() {
            Some(0) => Some(Self {
                data,
                end: data.len() - 1,
                done: false,
            }),
            _ => None,
        }
    }

    /// Previous zero-delimited segment as `[start, end)`, or `None` once the
    /// sentinel or the start of the buffer has been passed.
    fn previous_segment(&mut self) -> Option<(usize, usize)> {
        if self.done {
            return None;
        }

        let end = self.end;
        match self.data[..end].iter().rposition(|&b| b == 0) {
            Some(zero) if zero + 1 == end => {
                self.done = true;
                None
            }
            Some(zero) => {
                self.end = zero;
                Some((zero + 1, end))
            }
            None => {
                self.done = true;
                Some((0, end))
            }
        }
    }
}

impl<'a> Iterator for StringPool<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let data: &'a [u8] = self.data;
        while let Some((start, end)) = self.previous_segment() {
            let bytes = &data[start..end];
            if bytes.first() != Some(&b'/') {
                continue;
            }
            match std::str::from_utf8(bytes) {
                Ok(path) => return Some(path),
                Err(_) => trace!("Skipping non UTF-8 string at offset {}", start),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(data: &[u8]) -> Vec<&str> {
        let mut paths: Vec<_> = StringPool::new(data).unwrap().collect();
        paths.sort();
        paths
    }

    #[test]
    fn requires_trailing_zero() {
        assert!(StringPool::new(b"/usr/lib/libfoo.so").is_none());
        assert!(StringPool::new(b"").is_none());
    }

    #[test]
    fn yields_every_absolute_string_after_sentinel() {
        let data = b"HEADER\x01\0\0libfoo.so.1\0/usr/lib/libfoo.so.1\0/lib/libbar.so\0";
        assert_eq!(collect(data), vec!["/lib/libbar.so", "/usr/lib/libfoo.so.1"]);
    }

    #[test]
    fn stops_at_double_zero() {
        let data = b"/hidden/before/sentinel\0\0/usr/lib/libz.so.1\0";
        assert_eq!(collect(data), vec!["/usr/lib/libz.so.1"]);
    }

    #[test]
    fn reaches_start_of_buffer() {
        let data = b"/first\0relative\0/second\0";
        assert_eq!(collect(data), vec!["/first", "/second"]);
    }

    #[test]
    fn keeps_duplicates() {
        let data = b"\0\0/a\0/a\0";
        assert_eq!(collect(data), vec!["/a", "/a"]);
    }

    #[test]
    fn trailing_double_zero_yields_nothing() {
        let data = b"\0\0/usr/lib/libfoo.so\0\0";
        assert!(collect(data).is_empty());
    }

    #[test]
    fn skips_invalid_utf8() {
        let data = b"\0\0/bad\xff\0/good\0";
        assert_eq!(collect(data), vec!["/good"]);
    }
}
