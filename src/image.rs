//! Minimal writer for the `glibc-ld.so.cache1.1` layout.
//!
//! Produces a header, one entry per library and the trailing string pool,
//! without an extension section. The result is what the resolver's string
//! pool scan expects, which makes it handy for fixtures and debugging.

use crate::Error;
use camino::Utf8Path;
use std::collections::HashMap;
use std::fs;
use std::io::Write as IoWrite;

pub(crate) const CACHE_MAGIC: [u8; 20] = *b"glibc-ld.so.cache1.1";

const HEADER_SIZE: usize = 48;
const ENTRY_SIZE: usize = 24;

// Flag constants from glibc sysdeps/generic/ldconfig.h
const FLAG_ELF_LIBC6: u32 = 0x0003;
const FLAG_X8664_LIB64: u32 = 0x0300;
const FLAG_AARCH64_LIB64: u32 = 0x0a00;

fn host_flags() -> u32 {
    if cfg!(target_arch = "x86_64") {
        FLAG_X8664_LIB64 | FLAG_ELF_LIBC6
    } else if cfg!(target_arch = "aarch64") {
        FLAG_AARCH64_LIB64 | FLAG_ELF_LIBC6
    } else {
        FLAG_ELF_LIBC6
    }
}

/// Loader cache bytes ready to be written
#[derive(Debug, Clone)]
pub struct LoaderCacheImage {
    data: Vec<u8>,
}

impl LoaderCacheImage {
    /// Build an image listing the given absolute library paths.
    ///
    /// Each path is keyed by its file name. Entries are sorted by file name
    /// in reverse order, the way glibc's ldconfig lays them out.
    pub fn from_paths<P: AsRef<Utf8Path>>(paths: &[P]) -> Self {
        let mut sorted: Vec<&Utf8Path> = paths.iter().map(|p| p.as_ref()).collect();
        sorted.sort_by(|a, b| file_name(b).cmp(file_name(a)));

        let mut string_table = Vec::new();
        let mut string_offsets = HashMap::new();
        for path in &sorted {
            add_string(&mut string_table, &mut string_offsets, file_name(path));
            add_string(&mut string_table, &mut string_offsets, path.as_str());
        }

        let string_table_offset = (HEADER_SIZE + sorted.len() * ENTRY_SIZE) as u32;

        let mut data = Vec::with_capacity(string_table_offset as usize + string_table.len());

        // Header: magic, nlibs, len_strings
        data.extend_from_slice(&CACHE_MAGIC);
        data.extend_from_slice(&(sorted.len() as u32).to_le_bytes());
        data.extend_from_slice(&(string_table.len() as u32).to_le_bytes());

        // Header: endianness flag (2 = little, 3 = big) and padding
        data.push(if cfg!(target_endian = "little") { 2 } else { 3 });
        data.extend_from_slice(&[0u8; 3]);

        // Header: extension offset (none) and unused words
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 12]);

        let flags = host_flags();
        for path in &sorted {
            // Offsets are absolute file offsets
            let key = string_table_offset + string_offsets[file_name(path)];
            let value = string_table_offset + string_offsets[path.as_str()];

            data.extend_from_slice(&flags.to_le_bytes());
            data.extend_from_slice(&key.to_le_bytes());
            data.extend_from_slice(&value.to_le_bytes());
            data.extend_from_slice(&0u32.to_le_bytes()); // osversion
            data.extend_from_slice(&0u64.to_le_bytes()); // hwcap
        }

        data.extend_from_slice(&string_table);

        Self { data }
    }

    /// Write the image to a file, creating parent directories
    pub fn write_to_file<P: AsRef<Utf8Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(&self.data)?;
        file.flush()?;
        file.sync_all()?;

        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

fn file_name(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or(path.as_str())
}

fn add_string(table: &mut Vec<u8>, offsets: &mut HashMap<String, u32>, string: &str) {
    if !offsets.contains_key(string) {
        offsets.insert(string.to_string(), table.len() as u32);
        table.extend_from_slice(string.as_bytes());
        table.push(0);
    }
}
