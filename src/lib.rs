// libpaths - locate optional shared libraries through ld.so.cache
// MIT OR Apache-2.0, 2025

//! Resolve the exact, version-qualified path of optional shared libraries
//! so they can be handed to a dynamic loader at runtime.
//!
//! This library provides:
//! - A scan of the system loader cache (`/etc/ld.so.cache`) string pool
//! - Per-library directory and version triple discovery
//! - A per-user local store keyed by the loader cache's modification time
//! - Path synthesis and minimum version checks
//!
//! # Example: Resolve a library
//!
//! ```no_run
//! use libpaths::{LibPathsCache, Version};
//!
//! let cache = LibPathsCache::open(&["libnotify", "libindicate"])?;
//! let path = cache.full_path("libnotify");
//! if cache.meets_minimum("libnotify", &Version::new(0).with_minor(7)) {
//!     println!("loading {}", path);
//! }
//! cache.close();
//! # Ok::<(), libpaths::Error>(())
//! ```
//!
//! # Example: Pick a backend
//!
//! ```no_run
//! use libpaths::backend::{select_backend, IndicatorBackend, DEFAULT_LIBRARIES};
//! use libpaths::LibPathsCache;
//!
//! let cache = LibPathsCache::open(DEFAULT_LIBRARIES)?;
//! if let Some(resolved) = select_backend::<IndicatorBackend>(&cache) {
//!     println!("{:?} => {}", resolved.backend, resolved.path);
//! }
//! # Ok::<(), libpaths::Error>(())
//! ```

mod internal;

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod image;
pub mod registry;
pub mod store;
pub mod version;

pub use cache::LibPathsCache;
pub use config::LibPathsConfig;
pub use error::Error;
pub use image::LoaderCacheImage;
pub use registry::{LibraryEntry, Registry};
pub use store::{GlobalMeta, PersistedStore, StaleReason, StoreStatus};
pub use version::Version;
