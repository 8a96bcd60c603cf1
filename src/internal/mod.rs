//! Internal implementation modules.
//!
//! These modules contain the low-level scanning details and are not part
//! of the public API.

pub(crate) mod extract;
pub(crate) mod string_pool;
