//! Shared utilities.

mod hash;

pub use hash::{sanitize_spdx_id, sha256_hex};
