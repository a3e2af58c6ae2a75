//! Content hashing and element-id helpers.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Lowercase hex SHA-256 of a string
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Replace every character not allowed in an SPDX element id with `-`
pub fn sanitize_spdx_id(value: &str) -> String {
    static INVALID: OnceLock<Option<Regex>> = OnceLock::new();
    match INVALID.get_or_init(|| Regex::new(r"[^0-9a-zA-Z.\-+]").ok()) {
        Some(pattern) => pattern.replace_all(value, "-").into_owned(),
        None => value.to_string(),
    }
}
