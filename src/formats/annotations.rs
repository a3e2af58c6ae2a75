//! Properties carried as SPDX annotations.
//!
//! SPDX 2.x has no key/value properties, so each property value travels as
//! one annotation whose `comment` is the JSON text `{"name": ..., "value": ...}`.
//! Downstream consumers match on that literal string, so it is produced
//! exactly the way the build pipeline's Python tooling writes it: `", "` and
//! `": "` separators, with non-ASCII characters escaped as `\uXXXX`.

use serde::Deserialize;
use std::fmt::Write as _;

/// Annotator used for JSON-encoded properties
pub const DEFAULT_ANNOTATOR: &str = "Tool: konflux:jsonencoded";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EncodedProperty {
    name: String,
    value: String,
}

/// Encode a property as an annotation comment
#[must_use]
pub fn encode_property(name: &str, value: &str) -> String {
    format!(
        "{{\"name\": {}, \"value\": {}}}",
        ascii_json_string(name),
        ascii_json_string(value)
    )
}

/// Decode an annotation comment back into `(name, value)`.
///
/// Returns `None` for comments that do not follow the convention.
#[must_use]
pub fn decode_property(comment: &str) -> Option<(String, String)> {
    let property: EncodedProperty = serde_json::from_str(comment).ok()?;
    Some((property.name, property.value))
}

/// JSON string literal with every non-ASCII character escaped.
fn ascii_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
    out
}
