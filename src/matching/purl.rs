//! Package URL parsing, canonical rendering and construction.
//!
//! Parsing goes through the `packageurl` crate; rendering is done here so the
//! output is stable: qualifiers sorted by key, `:` in versions encoded as
//! `%3A`, and `/` and `:` left readable in qualifier values
//! (`repository_url=quay.io/org/app`, `checksum=sha256:...`).

use crate::error::{Result, SbomMergeError};
use packageurl::PackageUrl;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// A parsed purl with decoded components
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Purl {
    pub ty: String,
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub qualifiers: BTreeMap<String, String>,
    pub subpath: Option<String>,
}

impl Purl {
    /// Start a purl of `ty` for package `name`
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            namespace: None,
            name: name.into(),
            version: None,
            qualifiers: BTreeMap::new(),
            subpath: None,
        }
    }

    /// Parse purl text. Invalid syntax is an identity conflict.
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = PackageUrl::from_str(text)
            .map_err(|e| SbomMergeError::identity_conflict(text, e.to_string()))?;
        Ok(Self {
            ty: parsed.ty().to_string(),
            namespace: parsed.namespace().map(ToString::to_string),
            name: parsed.name().to_string(),
            version: parsed.version().map(ToString::to_string),
            qualifiers: parsed
                .qualifiers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            subpath: parsed.subpath().map(ToString::to_string),
        })
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_qualifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.qualifiers.insert(key.into(), value.into());
        self
    }

    /// Same package coordinates without qualifiers and subpath
    #[must_use]
    pub fn without_qualifiers_and_subpath(&self) -> Self {
        Self {
            qualifiers: BTreeMap::new(),
            subpath: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for Purl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.ty)?;
        if let Some(namespace) = &self.namespace {
            let segments: Vec<String> = namespace
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| percent_encode(s, ""))
                .collect();
            if !segments.is_empty() {
                write!(f, "{}/", segments.join("/"))?;
            }
        }
        f.write_str(&percent_encode(&self.name, ""))?;
        if let Some(version) = &self.version {
            write!(f, "@{}", percent_encode(version, "+"))?;
        }
        if !self.qualifiers.is_empty() {
            let pairs: Vec<String> = self
                .qualifiers
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| format!("{}={}", k.to_ascii_lowercase(), percent_encode(v, "/:+")))
                .collect();
            if !pairs.is_empty() {
                write!(f, "?{}", pairs.join("&"))?;
            }
        }
        if let Some(subpath) = &self.subpath {
            let segments: Vec<String> = subpath
                .split('/')
                .filter(|s| !s.is_empty() && *s != "." && *s != "..")
                .map(|s| percent_encode(s, ""))
                .collect();
            if !segments.is_empty() {
                write!(f, "#{}", segments.join("/"))?;
            }
        }
        Ok(())
    }
}

/// Canonical text of a purl: parsed then rendered
pub fn canonicalize(text: &str) -> Result<String> {
    Ok(Purl::parse(text)?.to_string())
}

/// `pkg:oci/<name>@<digest>?repository_url=<repository>`
#[must_use]
pub fn oci_purl(name: &str, digest: &str, repository_url: &str) -> String {
    Purl::new("oci", name)
        .with_version(digest)
        .with_qualifier("repository_url", repository_url)
        .to_string()
}

/// Percent-encode everything outside the unreserved set and `keep`
#[must_use]
pub fn percent_encode(value: &str, keep: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~') || keep.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

/// Decode `%XX` escapes; malformed escapes are kept as written
#[must_use]
pub fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
