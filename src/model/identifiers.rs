//! Document-local element identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node inside one document.
///
/// This is the CycloneDX `bom-ref` or the SPDX `SPDXID` of the element. It is
/// only unique within a single document; cross-document identity is decided
/// by [`crate::matching::ResolverKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create an identifier from any string-like value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the identifier string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the `n`-th collision-free variant, `"{id}-{n}"`
    #[must_use]
    pub fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}-{n}", self.0))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
