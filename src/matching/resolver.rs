//! Identity resolution: which nodes of different documents are the same
//! real-world component.

use super::purl::canonicalize;
use crate::error::Result;
use crate::model::{ElementKind, Node, NodeId};
use std::fmt;

/// Identity of a node across documents. Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolverKey {
    /// Canonical purl text
    Purl(String),
    NameVersion { name: String, version: String },
    /// Path and sorted `ALGO:value` checksums of an SPDX file
    File { path: String, checksums: Vec<String> },
    /// Only ever matches a re-read of the very same element
    Local { id: NodeId, name: String },
}

impl fmt::Display for ResolverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purl(purl) => f.write_str(purl),
            Self::NameVersion { name, version } => write!(f, "{name}@{version}"),
            Self::File { path, checksums } => write!(f, "file:{path}:{}", checksums.join(",")),
            Self::Local { id, name } => write!(f, "local:{id}:{name}"),
        }
    }
}

/// Name that carries no identity: empty, or a local directory path
fn is_local_name(name: &str) -> bool {
    name.is_empty() || name.starts_with('.') || name.starts_with('/')
}

/// Compute the resolver key of a node.
///
/// Fails only when the node carries a purl that cannot be parsed.
pub fn resolver_key(node: &Node) -> Result<ResolverKey> {
    if let Some(purl) = &node.purl {
        return Ok(ResolverKey::Purl(canonicalize(purl)?));
    }

    if node.kind == ElementKind::File && !node.hashes.is_empty() {
        let mut checksums: Vec<String> = node
            .hashes
            .iter()
            .map(|h| format!("{}:{}", h.algorithm.spdx_name(), h.value.to_ascii_lowercase()))
            .collect();
        checksums.sort();
        checksums.dedup();
        return Ok(ResolverKey::File {
            path: node.name.clone(),
            checksums,
        });
    }

    match &node.version {
        Some(version) if !version.is_empty() && !is_local_name(&node.name) => {
            Ok(ResolverKey::NameVersion {
                name: node.name.clone(),
                version: version.clone(),
            })
        }
        _ => Ok(ResolverKey::Local {
            id: node.id.clone(),
            name: node.name.clone(),
        }),
    }
}
