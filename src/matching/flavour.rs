//! Producer flavours and the cachi2-over-syft duplicate filter.
//!
//! A prefetch tool (cachi2) reports the dependencies it fetched; a scanner
//! (syft) reports what it finds in the built image. When both describe the
//! same dependency the prefetch report is authoritative, but the scanner
//! writes purls differently, so plain resolver keys do not line up. The
//! filter here recognises the scanner's spelling of cachi2 components.

use super::purl::{percent_decode, Purl};
use crate::error::{Result, SbomMergeError};
use crate::model::{Document, Node, NodeId};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The tool that produced an input document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flavour {
    Cachi2,
    #[default]
    Syft,
}

impl fmt::Display for Flavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cachi2 => f.write_str("cachi2"),
            Self::Syft => f.write_str("syft"),
        }
    }
}

impl FromStr for Flavour {
    type Err = SbomMergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cachi2" => Ok(Self::Cachi2),
            "syft" => Ok(Self::Syft),
            other => Err(SbomMergeError::validation(format!(
                "unknown SBOM flavour '{other}', expected cachi2 or syft"
            ))),
        }
    }
}

/// An input path tagged with its producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlavouredInput {
    pub flavour: Flavour,
    pub path: PathBuf,
}

impl FromStr for FlavouredInput {
    type Err = SbomMergeError;

    /// `cachi2:path`, `syft:path`, or a bare path (syft, whatever its position)
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((flavour, path)) => Ok(Self {
                flavour: flavour.parse()?,
                path: PathBuf::from(path),
            }),
            None => Ok(Self {
                flavour: Flavour::default(),
                path: PathBuf::from(s),
            }),
        }
    }
}

/// `v2`, `v10`: a major-version suffix, not a package subpath
fn subpath_is_version(subpath: &str) -> bool {
    subpath
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// `name@version`, or the element id when the name is a local path
fn fallback_key(node: &Node) -> String {
    let name = node.name.as_str();
    if name.is_empty() || name.starts_with('.') || name.starts_with('/') {
        node.id.to_string()
    } else {
        format!("{name}@{}", node.version.as_deref().unwrap_or_default())
    }
}

fn cachi2_key(node: &Node) -> Result<String> {
    match &node.purl {
        Some(purl) => Ok(Purl::parse(purl)?.without_qualifiers_and_subpath().to_string()),
        None => Ok(fallback_key(node)),
    }
}

fn syft_key(purl: Option<&Purl>, node: &Node) -> String {
    let Some(purl) = purl else {
        return fallback_key(node);
    };
    let mut purl = purl.clone();
    if purl.ty == "pypi" {
        purl.name = purl.name.to_lowercase();
    }
    if purl.ty == "golang" {
        purl.version = purl.version.as_deref().map(percent_decode);
        if let Some(subpath) = purl.subpath.take() {
            if subpath_is_version(&subpath) {
                // the major version belongs to the module path
                let module = match purl.namespace.take() {
                    Some(namespace) => format!("{namespace}/{}", purl.name),
                    None => purl.name.clone(),
                };
                purl.namespace = Some(module);
                purl.name = subpath;
            } else {
                purl.subpath = Some(subpath);
            }
        }
    }
    purl.to_string()
}

/// `namespace/name` as a normalized relative path
fn npm_path(purl: &Purl) -> String {
    match purl.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        Some(namespace) => normalize_path(&format!("{namespace}/{}", purl.name)),
        None => normalize_path(&purl.name),
    }
}

fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Decides whether a scanner node duplicates something cachi2 reported
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    cachi2_keys: HashSet<String>,
    non_registry_names: HashSet<String>,
    local_paths: HashSet<String>,
}

impl DuplicateFilter {
    /// Index the non-root nodes of a cachi2 document
    pub fn from_cachi2(document: &Document) -> Result<Self> {
        let mut filter = Self::default();
        for node in document.nodes().filter(|n| &n.id != document.root_id()) {
            filter.cachi2_keys.insert(cachi2_key(node)?);
            let Some(text) = &node.purl else { continue };
            let purl = Purl::parse(text)?;
            let fetched_directly = purl.qualifiers.contains_key("vcs_url")
                || purl.qualifiers.contains_key("download_url");
            if matches!(purl.ty.as_str(), "pypi" | "npm") && fetched_directly {
                filter.non_registry_names.insert(node.name.clone());
            }
            if let Some(subpath) = &purl.subpath {
                filter.local_paths.insert(normalize_path(subpath));
            }
        }
        Ok(filter)
    }

    /// Whether a scanner node should give way to cachi2's report
    pub fn is_duplicate(&self, node: &Node) -> Result<bool> {
        let purl = node.purl.as_deref().map(Purl::parse).transpose()?;

        if let Some(purl) = &purl {
            if purl.ty == "golang" && is_local_golang(purl, node) {
                tracing::debug!("Dropping local golang replacement {}", node.id);
                return Ok(true);
            }
            if purl.ty == "npm" && self.local_paths.contains(&npm_path(purl)) {
                tracing::debug!("Dropping npm path dependency {}", node.id);
                return Ok(true);
            }
        }
        if self.non_registry_names.contains(&node.name) {
            tracing::debug!("Dropping non-registry dependency {}", node.id);
            return Ok(true);
        }
        Ok(self.cachi2_keys.contains(&syft_key(purl.as_ref(), node)))
    }
}

fn is_local_golang(purl: &Purl, node: &Node) -> bool {
    if purl
        .subpath
        .as_deref()
        .is_some_and(|subpath| !subpath_is_version(subpath))
    {
        return true;
    }
    node.name.starts_with('.') || node.version.as_deref() == Some("(devel)")
}

/// Remove the non-root nodes of a scanner document that duplicate cachi2
/// nodes, together with their edges. Returns how many were removed.
pub fn remove_duplicates(syft: &mut Document, filter: &DuplicateFilter) -> Result<usize> {
    let mut doomed: Vec<NodeId> = Vec::new();
    for node in syft.nodes().filter(|n| &n.id != syft.root_id()) {
        if filter.is_duplicate(node)? {
            doomed.push(node.id.clone());
        }
    }
    for id in &doomed {
        syft.remove_node(id);
    }
    Ok(doomed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentMetadata, SbomFormat};

    fn document(nodes: Vec<Node>) -> Document {
        let meta = DocumentMetadata::new(SbomFormat::CycloneDx, "1.5");
        let mut doc = Document::new(meta, Node::new("root", "root"));
        for node in nodes {
            doc.add_node(node);
        }
        doc
    }

    fn filter(nodes: Vec<Node>) -> DuplicateFilter {
        DuplicateFilter::from_cachi2(&document(nodes)).unwrap()
    }

    #[test]
    fn test_parse_flavoured_input() {
        let input: FlavouredInput = "cachi2:sboms/cachi2.json".parse().unwrap();
        assert_eq!(input.flavour, Flavour::Cachi2);
        assert_eq!(input.path, PathBuf::from("sboms/cachi2.json"));

        let bare: FlavouredInput = "syft.json".parse().unwrap();
        assert_eq!(bare.flavour, Flavour::Syft);

        assert!("grype:x.json".parse::<FlavouredInput>().is_err());
    }

    #[test]
    fn test_untagged_inputs_are_never_cachi2() {
        let inputs: Vec<FlavouredInput> = ["first.json", "second.json", "syft:third.json"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert!(inputs.iter().all(|i| i.flavour == Flavour::Syft));
    }

    #[test]
    fn test_same_key_without_qualifiers() {
        let filter = filter(vec![Node::new("c", "requests")
            .with_purl("pkg:pypi/requests@2.31.0?repository_url=https://pypi.example.com")]);
        let syft = Node::new("s", "Requests").with_purl("pkg:pypi/Requests@2.31.0");
        assert!(filter.is_duplicate(&syft).unwrap());

        let other = Node::new("s2", "requests").with_purl("pkg:pypi/requests@2.32.0");
        assert!(!filter.is_duplicate(&other).unwrap());
    }

    #[test]
    fn test_golang_version_subpath_folded_into_name() {
        let filter = filter(vec![Node::new("c", "retrodep")
            .with_purl("pkg:golang/github.com/cachito-testing/retrodep/v2@v2.1.1")]);
        let syft = Node::new("s", "github.com/cachito-testing/retrodep")
            .with_purl("pkg:golang/github.com/cachito-testing/retrodep@v2.1.1#v2");
        assert!(filter.is_duplicate(&syft).unwrap());
    }

    #[test]
    fn test_golang_local_replacements() {
        let filter = DuplicateFilter::default();
        let subpath = Node::new("a", "github.com/org/mod")
            .with_purl("pkg:golang/github.com/org/mod@v0.0.0#terminaltor");
        let dotted = Node::new("b", "./local").with_purl("pkg:golang/example.com/local@v0.0.0");
        let devel = Node::new("c", "example.com/main")
            .with_version("(devel)")
            .with_purl("pkg:golang/example.com/main");
        for node in [subpath, dotted, devel] {
            assert!(filter.is_duplicate(&node).unwrap(), "{}", node.id);
        }
    }

    #[test]
    fn test_non_registry_matched_by_name() {
        let filter = filter(vec![Node::new("c", "mypkg")
            .with_purl("pkg:pypi/mypkg?vcs_url=git%2Bhttps://github.com/org/mypkg%40abc")]);
        let syft = Node::new("s", "mypkg").with_purl("pkg:pypi/mypkg@1.0.0");
        assert!(filter.is_duplicate(&syft).unwrap());
    }

    #[test]
    fn test_npm_path_dependency() {
        let filter = filter(vec![Node::new("c", "sub")
            .with_purl("pkg:npm/root-pkg@1.0.0?vcs_url=git%2Bhttps://x#packages/sub")]);
        let syft = Node::new("s", "sub").with_purl("pkg:npm/packages/sub@1.0.0");
        assert!(filter.is_duplicate(&syft).unwrap());
    }

    #[test]
    fn test_purl_less_nodes_use_name_version() {
        let filter = filter(vec![Node::new("c", "bash").with_version("5.1")]);
        assert!(filter
            .is_duplicate(&Node::new("s", "bash").with_version("5.1"))
            .unwrap());
        assert!(!filter
            .is_duplicate(&Node::new("s", "bash").with_version("5.2"))
            .unwrap());
    }

    #[test]
    fn test_remove_duplicates_keeps_root() {
        let filter = filter(vec![Node::new("c", "x").with_purl("pkg:npm/x@1.0")]);
        let mut syft = document(vec![
            Node::new("x1", "x").with_purl("pkg:npm/x@1.0"),
            Node::new("y1", "y").with_purl("pkg:npm/y@1.0"),
        ]);
        assert_eq!(remove_duplicates(&mut syft, &filter).unwrap(), 1);
        assert_eq!(syft.node_count(), 2);
        assert!(syft.root().is_some());
    }
}
