//! Format-agnostic document graph: nodes, typed edges and a single root.

use super::{DocumentMetadata, ElementKind, ExternalReference, Hash, NodeId};
use crate::error::{FormatErrorKind, Result, SbomMergeError};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// A component (CycloneDX) or package/file (SPDX).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub version: Option<String>,
    pub purl: Option<String>,
    /// CycloneDX `type` / lowercased SPDX `primaryPackagePurpose`
    pub component_type: Option<String>,
    pub kind: ElementKind,
    pub hashes: Vec<Hash>,
    pub external_refs: Vec<ExternalReference>,
    /// Repeatable key/value properties, values in insertion order
    pub properties: IndexMap<String, Vec<String>>,
    /// Input documents that contributed this node. Never serialized.
    #[serde(skip)]
    pub provenance: BTreeSet<String>,
    /// Wire fields the model does not interpret, written back verbatim
    pub extra: Map<String, Value>,
    /// Property carriers as read, in wire order: SPDX annotations or
    /// CycloneDX `properties[]` entries. Lets unchanged entries be written
    /// back as they were; not part of equality.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wire_properties: Vec<Value>,
}

impl Node {
    /// Create a package node with only an id and a name
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: None,
            purl: None,
            component_type: None,
            kind: ElementKind::Package,
            hashes: Vec::new(),
            external_refs: Vec::new(),
            properties: IndexMap::new(),
            provenance: BTreeSet::new(),
            extra: Map::new(),
            wire_properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_purl(mut self, purl: impl Into<String>) -> Self {
        self.purl = Some(purl.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, component_type: impl Into<String>) -> Self {
        self.component_type = Some(component_type.into());
        self
    }

    /// Append a property value unless that exact value is already present
    pub fn add_property(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let values = self.properties.entry(name.into()).or_default();
        let value = value.into();
        if values.contains(&value) {
            false
        } else {
            values.push(value);
            true
        }
    }

    /// Values of a property, empty when absent
    #[must_use]
    pub fn property(&self, name: &str) -> &[String] {
        self.properties.get(name).map_or(&[], Vec::as_slice)
    }

    /// Add a hash unless already present
    pub fn add_hash(&mut self, hash: Hash) {
        if !self.hashes.contains(&hash) {
            self.hashes.push(hash);
        }
    }

    /// A placeholder root emitted by directory scanners: no name, or a
    /// local path such as `./some-directory`.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.name.is_empty() || self.name.starts_with('.')
    }

    /// Union another representation of the same element into this one.
    ///
    /// List fields are concatenated with exact duplicates removed; scalar
    /// fields keep the value already present and are only filled when empty.
    pub fn absorb(&mut self, other: Node) {
        if self.name.is_empty() {
            self.name = other.name;
        }
        if self.version.is_none() {
            self.version = other.version;
        }
        if self.purl.is_none() {
            self.purl = other.purl;
        }
        if self.component_type.is_none() {
            self.component_type = other.component_type;
        }
        for hash in other.hashes {
            self.add_hash(hash);
        }
        for reference in other.external_refs {
            if !self.external_refs.contains(&reference) {
                self.external_refs.push(reference);
            }
        }
        for (name, values) in other.properties {
            for value in values {
                self.add_property(name.clone(), value);
            }
        }
        self.provenance.extend(other.provenance);
        merge_extra(&mut self.extra, &other.extra);
        for annotation in other.wire_properties {
            if !self.wire_properties.contains(&annotation) {
                self.wire_properties.push(annotation);
            }
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.version == other.version
            && self.purl == other.purl
            && self.component_type == other.component_type
            && self.kind == other.kind
            && self.hashes == other.hashes
            && self.external_refs == other.external_refs
            && self.properties == other.properties
            && self.extra == other.extra
    }
}

/// Union unmodeled fields: missing keys are inserted, arrays present on both
/// sides are unioned by equality, other existing values win.
pub(crate) fn merge_extra(target: &mut Map<String, Value>, other: &Map<String, Value>) {
    for (key, value) in other {
        match (target.get_mut(key), value) {
            (None, _) => {
                target.insert(key.clone(), value.clone());
            }
            (Some(Value::Array(existing)), Value::Array(incoming)) => {
                for item in incoming {
                    if !existing.contains(item) {
                        existing.push(item.clone());
                    }
                }
            }
            (Some(_), _) => {}
        }
    }
}

/// Typed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipKind {
    Describes,
    DependsOn,
    Contains,
    BuildToolOf,
    /// Any other SPDX relationship type, kept verbatim
    Other(String),
}

impl RelationshipKind {
    /// Map an SPDX `relationshipType`
    #[must_use]
    pub fn from_spdx(name: &str) -> Self {
        match name {
            "DESCRIBES" => Self::Describes,
            "DEPENDS_ON" => Self::DependsOn,
            "CONTAINS" => Self::Contains,
            "BUILD_TOOL_OF" => Self::BuildToolOf,
            other => Self::Other(other.to_string()),
        }
    }

    /// SPDX `relationshipType`
    #[must_use]
    pub fn spdx_name(&self) -> &str {
        match self {
            Self::Describes => "DESCRIBES",
            Self::DependsOn => "DEPENDS_ON",
            Self::Contains => "CONTAINS",
            Self::BuildToolOf => "BUILD_TOOL_OF",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spdx_name())
    }
}

/// An edge; its identity is the whole triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub kind: RelationshipKind,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, kind: RelationshipKind, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            kind,
            target: target.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.kind, self.target)
    }
}

/// An SBOM as a graph with exactly one root.
///
/// Nodes and edges keep insertion order so serialization is deterministic.
/// Equality ignores that order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub metadata: DocumentMetadata,
    root: NodeId,
    nodes: IndexMap<NodeId, Node>,
    edges: IndexSet<Edge>,
    /// Unmodeled wire fields of relationships, such as an SPDX `comment`
    edge_extra: IndexMap<Edge, Map<String, Value>>,
}

impl Document {
    /// Create a document around its root node
    #[must_use]
    pub fn new(metadata: DocumentMetadata, root: Node) -> Self {
        let root_id = root.id.clone();
        let mut nodes = IndexMap::new();
        nodes.insert(root_id.clone(), root);
        Self {
            metadata,
            root: root_id,
            nodes,
            edges: IndexSet::new(),
            edge_extra: IndexMap::new(),
        }
    }

    /// Insert a node, or union it into the node that already has its id.
    ///
    /// Returns `true` when a new node was inserted.
    pub fn add_node(&mut self, node: Node) -> bool {
        if let Some(existing) = self.nodes.get_mut(&node.id) {
            existing.absorb(node);
            false
        } else {
            self.nodes.insert(node.id.clone(), node);
            true
        }
    }

    /// Insert an edge; inserting an identical triple again is a no-op.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        self.edges.insert(edge)
    }

    /// Insert an edge together with its unmodeled wire fields.
    ///
    /// Fields of an edge already present are unioned like node extras.
    pub fn add_edge_with_extra(&mut self, edge: Edge, extra: &Map<String, Value>) -> bool {
        if !extra.is_empty() {
            merge_extra(self.edge_extra.entry(edge.clone()).or_default(), extra);
        }
        self.edges.insert(edge)
    }

    /// Unmodeled wire fields of an edge, if it carried any
    #[must_use]
    pub fn edge_extra(&self, edge: &Edge) -> Option<&Map<String, Value>> {
        self.edge_extra.get(edge)
    }

    #[must_use]
    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn find_node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    /// The root node; `None` only if the root was removed without a replacement
    #[must_use]
    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&self.root)
    }

    /// Make an existing node the root
    pub fn set_root(&mut self, id: &NodeId) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(SbomMergeError::format(
                "setting document root",
                FormatErrorKind::MissingRoot(id.to_string()),
            ));
        }
        self.root = id.clone();
        Ok(())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    pub fn edges_from<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.source == id)
    }

    pub fn edges_to<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.target == id)
    }

    /// Remove an edge, keeping the order of the others
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        self.edge_extra.shift_remove(edge);
        self.edges.shift_remove(edge)
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let removed = self.nodes.shift_remove(id)?;
        self.edges.retain(|e| &e.source != id && &e.target != id);
        self.edge_extra
            .retain(|e, _| &e.source != id && &e.target != id);
        Some(removed)
    }

    /// Point every edge touching `from` at `to` instead.
    ///
    /// Edges that would become self-loops are dropped.
    pub fn redirect_edges(&mut self, from: &NodeId, to: &NodeId) {
        let edges = std::mem::take(&mut self.edges);
        let mut extras = std::mem::take(&mut self.edge_extra);
        for original in edges {
            let extra = extras.shift_remove(&original).unwrap_or_default();
            let mut edge = original;
            if &edge.source == from {
                edge.source = to.clone();
            }
            if &edge.target == from {
                edge.target = to.clone();
            }
            if edge.source != edge.target {
                self.add_edge_with_extra(edge, &extra);
            }
        }
    }

    /// First id derived from `base` that no node uses yet:
    /// `base`, then `base-1`, `base-2`, ...
    #[must_use]
    pub fn unique_id(&self, base: &NodeId) -> NodeId {
        if !self.nodes.contains_key(base) {
            return base.clone();
        }
        (1..)
            .map(|n| base.with_suffix(n))
            .find(|candidate| !self.nodes.contains_key(candidate))
            .unwrap_or_else(|| base.clone())
    }

    /// Check the graph invariants: the root exists and no edge dangles.
    pub fn validate(&self) -> Result<()> {
        if !self.nodes.contains_key(&self.root) {
            return Err(SbomMergeError::format(
                "validating document",
                FormatErrorKind::MissingRoot(self.root.to_string()),
            ));
        }
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
                return Err(SbomMergeError::format(
                    "validating document",
                    FormatErrorKind::DanglingEdge {
                        source_id: edge.source.to_string(),
                        kind: edge.kind.to_string(),
                        target_id: edge.target.to_string(),
                    },
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HashAlgorithm, SbomFormat};
    use serde_json::json;

    fn doc() -> Document {
        let meta = DocumentMetadata::new(SbomFormat::CycloneDx, "1.5");
        Document::new(meta, Node::new("root", "app").with_version("1.0"))
    }

    #[test]
    fn test_add_node_unions_lists() {
        let mut doc = doc();
        let mut a = Node::new("x", "x").with_version("1.0");
        a.add_property("stage", "0");
        a.add_hash(Hash::new(HashAlgorithm::Sha256, "aa"));
        assert!(doc.add_node(a));

        let mut b = Node::new("x", "X").with_purl("pkg:npm/x@1.0");
        b.add_property("stage", "0");
        b.add_property("stage", "2");
        b.add_hash(Hash::new(HashAlgorithm::Sha256, "aa"));
        assert!(!doc.add_node(b));

        let node = doc.find_node(&NodeId::from("x")).unwrap();
        assert_eq!(node.name, "x");
        assert_eq!(node.purl.as_deref(), Some("pkg:npm/x@1.0"));
        assert_eq!(node.property("stage"), ["0", "2"]);
        assert_eq!(node.hashes.len(), 1);
        assert_eq!(doc.node_count(), 2);
    }

    #[test]
    fn test_add_edge_idempotent() {
        let mut doc = doc();
        doc.add_node(Node::new("x", "x"));
        let edge = Edge::new("root", RelationshipKind::DependsOn, "x");
        assert!(doc.add_edge(edge.clone()));
        assert!(!doc.add_edge(edge));
        assert_eq!(doc.edge_count(), 1);
    }

    #[test]
    fn test_validate_dangling_edge() {
        let mut doc = doc();
        doc.add_edge(Edge::new("root", RelationshipKind::DependsOn, "ghost"));
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid SBOM document"));
    }

    #[test]
    fn test_remove_node_drops_edges() {
        let mut doc = doc();
        doc.add_node(Node::new("x", "x"));
        doc.add_node(Node::new("y", "y"));
        doc.add_edge(Edge::new("root", RelationshipKind::DependsOn, "x"));
        doc.add_edge(Edge::new("x", RelationshipKind::DependsOn, "y"));

        doc.remove_node(&NodeId::from("x"));
        assert_eq!(doc.edge_count(), 0);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_redirect_edges_drops_self_loops() {
        let mut doc = doc();
        doc.add_node(Node::new("old", ""));
        doc.add_node(Node::new("x", "x"));
        doc.add_edge(Edge::new("root", RelationshipKind::Describes, "old"));
        doc.add_edge(Edge::new("old", RelationshipKind::Contains, "x"));

        doc.redirect_edges(&NodeId::from("old"), &NodeId::from("root"));
        let edges: Vec<_> = doc.edges().cloned().collect();
        assert_eq!(edges, vec![Edge::new("root", RelationshipKind::Contains, "x")]);
    }

    #[test]
    fn test_unique_id() {
        let mut doc = doc();
        assert_eq!(doc.unique_id(&NodeId::from("x")).as_str(), "x");
        assert_eq!(doc.unique_id(&NodeId::from("root")).as_str(), "root-1");
        doc.add_node(Node::new("root-1", "other"));
        assert_eq!(doc.unique_id(&NodeId::from("root")).as_str(), "root-2");
    }

    #[test]
    fn test_merge_extra_unions_arrays() {
        let mut target = json!({"licenses": [{"id": "MIT"}], "scope": "required"})
            .as_object()
            .cloned()
            .unwrap();
        let other = json!({"licenses": [{"id": "MIT"}, {"id": "Apache-2.0"}], "scope": "optional", "group": "g"})
            .as_object()
            .cloned()
            .unwrap();
        merge_extra(&mut target, &other);
        assert_eq!(target["licenses"].as_array().unwrap().len(), 2);
        assert_eq!(target["scope"], "required");
        assert_eq!(target["group"], "g");
    }

    #[test]
    fn test_edge_extra_follows_edge() {
        let mut doc = doc();
        doc.add_node(Node::new("old", ""));
        doc.add_node(Node::new("x", "x"));
        let comment = json!({"comment": "evident-by: /go.mod"})
            .as_object()
            .cloned()
            .unwrap();
        let edge = Edge::new("old", RelationshipKind::Other("OTHER".into()), "x");
        doc.add_edge_with_extra(edge.clone(), &comment);
        assert_eq!(doc.edge_extra(&edge), Some(&comment));

        doc.redirect_edges(&NodeId::from("old"), &NodeId::from("root"));
        let moved = Edge::new("root", RelationshipKind::Other("OTHER".into()), "x");
        assert!(doc.edge_extra(&edge).is_none());
        assert_eq!(doc.edge_extra(&moved), Some(&comment));

        doc.remove_node(&NodeId::from("x"));
        assert!(doc.edge_extra(&moved).is_none());
    }

    #[test]
    fn test_equality_ignores_provenance_and_order() {
        let mut a = doc();
        a.add_node(Node::new("x", "x"));
        a.add_node(Node::new("y", "y"));
        let mut b = doc();
        let mut y = Node::new("y", "y");
        y.provenance.insert("b.json".to_string());
        y.wire_properties.push(json!({"annotator": "Tool: x"}));
        b.add_node(y);
        b.add_node(Node::new("x", "x"));
        assert_eq!(a, b);
    }
}
