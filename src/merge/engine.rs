//! N-way graph merge.

use crate::error::{FormatErrorKind, Result, SbomMergeError};
use crate::formats::SbomAdapter;
use crate::matching::{remove_duplicates, resolver_key, DuplicateFilter, Flavour, ResolverKey};
use crate::model::{merge_extra, Document, Edge, Node, NodeId, RelationshipKind};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Default name of the synthetic root wrapping several independent roots
pub const DEFAULT_SYNTHETIC_ROOT_NAME: &str = "merged-sbom";

/// Merges documents of one format into a single graph.
pub struct GraphMerger<'a> {
    adapter: &'a dyn SbomAdapter,
    synthetic_root_name: String,
}

impl<'a> GraphMerger<'a> {
    /// Create a merger writing synthetic roots the way `adapter` expects
    pub fn new(adapter: &'a dyn SbomAdapter) -> Self {
        Self {
            adapter,
            synthetic_root_name: DEFAULT_SYNTHETIC_ROOT_NAME.to_string(),
        }
    }

    /// Name given to a synthetic root when one is introduced
    #[must_use]
    pub fn with_synthetic_root_name(mut self, name: impl Into<String>) -> Self {
        self.synthetic_root_name = name.into();
        self
    }

    /// Merge documents. Input order only decides which scalar values win.
    pub fn merge(&self, documents: &[Document]) -> Result<Document> {
        let first = documents
            .first()
            .ok_or_else(|| SbomMergeError::validation("no documents to merge"))?;
        let format = self.adapter.format();
        for document in documents {
            if document.metadata.format != format {
                return Err(SbomMergeError::format(
                    "merging documents",
                    FormatErrorKind::MismatchedFormats(
                        format.to_string(),
                        document.metadata.format.to_string(),
                    ),
                ));
            }
        }

        let mut metadata = first.metadata.clone();
        for document in &documents[1..] {
            metadata.absorb(&document.metadata);
        }

        let mut state = MergeState::default();
        let mut roots: IndexSet<NodeId> = IndexSet::new();
        let no_extra = Map::new();
        // Edges of unwrapped synthetic roots other than their describes edges;
        // `None` stands for the final root.
        let mut orphan_edges: Vec<OrphanEdge<'_>> = Vec::new();

        for (index, document) in documents.iter().enumerate() {
            let synthetic = document
                .root()
                .filter(|root| self.adapter.is_synthetic_root(root))
                .map(|root| root.id.clone());

            let mut remap: HashMap<&NodeId, NodeId> = HashMap::new();
            for node in document.nodes() {
                if Some(&node.id) == synthetic.as_ref() {
                    continue;
                }
                let id = state.insert(node)?;
                remap.insert(&node.id, id);
            }

            match &synthetic {
                Some(wrapper) => {
                    for edge in document.edges_from(wrapper) {
                        if edge.kind == RelationshipKind::Describes {
                            if let Some(id) = remap.get(&edge.target) {
                                roots.insert(id.clone());
                            }
                        }
                    }
                    tracing::debug!("Unwrapped synthetic root of input #{}", index + 1);
                }
                None => {
                    if let Some(id) = remap.get(document.root_id()) {
                        roots.insert(id.clone());
                    }
                }
            }

            for edge in document.edges() {
                let extra = document.edge_extra(edge).unwrap_or(&no_extra);
                let touches_wrapper = synthetic
                    .as_ref()
                    .is_some_and(|w| &edge.source == w || &edge.target == w);
                if touches_wrapper {
                    let is_wrapping = edge.kind == RelationshipKind::Describes
                        && Some(&edge.source) == synthetic.as_ref();
                    if !is_wrapping {
                        orphan_edges.push((
                            remap.get(&edge.source).cloned(),
                            edge.kind.clone(),
                            remap.get(&edge.target).cloned(),
                            extra,
                        ));
                    }
                    continue;
                }
                match (remap.get(&edge.source), remap.get(&edge.target)) {
                    (Some(source), Some(target)) => {
                        state.add_edge(
                            Edge::new(source.clone(), edge.kind.clone(), target.clone()),
                            extra,
                        );
                    }
                    _ => {
                        return Err(SbomMergeError::format(
                            format!("merging input #{}", index + 1),
                            FormatErrorKind::DanglingEdge {
                                source_id: edge.source.to_string(),
                                kind: edge.kind.to_string(),
                                target_id: edge.target.to_string(),
                            },
                        ))
                    }
                }
            }
        }

        let (root, wrapped) = if roots.len() == 1 {
            let id = roots[0].clone();
            let node = state.nodes.shift_remove(&id).ok_or_else(|| {
                SbomMergeError::format("merging documents", FormatErrorKind::MissingRoot(id.to_string()))
            })?;
            (node, Vec::new())
        } else {
            let mut node = self.adapter.synthetic_root(&self.synthetic_root_name);
            node.id = state.unique_id(&node.id);
            tracing::info!(
                "Introducing synthetic root '{}' over {} roots",
                node.id,
                roots.len()
            );
            (node, roots.into_iter().collect())
        };

        let root_id = root.id.clone();
        let mut merged = Document::new(metadata, root);
        for node in state.nodes.into_values() {
            merged.add_node(node);
        }
        for child in wrapped {
            merged.add_edge(Edge::new(root_id.clone(), RelationshipKind::Describes, child));
        }
        for edge in state.edges {
            let extra = state.edge_extra.shift_remove(&edge).unwrap_or_default();
            merged.add_edge_with_extra(edge, &extra);
        }
        for (source, kind, target, extra) in orphan_edges {
            let source = source.unwrap_or_else(|| root_id.clone());
            let target = target.unwrap_or_else(|| root_id.clone());
            if source != target {
                merged.add_edge_with_extra(Edge::new(source, kind, target), extra);
            }
        }

        merged.validate()?;
        tracing::info!(
            "Merged {} documents into {} nodes and {} edges",
            documents.len(),
            merged.node_count(),
            merged.edge_count()
        );
        Ok(merged)
    }

    /// Merge producer-tagged documents.
    ///
    /// Nodes of syft documents that duplicate the cachi2 document's report
    /// are removed first; the syft documents then take precedence for
    /// scalar values, followed by the cachi2 document.
    pub fn merge_flavoured(&self, inputs: Vec<(Flavour, Document)>) -> Result<Document> {
        let mut cachi2 = Vec::new();
        let mut syft = Vec::new();
        for (flavour, document) in inputs {
            match flavour {
                Flavour::Cachi2 => cachi2.push(document),
                Flavour::Syft => syft.push(document),
            }
        }
        if cachi2.len() > 1 || syft.is_empty() {
            return Err(SbomMergeError::validation(format!(
                "unsupported combination of {} cachi2 and {} syft inputs; \
                 expected at most one cachi2 input and at least one syft input",
                cachi2.len(),
                syft.len()
            )));
        }

        if let Some(authoritative) = cachi2.first() {
            let filter = DuplicateFilter::from_cachi2(authoritative)?;
            for document in &mut syft {
                let removed = remove_duplicates(document, &filter)?;
                tracing::info!("Removed {} syft components reported by cachi2", removed);
            }
        }

        syft.extend(cachi2);
        self.merge(&syft)
    }
}

/// Edge of an unwrapped synthetic root with its wire fields
type OrphanEdge<'d> = (
    Option<NodeId>,
    RelationshipKind,
    Option<NodeId>,
    &'d Map<String, Value>,
);

/// Output nodes indexed by id and by resolver key
#[derive(Default)]
struct MergeState {
    nodes: IndexMap<NodeId, Node>,
    by_key: HashMap<ResolverKey, NodeId>,
    edges: IndexSet<Edge>,
    edge_extra: IndexMap<Edge, Map<String, Value>>,
}

impl MergeState {
    /// Union `node` into the output; returns its output id
    fn insert(&mut self, node: &Node) -> Result<NodeId> {
        let key = resolver_key(node)?;
        if let Some(id) = self.by_key.get(&key) {
            tracing::debug!("Unifying {} into {} by key {}", node.id, id, key);
            if let Some(existing) = self.nodes.get_mut(id) {
                let mut incoming = node.clone();
                incoming.id = id.clone();
                existing.absorb(incoming);
            }
            return Ok(id.clone());
        }

        let id = self.unique_id(&node.id);
        if id != node.id {
            tracing::debug!("Renaming colliding id {} to {}", node.id, id);
        }
        let mut copy = node.clone();
        copy.id = id.clone();
        self.nodes.insert(id.clone(), copy);
        self.by_key.insert(key, id.clone());
        Ok(id)
    }

    fn add_edge(&mut self, edge: Edge, extra: &Map<String, Value>) {
        if !extra.is_empty() {
            merge_extra(self.edge_extra.entry(edge.clone()).or_default(), extra);
        }
        self.edges.insert(edge);
    }

    fn unique_id(&self, base: &NodeId) -> NodeId {
        if !self.nodes.contains_key(base) {
            return base.clone();
        }
        (1..)
            .map(|n| base.with_suffix(n))
            .find(|candidate| !self.nodes.contains_key(candidate))
            .unwrap_or_else(|| base.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{CycloneDxAdapter, SpdxAdapter, SYNTHETIC_ROOT_REF};
    use crate::model::{DocumentMetadata, ElementKind, Hash, HashAlgorithm, SbomFormat};

    fn cdx(root: Node, deps: Vec<Node>) -> Document {
        let root_id = root.id.clone();
        let mut doc = Document::new(DocumentMetadata::new(SbomFormat::CycloneDx, "1.5"), root);
        for dep in deps {
            let id = dep.id.clone();
            doc.add_node(dep);
            doc.add_edge(Edge::new(root_id.clone(), RelationshipKind::DependsOn, id));
        }
        doc
    }

    fn doc_a() -> Document {
        cdx(
            Node::new("app", "app").with_purl("pkg:oci/app@sha256:aaa"),
            vec![Node::new("x", "x").with_purl("pkg:golang/x@1.0")],
        )
    }

    fn doc_b() -> Document {
        cdx(
            Node::new("other", "other").with_purl("pkg:oci/other@sha256:bbb"),
            vec![Node::new("y", "y").with_purl("pkg:npm/y@2.0")],
        )
    }

    #[test]
    fn test_two_roots_get_synthetic_root() {
        let adapter = CycloneDxAdapter::new();
        let merged = GraphMerger::new(&adapter).merge(&[doc_a(), doc_b()]).unwrap();

        assert_eq!(merged.root_id().as_str(), SYNTHETIC_ROOT_REF);
        assert_eq!(merged.root().unwrap().name, DEFAULT_SYNTHETIC_ROOT_NAME);
        let describes: Vec<_> = merged
            .edges()
            .filter(|e| e.kind == RelationshipKind::Describes)
            .collect();
        assert_eq!(describes.len(), 2);
        assert_eq!(merged.node_count(), 5);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let adapter = CycloneDxAdapter::new();
        let merger = GraphMerger::new(&adapter);
        let once = merger.merge(&[doc_a()]).unwrap();
        let twice = merger.merge(&[doc_a(), doc_a()]).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, doc_a());
    }

    #[test]
    fn test_remerge_unwraps_synthetic_root() {
        let adapter = CycloneDxAdapter::new();
        let merger = GraphMerger::new(&adapter);
        let ab = merger.merge(&[doc_a(), doc_b()]).unwrap();
        let c = cdx(
            Node::new("third", "third").with_purl("pkg:oci/third@sha256:ccc"),
            vec![],
        );
        let abc = merger.merge(&[ab, c]).unwrap();

        assert_eq!(abc.edges_from(abc.root_id()).count(), 3);
        let synthetic = abc
            .nodes()
            .filter(|n| adapter.is_synthetic_root(n))
            .count();
        assert_eq!(synthetic, 1);
    }

    #[test]
    fn test_colliding_ids_are_renamed() {
        let adapter = CycloneDxAdapter::new();
        let a = cdx(
            Node::new("app", "app").with_purl("pkg:oci/app@sha256:aaa"),
            vec![Node::new("dep", "x").with_purl("pkg:npm/x@1")],
        );
        let b = cdx(
            Node::new("app", "app").with_purl("pkg:oci/app@sha256:aaa"),
            vec![Node::new("dep", "y").with_purl("pkg:npm/y@1")],
        );
        let merged = GraphMerger::new(&adapter).merge(&[a, b]).unwrap();
        assert_eq!(merged.root_id().as_str(), "app");
        let y = merged.find_node(&NodeId::from("dep-1")).unwrap();
        assert_eq!(y.name, "y");
        assert!(merged.contains_edge(&Edge::new("app", RelationshipKind::DependsOn, "dep-1")));
    }

    #[test]
    fn test_first_scalar_wins_and_lists_union() {
        let adapter = CycloneDxAdapter::new();
        let mut first = Node::new("x", "x").with_purl("pkg:npm/x@1.0").with_version("1.0");
        first.add_property("source", "a");
        let mut second = Node::new("x2", "x-renamed").with_purl("pkg:npm/x@1.0");
        second.add_property("source", "b");
        let a = cdx(Node::new("app", "app").with_version("1"), vec![first]);
        let b = cdx(Node::new("app", "app").with_version("1"), vec![second]);

        let merged = GraphMerger::new(&adapter).merge(&[a, b]).unwrap();
        let x = merged.find_node(&NodeId::from("x")).unwrap();
        assert_eq!(x.name, "x");
        assert_eq!(x.property("source"), ["a", "b"]);
        assert!(merged.find_node(&NodeId::from("x2")).is_none());
    }

    #[test]
    fn test_same_content_at_two_paths_stays_two_files() {
        let adapter = SpdxAdapter::new();
        let mut doc = Document::new(
            DocumentMetadata::new(SbomFormat::Spdx, "SPDX-2.3"),
            Node::new("SPDXRef-a", "a").with_version("1"),
        );
        for (id, path) in [("SPDXRef-f1", "/etc/os-release"), ("SPDXRef-f2", "/usr/lib/os-release")] {
            let mut file = Node::new(id, path);
            file.kind = ElementKind::File;
            file.add_hash(Hash::new(HashAlgorithm::Sha1, "abc"));
            doc.add_node(file);
            doc.add_edge(Edge::new("SPDXRef-a", RelationshipKind::Contains, id));
        }

        let merged = GraphMerger::new(&adapter).merge(&[doc.clone()]).unwrap();
        assert_eq!(merged.node_count(), 3);
        assert_eq!(merged.edge_count(), 2);
        assert_eq!(merged, doc);
    }

    #[test]
    fn test_mismatched_formats() {
        let adapter = CycloneDxAdapter::new();
        let spdx = Document::new(
            DocumentMetadata::new(SbomFormat::Spdx, "SPDX-2.3"),
            Node::new("SPDXRef-a", "a"),
        );
        let err = GraphMerger::new(&adapter).merge(&[doc_a(), spdx]).unwrap_err();
        assert!(matches!(
            err,
            SbomMergeError::Format {
                source: FormatErrorKind::MismatchedFormats(..),
                ..
            }
        ));
    }

    #[test]
    fn test_empty_input() {
        let adapter = SpdxAdapter::new();
        assert!(GraphMerger::new(&adapter).merge(&[]).is_err());
    }

    #[test]
    fn test_flavoured_merge_prefers_cachi2() {
        let adapter = CycloneDxAdapter::new();
        let syft = cdx(
            Node::new("app", "app").with_purl("pkg:oci/app@sha256:aaa"),
            vec![
                Node::new("s-req", "Requests").with_purl("pkg:pypi/Requests@2.31.0"),
                Node::new("s-y", "y").with_purl("pkg:npm/y@2.0"),
            ],
        );
        let cachi2 = cdx(
            Node::new("app", "app").with_purl("pkg:oci/app@sha256:aaa"),
            vec![Node::new("c-req", "requests")
                .with_purl("pkg:pypi/requests@2.31.0?repository_url=https://pypi.example.com")],
        );
        let merged = GraphMerger::new(&adapter)
            .merge_flavoured(vec![(Flavour::Cachi2, cachi2), (Flavour::Syft, syft)])
            .unwrap();

        assert!(merged.find_node(&NodeId::from("s-req")).is_none());
        assert!(merged.find_node(&NodeId::from("c-req")).is_some());
        assert!(merged.find_node(&NodeId::from("s-y")).is_some());
        assert_eq!(merged.root_id().as_str(), "app");
    }

    #[test]
    fn test_flavoured_merge_rejects_two_cachi2() {
        let adapter = CycloneDxAdapter::new();
        let err = GraphMerger::new(&adapter)
            .merge_flavoured(vec![
                (Flavour::Cachi2, doc_a()),
                (Flavour::Cachi2, doc_b()),
                (Flavour::Syft, doc_a()),
            ])
            .unwrap_err();
        assert!(matches!(err, SbomMergeError::Validation(_)));
    }
}
