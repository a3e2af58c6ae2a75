//! SPDX 2.x JSON adapter.
//!
//! Packages and files become nodes, `relationships[]` become edges. The
//! element the document `DESCRIBES` is the root; a document describing
//! several elements is wrapped in a synthetic root. Node properties travel
//! as JSON-encoded annotations (see [`super::annotations`]).

use super::annotations::{decode_property, encode_property, DEFAULT_ANNOTATOR};
use super::take_first;
use super::traits::{FormatConfidence, FormatDetection, SbomAdapter};
use crate::error::{ErrorContext, Result, SbomMergeError};
use crate::model::{
    Creator, CreatorKind, Document, DocumentMetadata, Edge, ElementKind, ExternalReference, Hash,
    HashAlgorithm, Node, NodeId, RelationshipKind, SbomFormat,
};
use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// `SPDXID` of the root created when a document describes several elements
pub const SYNTHETIC_ROOT_ID: &str = "SPDXRef-DocumentRoot-Merged";

/// Default `SPDXID` of the document itself
pub const DOCUMENT_ID: &str = "SPDXRef-DOCUMENT";

const NOASSERTION: &str = "NOASSERTION";
const PURL_REFERENCE_TYPE: &str = "purl";
const PACKAGE_MANAGER: &str = "PACKAGE-MANAGER";
const RAW_ANNOTATIONS: &str = "annotations";

/// Adapter for SPDX 2.2 and 2.3 JSON
#[derive(Debug, Clone)]
pub struct SpdxAdapter {
    annotator: String,
}

impl Default for SpdxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpdxAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            annotator: DEFAULT_ANNOTATOR.to_string(),
        }
    }

    /// Use a different annotator for property annotations
    #[must_use]
    pub fn with_annotator(annotator: impl Into<String>) -> Self {
        Self {
            annotator: annotator.into(),
        }
    }

    fn convert_metadata(doc: &SpdxDocument) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::new(SbomFormat::Spdx, doc.spdx_version.clone());
        metadata.document_id = Some(doc.spdx_id.clone());
        metadata.name.clone_from(&doc.name);
        metadata.namespace.clone_from(&doc.document_namespace);
        metadata.extra = doc.extra.clone();
        if let Some(info) = &doc.creation_info {
            metadata.created.clone_from(&info.created);
            metadata.creators = info.creators.iter().map(|c| parse_creator(c)).collect();
            metadata.creation_extra = info.extra.clone();
        }
        metadata
    }

    /// `(name, value)` of an annotation following the property convention
    fn decode_annotation(&self, annotation: &Value) -> Option<(String, String)> {
        let annotation = serde_json::from_value::<SpdxAnnotation>(annotation.clone()).ok()?;
        if annotation.annotator != self.annotator {
            return None;
        }
        let decoded = decode_property(&annotation.comment);
        if decoded.is_none() {
            tracing::warn!(
                "Annotation by '{}' is not a JSON-encoded property: {}",
                annotation.annotator,
                annotation.comment
            );
        }
        decoded
    }

    /// Split annotations into properties and the ones kept verbatim
    fn read_annotations(&self, annotations: &[Value], node: &mut Node) {
        let mut raw = Vec::new();
        for annotation in annotations {
            match self.decode_annotation(annotation) {
                Some((name, value)) => node.properties.entry(name).or_default().push(value),
                None => raw.push(annotation.clone()),
            }
        }
        if !raw.is_empty() {
            node.extra
                .insert(RAW_ANNOTATIONS.to_string(), Value::Array(raw));
        }
        node.wire_properties = annotations.to_vec();
    }

    /// Annotations as read for everything still present on the node, then
    /// verbatim annotations gained by merging, then one new annotation per
    /// property value that has none yet.
    fn write_annotations(&self, node: &Node, date: &str) -> Vec<Value> {
        let mut pending: Vec<(&str, &str)> = node
            .properties
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |value| (name.as_str(), value.as_str())))
            .collect();
        let mut verbatim: Vec<&Value> = match node.extra.get(RAW_ANNOTATIONS) {
            Some(Value::Array(raw)) => raw.iter().collect(),
            _ => Vec::new(),
        };

        let mut annotations = Vec::new();
        for original in &node.wire_properties {
            let present = match self.decode_annotation(original) {
                Some((name, value)) => take_first(&mut pending, |(n, v)| *n == name && *v == value),
                None => take_first(&mut verbatim, |raw| *raw == original),
            };
            if present {
                annotations.push(original.clone());
            }
        }
        annotations.extend(verbatim.into_iter().cloned());
        annotations.extend(pending.into_iter().filter_map(|(name, value)| {
            serde_json::to_value(SpdxAnnotation {
                annotator: self.annotator.clone(),
                annotation_date: date.to_string(),
                annotation_type: "OTHER".to_string(),
                comment: encode_property(name, value),
            })
            .ok()
        }));
        annotations
    }

    fn convert_package(&self, wire: &SpdxPackage) -> Node {
        let mut node = Node::new(wire.spdx_id.as_str(), wire.name.clone());
        node.version.clone_from(&wire.version_info);
        node.component_type = wire
            .primary_package_purpose
            .as_ref()
            .map(|p| p.to_ascii_lowercase());
        node.hashes = convert_checksums(&wire.checksums);
        for reference in &wire.external_refs {
            let is_purl = reference.reference_type == PURL_REFERENCE_TYPE
                && reference.reference_category.replace('_', "-") == PACKAGE_MANAGER;
            if is_purl && node.purl.is_none() {
                node.purl = Some(reference.reference_locator.clone());
            } else {
                node.external_refs.push(ExternalReference {
                    kind: reference.reference_type.clone(),
                    locator: reference.reference_locator.clone(),
                    category: Some(reference.reference_category.clone()),
                    comment: reference.comment.clone(),
                });
            }
        }
        node.extra = wire.extra.clone();
        self.read_annotations(&wire.annotations, &mut node);
        node
    }

    fn convert_file(&self, wire: &SpdxFile) -> Node {
        let mut node = Node::new(wire.spdx_id.as_str(), wire.file_name.clone());
        node.kind = ElementKind::File;
        node.hashes = convert_checksums(&wire.checksums);
        node.extra = wire.extra.clone();
        self.read_annotations(&wire.annotations, &mut node);
        node
    }

    fn package_to_wire(&self, node: &Node, date: &str) -> SpdxPackage {
        let mut extra = node.extra.clone();
        extra.remove(RAW_ANNOTATIONS);
        if !extra.contains_key("downloadLocation") {
            extra.insert(
                "downloadLocation".to_string(),
                Value::String(NOASSERTION.to_string()),
            );
        }

        let mut external_refs: Vec<SpdxExternalRef> = node
            .purl
            .iter()
            .map(|purl| SpdxExternalRef {
                reference_category: PACKAGE_MANAGER.to_string(),
                reference_type: PURL_REFERENCE_TYPE.to_string(),
                reference_locator: purl.clone(),
                comment: None,
            })
            .collect();
        external_refs.extend(node.external_refs.iter().map(|r| SpdxExternalRef {
            reference_category: r.category.clone().unwrap_or_else(|| "OTHER".to_string()),
            reference_type: r.kind.clone(),
            reference_locator: r.locator.clone(),
            comment: r.comment.clone(),
        }));

        SpdxPackage {
            spdx_id: node.id.to_string(),
            name: node.name.clone(),
            version_info: node.version.clone(),
            primary_package_purpose: node
                .component_type
                .as_ref()
                .map(|t| t.to_ascii_uppercase()),
            checksums: checksums_to_wire(&node.hashes),
            external_refs,
            annotations: self.write_annotations(node, date),
            extra,
        }
    }

    fn file_to_wire(&self, node: &Node, date: &str) -> SpdxFile {
        let mut extra = node.extra.clone();
        extra.remove(RAW_ANNOTATIONS);
        SpdxFile {
            spdx_id: node.id.to_string(),
            file_name: node.name.clone(),
            checksums: checksums_to_wire(&node.hashes),
            annotations: self.write_annotations(node, date),
            extra,
        }
    }

    fn extract_json_version(content: &str) -> Option<String> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        PATTERN
            .get_or_init(|| Regex::new(r#""spdxVersion"\s*:\s*"([^"]+)""#).ok())
            .as_ref()?
            .captures(content)
            .map(|c| c[1].to_string())
    }
}

/// `Tool: syft-1.4.1` → tool creator named `syft-1.4.1`
fn parse_creator(creator: &str) -> Creator {
    let (kind, name) = match creator.split_once(':') {
        Some(("Tool", name)) => (CreatorKind::Tool, name),
        Some(("Organization", name)) => (CreatorKind::Organization, name),
        Some(("Person", name)) => (CreatorKind::Person, name),
        _ => (CreatorKind::Tool, creator),
    };
    let mut parsed = Creator::tool(name.trim());
    parsed.kind = kind;
    parsed
}

fn format_creator(creator: &Creator) -> String {
    match &creator.version {
        Some(version) => format!(
            "{}: {}-{version}",
            creator.kind.spdx_prefix(),
            creator.name
        ),
        None => format!("{}: {}", creator.kind.spdx_prefix(), creator.name),
    }
}

fn convert_checksums(checksums: &[SpdxChecksum]) -> Vec<Hash> {
    checksums
        .iter()
        .map(|c| Hash::new(HashAlgorithm::parse(&c.algorithm), c.checksum_value.clone()))
        .collect()
}

fn checksums_to_wire(hashes: &[Hash]) -> Vec<SpdxChecksum> {
    hashes
        .iter()
        .map(|h| SpdxChecksum {
            algorithm: h.algorithm.spdx_name(),
            checksum_value: h.value.clone(),
        })
        .collect()
}

/// Relationship endpoints that name no element of this document
fn is_foreign_element(id: &str) -> bool {
    id == "NONE" || id == NOASSERTION || id.starts_with("DocumentRef-")
}

/// Current UTC time in the `created` layout
pub(crate) fn spdx_timestamp_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl SbomAdapter for SpdxAdapter {
    fn format(&self) -> SbomFormat {
        SbomFormat::Spdx
    }

    fn parse_str(&self, content: &str) -> Result<Document> {
        let doc: SpdxDocument = serde_json::from_str(content).context("parsing SPDX document")?;
        if !doc.spdx_version.starts_with("SPDX-") {
            return Err(SbomMergeError::invalid_value(
                "spdxVersion",
                format!("expected 'SPDX-2.x', found '{}'", doc.spdx_version),
            ));
        }

        let mut nodes: Vec<Node> = doc
            .packages
            .iter()
            .map(|p| self.convert_package(p))
            .chain(doc.files.iter().map(|f| self.convert_file(f)))
            .collect();

        let mut described: IndexSet<NodeId> = doc
            .document_describes
            .iter()
            .map(|id| NodeId::from(id.as_str()))
            .collect();
        let mut edges = Vec::new();
        for relationship in &doc.relationships {
            let source = relationship.spdx_element_id.as_str();
            let target = relationship.related_spdx_element.as_str();
            let kind = relationship.relationship_type.as_str();

            if source == doc.spdx_id && kind == "DESCRIBES" {
                described.insert(NodeId::from(target));
                continue;
            }
            if target == doc.spdx_id && kind == "DESCRIBED_BY" {
                described.insert(NodeId::from(source));
                continue;
            }
            if source == doc.spdx_id || target == doc.spdx_id {
                return Err(SbomMergeError::invalid_value(
                    "relationships",
                    format!("unsupported document relationship {source} {kind} {target}"),
                ));
            }
            if is_foreign_element(source) || is_foreign_element(target) {
                return Err(SbomMergeError::invalid_value(
                    "relationships",
                    format!("relationship {source} {kind} {target} names no element of this document"),
                ));
            }
            edges.push((
                Edge::new(source, RelationshipKind::from_spdx(kind), target),
                &relationship.extra,
            ));
        }

        let metadata = Self::convert_metadata(&doc);
        let mut document = match described.len() {
            0 => {
                return Err(SbomMergeError::missing_field(
                    "DESCRIBES relationship",
                    "SPDX document",
                ))
            }
            1 => {
                let root_id = &described[0];
                let position = nodes
                    .iter()
                    .position(|n| &n.id == root_id)
                    .ok_or_else(|| {
                        SbomMergeError::invalid_value(
                            "relationships",
                            format!("document describes unknown element '{root_id}'"),
                        )
                    })?;
                let root = nodes.remove(position);
                Document::new(metadata, root)
            }
            _ => {
                let name = doc.name.clone().unwrap_or_default();
                let root = self.synthetic_root(&name);
                let root_id = root.id.clone();
                let mut document = Document::new(metadata, root);
                for id in &described {
                    document.add_edge(Edge::new(
                        root_id.clone(),
                        RelationshipKind::Describes,
                        id.clone(),
                    ));
                }
                document
            }
        };

        for node in nodes {
            document.add_node(node);
        }
        for (edge, extra) in edges {
            document.add_edge_with_extra(edge, extra);
        }

        document.validate().context("SPDX graph")?;
        Ok(document)
    }

    fn serialize(&self, document: &Document, indent: usize) -> Result<String> {
        document.validate()?;
        let metadata = &document.metadata;
        let document_id = metadata
            .document_id
            .clone()
            .unwrap_or_else(|| DOCUMENT_ID.to_string());
        let date = metadata.created.clone().unwrap_or_else(spdx_timestamp_now);

        let mut packages = Vec::new();
        let mut files = Vec::new();
        for node in document.nodes() {
            match node.kind {
                ElementKind::Package => packages.push(self.package_to_wire(node, &date)),
                ElementKind::File => files.push(self.file_to_wire(node, &date)),
            }
        }

        let mut relationships = vec![SpdxRelationship {
            spdx_element_id: document_id.clone(),
            relationship_type: "DESCRIBES".to_string(),
            related_spdx_element: document.root_id().to_string(),
            extra: Map::new(),
        }];
        relationships.extend(document.edges().map(|edge| SpdxRelationship {
            spdx_element_id: edge.source.to_string(),
            relationship_type: edge.kind.spdx_name().to_string(),
            related_spdx_element: edge.target.to_string(),
            extra: document.edge_extra(edge).cloned().unwrap_or_default(),
        }));

        let doc = SpdxDocument {
            spdx_version: metadata.spec_version.clone(),
            spdx_id: document_id,
            name: metadata.name.clone(),
            document_namespace: metadata.namespace.clone(),
            creation_info: Some(SpdxCreationInfo {
                created: metadata.created.clone(),
                creators: metadata.creators.iter().map(format_creator).collect(),
                extra: metadata.creation_extra.clone(),
            }),
            document_describes: Vec::new(),
            packages,
            files,
            relationships,
            extra: metadata.extra.clone(),
        };

        super::to_json_string(&doc, indent)
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let trimmed = content.trim_start();
        if !trimmed.starts_with('{') {
            return FormatDetection::no_match();
        }

        let has_spdx_version = content.contains("\"spdxVersion\"");
        let has_spdx_id = content.contains("\"SPDXID\"");
        let has_data_license = content.contains("\"dataLicense\"");

        let detection = if has_spdx_version && has_spdx_id {
            FormatDetection::with_confidence(FormatConfidence::CERTAIN)
        } else if has_spdx_version || (has_spdx_id && has_data_license) {
            FormatDetection::with_confidence(FormatConfidence::HIGH)
        } else if content.contains("\"packages\"") && has_data_license {
            FormatDetection::with_confidence(FormatConfidence::MEDIUM)
                .warning("Missing spdxVersion field - might not be SPDX")
        } else {
            return FormatDetection::no_match();
        };

        match Self::extract_json_version(content) {
            Some(v) => detection.version(&v),
            None => detection,
        }
    }

    fn synthetic_root(&self, name: &str) -> Node {
        let mut root = Node::new(SYNTHETIC_ROOT_ID, name);
        root.extra.insert(
            "downloadLocation".to_string(),
            Value::String(NOASSERTION.to_string()),
        );
        root
    }

    fn is_synthetic_root(&self, node: &Node) -> bool {
        node.id.as_str() == SYNTHETIC_ROOT_ID && node.purl.is_none()
    }

    fn supported_versions(&self) -> Vec<&str> {
        vec!["SPDX-2.2", "SPDX-2.3"]
    }
}

// ============================================================================
// SPDX JSON wire structures
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxDocument {
    spdx_version: String,
    #[serde(rename = "SPDXID", default = "default_document_id")]
    spdx_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creation_info: Option<SpdxCreationInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    document_describes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    packages: Vec<SpdxPackage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    files: Vec<SpdxFile>,
    #[serde(default)]
    relationships: Vec<SpdxRelationship>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn default_document_id() -> String {
    DOCUMENT_ID.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct SpdxCreationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(default)]
    creators: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxPackage {
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    primary_package_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    checksums: Vec<SpdxChecksum>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    external_refs: Vec<SpdxExternalRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxFile {
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    #[serde(default)]
    file_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    checksums: Vec<SpdxChecksum>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxChecksum {
    algorithm: String,
    checksum_value: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxExternalRef {
    reference_category: String,
    reference_type: String,
    reference_locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxAnnotation {
    annotator: String,
    annotation_date: String,
    annotation_type: String,
    comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxRelationship {
    spdx_element_id: String,
    relationship_type: String,
    related_spdx_element: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}
