//! CycloneDX JSON adapter.
//!
//! Supports CycloneDX 1.4, 1.5 and 1.6. Graph mapping:
//!
//! - `metadata.component` is the root node
//! - nested `components` of any component are `Describes` edges parent → child
//! - `dependencies[]` are `DependsOn` edges (`Contains` edges are written there too)
//! - `formulation[].components` are `BuildToolOf` edges to the root, or to
//!   the components a formula names with `sbom-merge:formulation:subject`
//!   properties

use super::take_first;
use super::traits::{FormatConfidence, FormatDetection, SbomAdapter};
use crate::error::{ErrorContext, FormatErrorKind, Result, SbomMergeError};
use crate::model::{
    Creator, CreatorKind, Document, DocumentMetadata, Edge, ElementKind, ExternalReference, Hash,
    HashAlgorithm, Node, NodeId, RelationshipKind, SbomFormat, ToolStyle,
};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// `bom-ref` of the root created when several documents are merged
pub const SYNTHETIC_ROOT_REF: &str = "sbom-merge:synthetic-root";

const FORMULATION_KEY: &str = "formulation";

/// Formula property naming a component its build tools were used for
pub const FORMULATION_SUBJECT_PROPERTY: &str = "sbom-merge:formulation:subject";

/// Adapter for CycloneDX JSON
#[derive(Debug, Clone, Default)]
pub struct CycloneDxAdapter;

impl CycloneDxAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn convert_metadata(
        bom: &CycloneDxBom,
        wire: &CdxMetadata,
        leftovers: Vec<Value>,
    ) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::new(SbomFormat::CycloneDx, bom.spec_version.clone());
        metadata.namespace.clone_from(&bom.serial_number);
        metadata.created.clone_from(&wire.timestamp);
        metadata.creation_extra = wire.extra.clone();
        metadata.extra = bom.extra.clone();

        match &wire.tools {
            Some(CdxTools::Legacy(tools)) => {
                metadata.tool_style = Some(ToolStyle::Legacy);
                metadata.creators = tools
                    .iter()
                    .map(|tool| creator_from_map(CreatorKind::Tool, tool))
                    .collect();
            }
            Some(CdxTools::Structured(set)) => {
                metadata.tool_style = Some(ToolStyle::Structured);
                metadata.creators = set
                    .components
                    .iter()
                    .map(|tool| creator_from_map(CreatorKind::Tool, tool))
                    .chain(
                        set.services
                            .iter()
                            .map(|service| creator_from_map(CreatorKind::Service, service)),
                    )
                    .collect();
            }
            None => {}
        }

        if !leftovers.is_empty() {
            metadata
                .extra
                .insert(FORMULATION_KEY.to_string(), Value::Array(leftovers));
        }

        metadata
    }

    fn convert_component(id: NodeId, wire: &CdxComponent) -> Node {
        let mut node = Node::new(id, wire.name.clone());
        node.version.clone_from(&wire.version);
        node.purl.clone_from(&wire.purl);
        node.component_type.clone_from(&wire.component_type);
        node.kind = ElementKind::Package;
        node.hashes = wire
            .hashes
            .iter()
            .map(|h| Hash::new(HashAlgorithm::parse(&h.alg), h.content.clone()))
            .collect();
        node.external_refs = wire
            .external_references
            .iter()
            .map(|r| ExternalReference {
                kind: r.ref_type.clone(),
                locator: r.url.clone(),
                category: None,
                comment: r.comment.clone(),
            })
            .collect();
        for property in &wire.properties {
            node.properties
                .entry(property.name.clone())
                .or_default()
                .push(property.value.clone().unwrap_or_default());
        }
        node.wire_properties = wire
            .properties
            .iter()
            .filter_map(|property| serde_json::to_value(property).ok())
            .collect();
        node.extra = wire.extra.clone();
        node
    }

    fn node_to_wire(node: &Node) -> CdxComponent {
        CdxComponent {
            bom_ref: Some(node.id.to_string()),
            component_type: node.component_type.clone(),
            name: node.name.clone(),
            version: node.version.clone(),
            purl: node.purl.clone(),
            hashes: node
                .hashes
                .iter()
                .map(|h| CdxHash {
                    alg: h.algorithm.cyclonedx_name(),
                    content: h.value.clone(),
                })
                .collect(),
            external_references: node
                .external_refs
                .iter()
                .map(|r| CdxExternalReference {
                    ref_type: r.kind.clone(),
                    url: r.locator.clone(),
                    comment: r.comment.clone(),
                })
                .collect(),
            properties: properties_to_wire(node),
            components: Vec::new(),
            extra: node.extra.clone(),
        }
    }

    fn tools_to_wire(metadata: &DocumentMetadata) -> Option<CdxTools> {
        if metadata.creators.is_empty() && metadata.tool_style.is_none() {
            return None;
        }
        let style = metadata.tool_style.unwrap_or_else(|| {
            if metadata.spec_version.as_str() < "1.5" {
                ToolStyle::Legacy
            } else {
                ToolStyle::Structured
            }
        });
        match style {
            ToolStyle::Legacy => Some(CdxTools::Legacy(
                metadata.creators.iter().map(creator_to_map).collect(),
            )),
            ToolStyle::Structured => {
                let (services, components): (Vec<&Creator>, Vec<&Creator>) = metadata
                    .creators
                    .iter()
                    .partition(|c| c.kind == CreatorKind::Service);
                Some(CdxTools::Structured(CdxToolSet {
                    components: components.into_iter().map(creator_to_map).collect(),
                    services: services.into_iter().map(creator_to_map).collect(),
                }))
            }
        }
    }

    fn extract_json_version(content: &str) -> Option<String> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        PATTERN
            .get_or_init(|| Regex::new(r#""specVersion"\s*:\s*"([^"]+)""#).ok())
            .as_ref()?
            .captures(content)
            .map(|c| c[1].to_string())
    }
}

/// Properties as read for values still present, then one new entry per
/// value added since
fn properties_to_wire(node: &Node) -> Vec<CdxProperty> {
    let mut pending: Vec<(&str, &str)> = node
        .properties
        .iter()
        .flat_map(|(name, values)| values.iter().map(move |value| (name.as_str(), value.as_str())))
        .collect();
    let mut properties: Vec<CdxProperty> = node
        .wire_properties
        .iter()
        .filter_map(|original| serde_json::from_value::<CdxProperty>(original.clone()).ok())
        .filter(|property| {
            let value = property.value.as_deref().unwrap_or_default();
            take_first(&mut pending, |(n, v)| *n == property.name && *v == value)
        })
        .collect();
    properties.extend(pending.into_iter().map(|(name, value)| CdxProperty {
        name: name.to_string(),
        value: Some(value.to_string()),
    }));
    properties
}

/// A wire component flattened out of the nested tree
struct FlatComponent<'a> {
    wire: &'a CdxComponent,
    parent: Option<usize>,
    /// Index of the formula listing this component as a build tool
    formula: Option<usize>,
}

fn flatten<'a>(
    wire: &'a CdxComponent,
    parent: Option<usize>,
    formula: Option<usize>,
    out: &mut Vec<FlatComponent<'a>>,
) {
    let index = out.len();
    out.push(FlatComponent {
        wire,
        parent,
        formula,
    });
    for child in &wire.components {
        flatten(child, Some(index), None, out);
    }
}

/// Split a formula's unmodeled fields into the subjects it names and the rest
fn formula_subjects(extra: &Map<String, Value>) -> (Vec<NodeId>, Map<String, Value>) {
    let mut rest = extra.clone();
    let mut subjects = Vec::new();
    if let Some(Value::Array(properties)) = rest.shift_remove("properties") {
        let others: Vec<Value> = properties
            .into_iter()
            .filter(|property| {
                let name = property.get("name").and_then(Value::as_str);
                match (name, property.get("value").and_then(Value::as_str)) {
                    (Some(FORMULATION_SUBJECT_PROPERTY), Some(subject)) => {
                        subjects.push(NodeId::from(subject));
                        false
                    }
                    _ => true,
                }
            })
            .collect();
        if !others.is_empty() {
            rest.insert("properties".to_string(), Value::Array(others));
        }
    }
    (subjects, rest)
}

/// Wire component for `id` with its `Describes` children nested inside.
///
/// Each node is emitted at most once; a second visit yields `None`.
fn nest_component<'d>(
    document: &'d Document,
    id: &NodeId,
    children: &IndexMap<&'d NodeId, Vec<&'d NodeId>>,
    emitted: &mut HashSet<&'d NodeId>,
) -> Option<CdxComponent> {
    let node = document.find_node(id)?;
    if !emitted.insert(&node.id) {
        return None;
    }
    let mut wire = CycloneDxAdapter::node_to_wire(node);
    if let Some(kids) = children.get(&node.id) {
        wire.components = kids
            .iter()
            .filter_map(|kid| nest_component(document, kid, children, emitted))
            .collect();
    }
    Some(wire)
}

/// Deterministic id for a component without `bom-ref`
fn generated_ref(wire: &CdxComponent) -> String {
    if let Some(purl) = &wire.purl {
        return purl.clone();
    }
    match (&wire.version, wire.name.is_empty()) {
        (Some(version), false) => format!("{}@{version}", wire.name),
        (None, false) => wire.name.clone(),
        _ => "component".to_string(),
    }
}

fn creator_from_map(kind: CreatorKind, map: &Map<String, Value>) -> Creator {
    let mut extra = map.clone();
    let name = match extra.remove("name") {
        Some(Value::String(name)) => name,
        Some(other) => {
            extra.insert("name".to_string(), other);
            String::new()
        }
        None => String::new(),
    };
    let version = match extra.remove("version") {
        Some(Value::String(version)) => Some(version),
        Some(other) => {
            extra.insert("version".to_string(), other);
            None
        }
        None => None,
    };
    Creator {
        kind,
        name,
        version,
        extra,
    }
}

fn creator_to_map(creator: &Creator) -> Map<String, Value> {
    let mut map = creator.extra.clone();
    map.insert("name".to_string(), Value::String(creator.name.clone()));
    if let Some(version) = &creator.version {
        map.insert("version".to_string(), Value::String(version.clone()));
    }
    map
}

fn unrepresentable(kind: &str) -> SbomMergeError {
    SbomMergeError::format(
        "serializing CycloneDX",
        FormatErrorKind::UnrepresentableRelationship {
            format: SbomFormat::CycloneDx.to_string(),
            kind: kind.to_string(),
        },
    )
}

impl SbomAdapter for CycloneDxAdapter {
    fn format(&self) -> SbomFormat {
        SbomFormat::CycloneDx
    }

    fn parse_str(&self, content: &str) -> Result<Document> {
        let bom: CycloneDxBom = serde_json::from_str(content).context("parsing CycloneDX BOM")?;
        if bom.bom_format != "CycloneDX" {
            return Err(SbomMergeError::invalid_value(
                "bomFormat",
                format!("expected 'CycloneDX', found '{}'", bom.bom_format),
            ));
        }
        let wire_metadata = bom
            .metadata
            .as_ref()
            .ok_or_else(|| SbomMergeError::missing_field("metadata", "CycloneDX BOM"))?;
        let root_wire = wire_metadata
            .component
            .as_ref()
            .ok_or_else(|| SbomMergeError::missing_field("metadata.component", "CycloneDX BOM"))?;

        let mut flat = Vec::new();
        flatten(root_wire, None, None, &mut flat);
        for component in &bom.components {
            flatten(component, None, None, &mut flat);
        }
        for (index, formula) in bom.formulation.iter().enumerate() {
            for component in &formula.components {
                flatten(component, None, Some(index), &mut flat);
            }
        }
        let (subjects, leftovers): (Vec<Vec<NodeId>>, Vec<Value>) = bom
            .formulation
            .iter()
            .map(|formula| {
                let (subjects, rest) = formula_subjects(&formula.extra);
                (subjects, Value::Object(rest))
            })
            .unzip();
        let leftovers: Vec<Value> = leftovers
            .into_iter()
            .filter(|rest| rest.as_object().is_some_and(|map| !map.is_empty()))
            .collect();

        // Generated refs must not shadow an explicit bom-ref appearing later.
        let explicit: HashSet<&str> = flat
            .iter()
            .filter_map(|f| f.wire.bom_ref.as_deref())
            .collect();
        let mut taken: HashSet<String> = HashSet::new();
        let ids: Vec<NodeId> = flat
            .iter()
            .map(|f| {
                if let Some(bom_ref) = &f.wire.bom_ref {
                    taken.insert(bom_ref.clone());
                    return NodeId::from(bom_ref.as_str());
                }
                let base = generated_ref(f.wire);
                let mut candidate = base.clone();
                let mut n = 0;
                while explicit.contains(candidate.as_str()) || taken.contains(&candidate) {
                    n += 1;
                    candidate = format!("{base}-{n}");
                }
                taken.insert(candidate.clone());
                NodeId::from(candidate)
            })
            .collect();

        let metadata = Self::convert_metadata(&bom, wire_metadata, leftovers);
        let root_id = ids[0].clone();
        let mut document = Document::new(
            metadata,
            Self::convert_component(root_id.clone(), root_wire),
        );

        for (index, component) in flat.iter().enumerate().skip(1) {
            let id = ids[index].clone();
            if !document.add_node(Self::convert_component(id.clone(), component.wire)) {
                tracing::debug!("Duplicate bom-ref '{}' folded into one component", id);
            }
            if let Some(parent) = component.parent {
                document.add_edge(Edge::new(
                    ids[parent].clone(),
                    RelationshipKind::Describes,
                    id.clone(),
                ));
            }
            if let Some(formula) = component.formula {
                match subjects[formula].as_slice() {
                    [] => {
                        document.add_edge(Edge::new(
                            id,
                            RelationshipKind::BuildToolOf,
                            root_id.clone(),
                        ));
                    }
                    targets => {
                        for target in targets {
                            document.add_edge(Edge::new(
                                id.clone(),
                                RelationshipKind::BuildToolOf,
                                target.clone(),
                            ));
                        }
                    }
                }
            }
        }

        for dependency in &bom.dependencies {
            for target in &dependency.depends_on {
                document.add_edge(Edge::new(
                    dependency.reference.as_str(),
                    RelationshipKind::DependsOn,
                    target.as_str(),
                ));
            }
        }

        document.validate().context("CycloneDX graph")?;
        Ok(document)
    }

    fn serialize(&self, document: &Document, indent: usize) -> Result<String> {
        document.validate()?;
        let root_id = document.root_id();

        let mut children: IndexMap<&NodeId, Vec<&NodeId>> = IndexMap::new();
        let mut described: HashMap<&NodeId, &NodeId> = HashMap::new();
        let mut build_targets: IndexMap<&NodeId, Vec<&NodeId>> = IndexMap::new();
        let mut dependencies: IndexMap<&NodeId, IndexSet<&NodeId>> = IndexMap::new();

        for edge in document.edges() {
            match &edge.kind {
                RelationshipKind::Describes => {
                    if &edge.target == root_id || described.contains_key(&edge.target) {
                        return Err(unrepresentable(&format!(
                            "second DESCRIBES parent for '{}'",
                            edge.target
                        )));
                    }
                    described.insert(&edge.target, &edge.source);
                    children.entry(&edge.source).or_default().push(&edge.target);
                }
                RelationshipKind::BuildToolOf => {
                    build_targets.entry(&edge.source).or_default().push(&edge.target);
                }
                RelationshipKind::DependsOn | RelationshipKind::Contains => {
                    dependencies
                        .entry(&edge.source)
                        .or_default()
                        .insert(&edge.target);
                }
                RelationshipKind::Other(kind) => return Err(unrepresentable(kind)),
            }
        }
        if let Some(id) = build_targets.keys().find(|id| described.contains_key(*id)) {
            return Err(unrepresentable(&format!(
                "BUILD_TOOL_OF from nested component '{id}'"
            )));
        }

        let mut emitted: HashSet<&NodeId> = HashSet::new();
        let root_wire = nest_component(document, root_id, &children, &mut emitted);
        let top_level: Vec<&NodeId> = document
            .nodes()
            .map(|n| &n.id)
            .filter(|id| {
                *id != root_id && !described.contains_key(*id) && !build_targets.contains_key(*id)
            })
            .collect();
        let components: Vec<CdxComponent> = top_level
            .into_iter()
            .filter_map(|id| nest_component(document, id, &children, &mut emitted))
            .collect();

        // One formula per distinct set of build subjects; the root alone
        // needs no subject properties.
        let mut groups: IndexMap<Vec<&NodeId>, Vec<&NodeId>> = IndexMap::new();
        for (tool, targets) in &build_targets {
            let mut targets = targets.clone();
            targets.sort();
            groups.entry(targets).or_default().push(*tool);
        }
        let mut formulation = Vec::new();
        for (targets, tools) in groups {
            let tool_components: Vec<CdxComponent> = tools
                .into_iter()
                .filter_map(|id| nest_component(document, id, &children, &mut emitted))
                .collect();
            let mut extra = Map::new();
            if !(targets.len() == 1 && targets[0] == root_id) {
                let properties = targets
                    .iter()
                    .map(|target| {
                        json!({"name": FORMULATION_SUBJECT_PROPERTY, "value": target.as_str()})
                    })
                    .collect();
                extra.insert("properties".to_string(), Value::Array(properties));
            }
            formulation.push(CdxFormula {
                components: tool_components,
                extra,
            });
        }

        if emitted.len() != document.node_count() {
            return Err(unrepresentable("cyclic DESCRIBES chain"));
        }

        let mut extra = document.metadata.extra.clone();
        if let Some(Value::Array(leftovers)) = extra.shift_remove(FORMULATION_KEY) {
            formulation.extend(leftovers.into_iter().filter_map(|v| match v {
                Value::Object(extra) => Some(CdxFormula {
                    components: Vec::new(),
                    extra,
                }),
                _ => None,
            }));
        }

        let bom = CycloneDxBom {
            bom_format: "CycloneDX".to_string(),
            spec_version: document.metadata.spec_version.clone(),
            serial_number: document.metadata.namespace.clone(),
            metadata: Some(CdxMetadata {
                timestamp: document.metadata.created.clone(),
                tools: Self::tools_to_wire(&document.metadata),
                component: root_wire,
                extra: document.metadata.creation_extra.clone(),
            }),
            components,
            dependencies: dependencies
                .into_iter()
                .map(|(source, targets)| CdxDependency {
                    reference: source.to_string(),
                    depends_on: targets.into_iter().map(ToString::to_string).collect(),
                })
                .collect(),
            formulation,
            extra,
        };

        super::to_json_string(&bom, indent)
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let trimmed = content.trim_start();
        if !trimmed.starts_with('{') {
            return FormatDetection::no_match();
        }

        let has_bom_format = content.contains("\"bomFormat\"");
        let has_cyclonedx = content.contains("CycloneDX") || content.contains("cyclonedx");
        let has_spec_version = content.contains("\"specVersion\"");
        let version = Self::extract_json_version(content);

        let detection = if has_bom_format && has_cyclonedx {
            FormatDetection::with_confidence(FormatConfidence::CERTAIN)
        } else if has_bom_format {
            FormatDetection::with_confidence(FormatConfidence::HIGH)
        } else if has_spec_version && content.contains("\"components\"") {
            FormatDetection::with_confidence(FormatConfidence::MEDIUM)
                .warning("Missing bomFormat field - might not be CycloneDX")
        } else {
            return FormatDetection::no_match();
        };

        match version {
            Some(v) => detection.version(&v),
            None => detection,
        }
    }

    fn synthetic_root(&self, name: &str) -> Node {
        Node::new(SYNTHETIC_ROOT_REF, name).with_type("application")
    }

    fn is_synthetic_root(&self, node: &Node) -> bool {
        node.id.as_str() == SYNTHETIC_ROOT_REF && node.purl.is_none()
    }

    fn supported_versions(&self) -> Vec<&str> {
        vec!["1.4", "1.5", "1.6"]
    }
}

// ============================================================================
// CycloneDX JSON wire structures
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CycloneDxBom {
    bom_format: String,
    spec_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<CdxMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    components: Vec<CdxComponent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<CdxDependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    formulation: Vec<CdxFormula>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tools: Option<CdxTools>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    component: Option<CdxComponent>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// `metadata.tools`: a 1.4 array or a 1.5+ object
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CdxTools {
    Legacy(Vec<Map<String, Value>>),
    Structured(CdxToolSet),
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxToolSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    components: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    services: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CdxComponent {
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    bom_ref: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    component_type: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purl: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hashes: Vec<CdxHash>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    external_references: Vec<CdxExternalReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    properties: Vec<CdxProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    components: Vec<CdxComponent>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CdxHash {
    alg: String,
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CdxExternalReference {
    #[serde(rename = "type")]
    ref_type: String,
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CdxProperty {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxDependency {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "dependsOn", default, skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxFormula {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    components: Vec<CdxComponent>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOM: &str = r#"{
        "bomFormat": "CycloneDX",
        "specVersion": "1.5",
        "serialNumber": "urn:uuid:1b4e28ba-2fa1-11d2-883f-0016d3cca427",
        "version": 1,
        "metadata": {
            "timestamp": "2024-05-01T10:00:00Z",
            "tools": {"components": [{"type": "application", "name": "syft", "version": "1.4.1"}]},
            "component": {"bom-ref": "app", "type": "container", "name": "app", "purl": "pkg:oci/app@sha256%3Aaaa"}
        },
        "components": [
            {"bom-ref": "x", "type": "library", "name": "x", "version": "1.0", "purl": "pkg:golang/x@1.0",
             "licenses": [{"license": {"id": "MIT"}}],
             "properties": [{"name": "syft:package:foundBy", "value": "go-module-binary-cataloger"}]},
            {"type": "file", "name": "/etc/os-release"}
        ],
        "dependencies": [{"ref": "app", "dependsOn": ["x"]}]
    }"#;

    #[test]
    fn test_parse_basic_bom() {
        let doc = CycloneDxAdapter::new().parse_str(BOM).unwrap();
        assert_eq!(doc.root_id().as_str(), "app");
        assert_eq!(doc.node_count(), 3);
        assert_eq!(doc.metadata.spec_version, "1.5");
        assert_eq!(doc.metadata.tool_style, Some(ToolStyle::Structured));
        assert_eq!(doc.metadata.creators[0].name, "syft");
        assert_eq!(doc.metadata.extra["version"], 1);

        let x = doc.find_node(&NodeId::from("x")).unwrap();
        assert_eq!(x.purl.as_deref(), Some("pkg:golang/x@1.0"));
        assert_eq!(x.property("syft:package:foundBy"), ["go-module-binary-cataloger"]);
        assert!(x.extra.contains_key("licenses"));

        // Component without bom-ref gets its name as id
        assert!(doc.find_node(&NodeId::from("/etc/os-release")).is_some());
        assert!(doc.contains_edge(&Edge::new("app", RelationshipKind::DependsOn, "x")));
    }

    #[test]
    fn test_missing_root_is_format_error() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5", "metadata": {}, "components": []}"#;
        let err = CycloneDxAdapter::new().parse_str(content).unwrap_err();
        assert!(matches!(
            err,
            SbomMergeError::Format {
                source: FormatErrorKind::MissingField { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_dangling_dependency_is_format_error() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5",
            "metadata": {"component": {"bom-ref": "app", "name": "app"}},
            "dependencies": [{"ref": "app", "dependsOn": ["ghost"]}]}"#;
        let err = CycloneDxAdapter::new().parse_str(content).unwrap_err();
        assert!(matches!(
            err,
            SbomMergeError::Format {
                source: FormatErrorKind::DanglingEdge { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_generated_refs_avoid_explicit_ones() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.4",
            "metadata": {"component": {"bom-ref": "root", "name": "root"}},
            "components": [
                {"name": "a", "version": "1"},
                {"bom-ref": "a@1", "name": "other"}
            ]}"#;
        let doc = CycloneDxAdapter::new().parse_str(content).unwrap();
        assert_eq!(doc.node_count(), 3);
        assert_eq!(doc.find_node(&NodeId::from("a@1")).unwrap().name, "other");
        assert_eq!(doc.find_node(&NodeId::from("a@1-1")).unwrap().name, "a");
    }

    #[test]
    fn test_nested_components_and_formulation() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5",
            "metadata": {"component": {"bom-ref": "root", "name": "merged",
                "components": [{"bom-ref": "a", "name": "a"}, {"bom-ref": "b", "name": "b"}]}},
            "formulation": [{"components": [{"type": "container", "name": "registry.io/ubi9",
                "purl": "pkg:oci/ubi9@sha256%3Abbb?repository_url=registry.io/ubi9",
                "properties": [{"name": "konflux:container:is_base_image", "value": "true"}]}]},
                {"bom-ref": "workflow-1", "workflows": []}]}"#;
        let adapter = CycloneDxAdapter::new();
        let doc = adapter.parse_str(content).unwrap();

        assert!(doc.contains_edge(&Edge::new("root", RelationshipKind::Describes, "a")));
        assert!(doc.contains_edge(&Edge::new("root", RelationshipKind::Describes, "b")));
        let base = NodeId::from("pkg:oci/ubi9@sha256%3Abbb?repository_url=registry.io/ubi9");
        assert!(doc.contains_edge(&Edge::new(base, RelationshipKind::BuildToolOf, "root")));

        let text = adapter.serialize(&doc, 2).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["metadata"]["component"]["components"].as_array().unwrap().len(), 2);
        assert_eq!(value["formulation"].as_array().unwrap().len(), 2);
        assert_eq!(value["formulation"][1]["bom-ref"], "workflow-1");
        assert!(value.get("components").is_none());

        assert_eq!(adapter.parse_str(&text).unwrap(), doc);
    }

    #[test]
    fn test_build_tools_of_nested_components() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5",
            "metadata": {"component": {"bom-ref": "root", "name": "merged",
                "components": [{"bom-ref": "app", "name": "app"}, {"bom-ref": "other", "name": "other"}]}}}"#;
        let adapter = CycloneDxAdapter::new();
        let mut doc = adapter.parse_str(content).unwrap();
        doc.add_node(Node::new("ubi9", "registry.io/ubi9"));
        doc.add_node(Node::new("golang", "registry.io/golang"));
        doc.add_edge(Edge::new("ubi9", RelationshipKind::BuildToolOf, "app"));
        doc.add_edge(Edge::new("ubi9", RelationshipKind::BuildToolOf, "other"));
        doc.add_edge(Edge::new("golang", RelationshipKind::BuildToolOf, "root"));

        let text = adapter.serialize(&doc, 2).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let formulation = value["formulation"].as_array().unwrap();
        assert_eq!(formulation.len(), 2);
        assert_eq!(formulation[0]["properties"][0]["name"], FORMULATION_SUBJECT_PROPERTY);
        assert_eq!(formulation[0]["properties"][0]["value"], "app");
        assert_eq!(formulation[0]["properties"][1]["value"], "other");
        assert!(formulation[1].get("properties").is_none());

        let reread = adapter.parse_str(&text).unwrap();
        assert_eq!(reread, doc);
        assert!(reread.metadata.extra.get("formulation").is_none());
    }

    #[test]
    fn test_valueless_property_stays_valueless() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5",
            "metadata": {"component": {"bom-ref": "r", "name": "r",
                "properties": [{"name": "b", "value": "1"}, {"name": "flag"}, {"name": "a", "value": "2"},
                               {"name": "b", "value": "3"}]}}}"#;
        let adapter = CycloneDxAdapter::new();
        let mut doc = adapter.parse_str(content).unwrap();
        assert_eq!(doc.root().unwrap().property("flag"), [""]);

        let input: Value = serde_json::from_str(content).unwrap();
        let output: Value = serde_json::from_str(&adapter.serialize(&doc, 2).unwrap()).unwrap();
        assert_eq!(
            output["metadata"]["component"]["properties"],
            input["metadata"]["component"]["properties"]
        );

        doc.find_node_mut(&NodeId::from("r")).unwrap().add_property("flag", "on");
        let output: Value = serde_json::from_str(&adapter.serialize(&doc, 2).unwrap()).unwrap();
        let properties = output["metadata"]["component"]["properties"].as_array().unwrap();
        assert_eq!(properties.len(), 5);
        assert!(properties[1].get("value").is_none());
        assert_eq!(properties[4], json!({"name": "flag", "value": "on"}));
    }

    #[test]
    fn test_round_trip() {
        let adapter = CycloneDxAdapter::new();
        let doc = adapter.parse_str(BOM).unwrap();
        let text = adapter.serialize(&doc, 0).unwrap();
        assert_eq!(adapter.parse_str(&text).unwrap(), doc);
    }

    #[test]
    fn test_legacy_tools_preserved() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.4",
            "metadata": {"tools": [{"vendor": "anchore", "name": "syft", "version": "0.90.0"}],
                         "component": {"bom-ref": "r", "name": "r"}}}"#;
        let adapter = CycloneDxAdapter::new();
        let doc = adapter.parse_str(content).unwrap();
        assert_eq!(doc.metadata.tool_style, Some(ToolStyle::Legacy));
        assert_eq!(doc.metadata.creators[0].extra["vendor"], "anchore");

        let value: Value = serde_json::from_str(&adapter.serialize(&doc, 2).unwrap()).unwrap();
        assert_eq!(value["metadata"]["tools"][0]["vendor"], "anchore");
        assert_eq!(value["metadata"]["tools"][0]["version"], "0.90.0");
    }

    #[test]
    fn test_other_relationship_rejected() {
        let adapter = CycloneDxAdapter::new();
        let mut doc = adapter.parse_str(BOM).unwrap();
        doc.add_edge(Edge::new(
            "x",
            RelationshipKind::Other("VARIANT_OF".to_string()),
            "app",
        ));
        assert!(adapter.serialize(&doc, 2).is_err());
    }

    #[test]
    fn test_detect() {
        let adapter = CycloneDxAdapter::new();
        let detection = adapter.detect(BOM);
        assert_eq!(detection.confidence, FormatConfidence::CERTAIN);
        assert_eq!(detection.version.as_deref(), Some("1.5"));

        let spdx = r#"{"spdxVersion": "SPDX-2.3", "SPDXID": "SPDXRef-DOCUMENT"}"#;
        assert!(!adapter.detect(spdx).confidence.can_parse());
    }
}
