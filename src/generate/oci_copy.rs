//! SBOM for artifacts pushed by the oci-copy task.

use crate::error::{Result, SbomMergeError};
use crate::formats::spdx_timestamp_now;
use crate::matching::purl::Purl;
use crate::model::{
    Creator, Document, DocumentMetadata, Edge, ExternalReference, Hash, HashAlgorithm, Node,
    RelationshipKind, SbomFormat,
};
use crate::utils::{sanitize_spdx_id, sha256_hex};
use serde::Deserialize;
use serde_json::Value;

/// Name of the generated document and of the CycloneDX root component
pub const OCI_COPY_DOCUMENT_NAME: &str = "sbom-for-oci-copy-task";
/// `SPDXID` of the nameless package that contains every artifact
pub const UNKNOWN_ROOT_SPDX_ID: &str = "SPDXRef-DocumentRoot-Unknown";

/// One entry of `oci-copy.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artifact {
    pub source: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub sha256sum: String,
}

impl Artifact {
    /// `pkg:generic/<filename>?checksum=sha256:<sum>&download_url=<source>`
    #[must_use]
    pub fn purl(&self) -> String {
        Purl::new("generic", self.filename.clone())
            .with_qualifier("download_url", self.source.clone())
            .with_qualifier("checksum", format!("sha256:{}", self.sha256sum))
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct OciCopyFile {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

/// Read the artifact list from `oci-copy.yaml` content
pub fn parse_oci_copy(content: &str) -> Result<Vec<Artifact>> {
    let file: OciCopyFile = serde_yaml_ng::from_str(content)
        .map_err(|e| SbomMergeError::validation(format!("invalid oci-copy YAML: {e}")))?;
    Ok(file.artifacts)
}

/// Build the document describing the copied artifacts.
pub fn oci_copy_sbom(artifacts: &[Artifact], format: SbomFormat) -> Document {
    let (mut metadata, root) = match format {
        SbomFormat::CycloneDx => {
            let mut metadata = DocumentMetadata::new(format, "1.5");
            metadata.namespace = Some(format!("urn:uuid:{}", uuid::Uuid::new_v4()));
            metadata
                .extra
                .insert("version".to_string(), Value::from(1));
            let root = Node::new(OCI_COPY_DOCUMENT_NAME, OCI_COPY_DOCUMENT_NAME)
                .with_type("application");
            (metadata, root)
        }
        SbomFormat::Spdx => {
            let mut metadata = DocumentMetadata::new(format, "SPDX-2.3");
            metadata.name = Some(OCI_COPY_DOCUMENT_NAME.to_string());
            metadata.namespace = Some(format!(
                "https://konflux-ci.dev/spdxdocs/{OCI_COPY_DOCUMENT_NAME}/{}",
                uuid::Uuid::new_v4()
            ));
            metadata
                .extra
                .insert("dataLicense".to_string(), Value::from("CC0-1.0"));
            let mut root = Node::new(UNKNOWN_ROOT_SPDX_ID, "");
            root.extra
                .insert("downloadLocation".to_string(), Value::from("NOASSERTION"));
            (metadata, root)
        }
    };
    metadata.created = Some(spdx_timestamp_now());
    metadata.creators.push(Creator::tool("Konflux"));

    let mut document = Document::new(metadata, root);
    let root_id = document.root_id().clone();
    let kind = match format {
        SbomFormat::CycloneDx => RelationshipKind::DependsOn,
        SbomFormat::Spdx => RelationshipKind::Contains,
    };
    for artifact in artifacts {
        let node = artifact_node(artifact, format);
        let edge = Edge::new(root_id.clone(), kind.clone(), node.id.clone());
        if !document.add_node(node) {
            tracing::warn!("Artifact {} listed twice", artifact.filename);
        }
        document.add_edge(edge);
    }
    tracing::info!("Generated oci-copy SBOM with {} artifacts", artifacts.len());
    document
}

fn artifact_node(artifact: &Artifact, format: SbomFormat) -> Node {
    let purl = artifact.purl();
    let id = match format {
        SbomFormat::CycloneDx => purl.clone(),
        SbomFormat::Spdx => format!(
            "SPDXRef-Package-{}-{}",
            sanitize_spdx_id(&artifact.filename),
            sha256_hex(&purl)
        ),
    };
    let mut node = Node::new(id, artifact.filename.clone()).with_purl(purl);
    node.add_hash(Hash::new(HashAlgorithm::Sha256, artifact.sha256sum.clone()));
    match format {
        SbomFormat::CycloneDx => {
            node.component_type = Some("file".to_string());
            node.external_refs
                .push(ExternalReference::new("distribution", artifact.source.clone()));
        }
        SbomFormat::Spdx => {
            node.extra
                .insert("downloadLocation".to_string(), Value::from(artifact.source.clone()));
        }
    }
    node
}
