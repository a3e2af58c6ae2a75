//! SBOM for a multi-arch image index, built from `buildah manifest inspect`.

use crate::enrichment::ImageReference;
use crate::error::{Result, SbomMergeError};
use crate::formats::spdx_timestamp_now;
use crate::matching::purl::{oci_purl, Purl};
use crate::model::{
    Creator, Document, DocumentMetadata, Edge, ExternalReference, Hash, Node, NodeId,
    RelationshipKind, SbomFormat,
};
use crate::utils::sha256_hex;
use serde::Deserialize;
use serde_json::Value;

pub const IMAGE_INDEX_MEDIA_TYPE: &str = "application/vnd.oci.image.index.v1+json";
pub const IMAGE_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
/// `SPDXID` of the index package
pub const IMAGE_INDEX_SPDX_ID: &str = "SPDXRef-image-index";
const NAMESPACE_BASE: &str = "https://konflux-ci.dev/spdxdocs";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestInspect {
    media_type: String,
    #[serde(default)]
    manifests: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    media_type: String,
    digest: String,
    #[serde(default)]
    platform: Option<Platform>,
}

#[derive(Debug, Deserialize)]
struct Platform {
    architecture: Option<String>,
}

/// Build the SPDX document of an image index.
///
/// `inspect` is the JSON printed by `buildah manifest inspect`; only image
/// manifests are listed, other entries (attestations, nested indexes) are
/// ignored.
pub fn index_image_sbom(index_url: &str, index_digest: &str, inspect: &str) -> Result<Document> {
    let inspect: ManifestInspect = serde_json::from_str(inspect)
        .map_err(|e| SbomMergeError::validation(format!("invalid manifest inspect JSON: {e}")))?;
    if inspect.media_type != IMAGE_INDEX_MEDIA_TYPE {
        return Err(SbomMergeError::validation(format!(
            "expected `buildah manifest inspect` output with media type {IMAGE_INDEX_MEDIA_TYPE}, got {}",
            inspect.media_type
        )));
    }
    let index = ImageReference::from_url_and_digest(index_url, index_digest)?;
    let tag = index.tag.clone().unwrap_or_default();

    let mut metadata = DocumentMetadata::new(SbomFormat::Spdx, "SPDX-2.3");
    metadata.name = Some(index.pinned_repository());
    metadata.namespace = Some(format!(
        "{NAMESPACE_BASE}/{}-{}-{}",
        index.name,
        tag,
        uuid::Uuid::new_v4()
    ));
    metadata.created = Some(spdx_timestamp_now());
    metadata.creators.push(Creator::tool("Konflux"));
    metadata
        .creation_extra
        .insert("licenseListVersion".to_string(), Value::from("3.25"));
    metadata
        .extra
        .insert("dataLicense".to_string(), Value::from("CC0-1.0"));

    let root = image_package(IMAGE_INDEX_SPDX_ID, index.name.clone(), &tag, index.purl(), &index.digest)?;
    let mut document = Document::new(metadata, root);
    let root_id = NodeId::from(IMAGE_INDEX_SPDX_ID);

    for manifest in &inspect.manifests {
        if manifest.media_type != IMAGE_MANIFEST_MEDIA_TYPE {
            tracing::debug!("Skipping {} entry {}", manifest.media_type, manifest.digest);
            continue;
        }
        let arch = manifest.platform.as_ref().and_then(|p| p.architecture.clone());
        let own_purl = oci_purl(&index.name, &manifest.digest, &index.repository);
        let id = format!("SPDXRef-image-{}-{}", index.name, sha256_hex(&own_purl));

        let mut node = match &arch {
            Some(arch) => {
                let index_purl = Purl::new("oci", index.name.clone())
                    .with_version(index.digest.clone())
                    .with_qualifier("arch", arch.clone())
                    .with_qualifier("repository_url", index.repository.clone())
                    .to_string();
                let mut node = image_package(
                    id.as_str(),
                    format!("{}_{arch}", index.name),
                    &tag,
                    index_purl,
                    &manifest.digest,
                )?;
                let mut reference = ExternalReference::new("purl", own_purl);
                reference.category = Some("PACKAGE-MANAGER".to_string());
                node.external_refs.push(reference);
                node
            }
            None => image_package(id.as_str(), index.name.clone(), &tag, own_purl, &manifest.digest)?,
        };
        node.id = document.unique_id(&node.id);
        let edge = Edge::new(
            node.id.clone(),
            RelationshipKind::Other("VARIANT_OF".to_string()),
            root_id.clone(),
        );
        document.add_node(node);
        document.add_edge(edge);
    }

    tracing::info!(
        "Generated image index SBOM with {} image manifests",
        document.node_count() - 1
    );
    Ok(document)
}

fn image_package(id: &str, name: String, tag: &str, purl: String, digest: &str) -> Result<Node> {
    let hash = Hash::from_digest(digest).ok_or_else(|| {
        SbomMergeError::validation(format!("invalid digest '{digest}', expected 'algorithm:hex'"))
    })?;
    let mut node = Node::new(id, name).with_version(tag).with_purl(purl);
    node.add_hash(hash);
    for field in ["supplier", "downloadLocation", "licenseDeclared"] {
        node.extra.insert(field.to_string(), Value::from("NOASSERTION"));
    }
    Ok(node)
}
