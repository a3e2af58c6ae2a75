//! Container image references and the image-reference enrichment.

use super::{find_by_key, DocumentEnricher, EnrichmentStats};
use crate::error::{Result, SbomMergeError};
use crate::matching::{purl::oci_purl, resolver_key};
use crate::model::{Document, Edge, Hash, Node, NodeId, RelationshipKind, SbomFormat};
use serde_json::Value;

/// `SPDXID` of the image package added to SPDX documents
pub const IMAGE_SPDX_ID: &str = "SPDXRef-image";

/// A container image pinned by digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// `registry/namespace/name`, possibly with a registry port
    pub repository: String,
    /// Last path segment of the repository
    pub name: String,
    pub tag: Option<String>,
    /// `algorithm:hex`
    pub digest: String,
}

impl ImageReference {
    /// From `registry/repo/name:tag` and a separate `algorithm:hex` digest
    pub fn from_url_and_digest(url: &str, digest: &str) -> Result<Self> {
        let (repository, tag) = split_tag(url);
        let tag = tag.ok_or_else(|| {
            SbomMergeError::validation(format!(
                "image URL '{url}' has no tag, expected 'registry/repository:tag'"
            ))
        })?;
        Self::build(repository, Some(tag.to_string()), digest)
    }

    /// From `registry/repo/name:tag@algorithm:hex`
    pub fn from_pinned(reference: &str) -> Result<Self> {
        let (repository_with_tag, digest) = reference.split_once('@').ok_or_else(|| {
            SbomMergeError::validation(format!(
                "image reference '{reference}' is not pinned by digest"
            ))
        })?;
        let (repository, tag) = split_tag(repository_with_tag);
        Self::build(repository, tag.map(ToString::to_string), digest)
    }

    fn build(repository: &str, tag: Option<String>, digest: &str) -> Result<Self> {
        if Hash::from_digest(digest).is_none() {
            return Err(SbomMergeError::validation(format!(
                "invalid image digest '{digest}', expected 'algorithm:hex'"
            )));
        }
        let name = repository.rsplit('/').next().unwrap_or(repository);
        if name.is_empty() {
            return Err(SbomMergeError::validation(format!(
                "invalid image repository '{repository}'"
            )));
        }
        Ok(Self {
            repository: repository.to_string(),
            name: name.to_string(),
            tag,
            digest: digest.to_string(),
        })
    }

    /// `pkg:oci/<name>@<digest>?repository_url=<repository>`
    #[must_use]
    pub fn purl(&self) -> String {
        oci_purl(&self.name, &self.digest, &self.repository)
    }

    /// The digest as a hash
    #[must_use]
    pub fn hash(&self) -> Option<Hash> {
        Hash::from_digest(&self.digest)
    }

    /// `<repository>@<digest>`
    #[must_use]
    pub fn pinned_repository(&self) -> String {
        format!("{}@{}", self.repository, self.digest)
    }
}

/// Split off the tag from the right; a colon followed by a path is a
/// registry port, not a tag.
fn split_tag(reference: &str) -> (&str, Option<&str>) {
    match reference.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, Some(tag)),
        _ => (reference, None),
    }
}

/// Fill the SPDX package fields every image package carries
pub(crate) fn mark_noassertion(node: &mut Node, fields: &[&str]) {
    for field in fields {
        node.extra
            .entry((*field).to_string())
            .or_insert_with(|| Value::String("NOASSERTION".to_string()));
    }
}

/// Makes an image the root of a document.
#[derive(Debug, Clone)]
pub struct ImageReferenceEnricher {
    image: ImageReference,
}

impl ImageReferenceEnricher {
    #[must_use]
    pub fn new(image: ImageReference) -> Self {
        Self { image }
    }

    fn image_node(&self, format: SbomFormat) -> Node {
        let purl = self.image.purl();
        let id = match format {
            SbomFormat::CycloneDx => purl.clone(),
            SbomFormat::Spdx => IMAGE_SPDX_ID.to_string(),
        };
        let mut node = Node::new(id, self.image.name.clone())
            .with_type("container")
            .with_purl(purl);
        node.version.clone_from(&self.image.tag);
        if let Some(hash) = self.image.hash() {
            node.add_hash(hash);
        }
        if format == SbomFormat::Spdx {
            mark_noassertion(&mut node, &["downloadLocation", "licenseConcluded", "supplier"]);
        }
        node
    }
}

impl DocumentEnricher for ImageReferenceEnricher {
    /// Insert the image node and make it the root.
    ///
    /// The previous root is removed when virtual (its edges move to the
    /// image); otherwise the image contains (SPDX) or depends on
    /// (CycloneDX) it. Running twice with the same image changes nothing.
    fn enrich(&self, document: &mut Document) -> Result<EnrichmentStats> {
        let mut stats = EnrichmentStats::default();
        let format = document.metadata.format;
        let mut node = self.image_node(format);
        let key = resolver_key(&node)?;

        let image_id = match find_by_key(document, &key)? {
            Some(existing) => {
                node.id = existing.clone();
                document.add_node(node);
                stats.nodes_updated += 1;
                existing
            }
            None => {
                node.id = document.unique_id(&node.id);
                let id = node.id.clone();
                document.add_node(node);
                stats.nodes_added += 1;
                id
            }
        };

        let old_root: NodeId = document.root_id().clone();
        if old_root != image_id {
            let virtual_root = document.root().is_some_and(Node::is_virtual);
            document.set_root(&image_id)?;
            if virtual_root {
                tracing::info!("Replacing virtual root {} with image {}", old_root, image_id);
                document.redirect_edges(&old_root, &image_id);
                document.remove_node(&old_root);
                stats.nodes_removed += 1;
            } else {
                let kind = match format {
                    SbomFormat::Spdx => RelationshipKind::Contains,
                    SbomFormat::CycloneDx => RelationshipKind::DependsOn,
                };
                if document.add_edge(Edge::new(image_id.clone(), kind, old_root)) {
                    stats.edges_added += 1;
                }
            }
        }

        if format == SbomFormat::Spdx {
            document.metadata.name = Some(self.image.pinned_repository());
        }
        Ok(stats)
    }

    fn name(&self) -> &'static str {
        "image reference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentMetadata, HashAlgorithm};

    const DIGEST: &str = "sha256:011ff0a7d6a2ac3e9ba3e5e14e0ab3f4a3a25b4d8c8fe4c6dc0c1e2b1c1a2b3c";

    fn image() -> ImageReference {
        ImageReference::from_url_and_digest("quay.io/foo/bar/ubi8:1.1", DIGEST).unwrap()
    }

    fn spdx_doc(root: Node) -> Document {
        let mut meta = DocumentMetadata::new(SbomFormat::Spdx, "SPDX-2.3");
        meta.name = Some("scan".to_string());
        Document::new(meta, root)
    }

    #[test]
    fn test_parse_image_url() {
        let image = image();
        assert_eq!(image.repository, "quay.io/foo/bar/ubi8");
        assert_eq!(image.name, "ubi8");
        assert_eq!(image.tag.as_deref(), Some("1.1"));
        assert_eq!(
            image.purl(),
            format!("pkg:oci/ubi8@sha256%3A{}?repository_url=quay.io/foo/bar/ubi8", &DIGEST[7..])
        );
    }

    #[test]
    fn test_registry_port_is_not_a_tag() {
        let pinned = ImageReference::from_pinned("localhost:5000/ns/app@sha256:abc").unwrap();
        assert_eq!(pinned.repository, "localhost:5000/ns/app");
        assert_eq!(pinned.tag, None);

        let tagged = ImageReference::from_pinned("localhost:5000/ns/app:v1@sha256:abc").unwrap();
        assert_eq!(tagged.repository, "localhost:5000/ns/app");
        assert_eq!(tagged.tag.as_deref(), Some("v1"));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(ImageReference::from_url_and_digest("quay.io/foo/bar", DIGEST).is_err());
        assert!(ImageReference::from_url_and_digest("quay.io/foo/bar:1", "011f").is_err());
        assert!(ImageReference::from_pinned("quay.io/foo/bar:1").is_err());
    }

    #[test]
    fn test_spdx_non_virtual_root_is_contained() {
        let mut doc = spdx_doc(Node::new("SPDXRef-app", "app").with_version("1"));
        let stats = ImageReferenceEnricher::new(image()).enrich(&mut doc).unwrap();

        assert_eq!(stats.nodes_added, 1);
        assert_eq!(doc.root_id().as_str(), IMAGE_SPDX_ID);
        assert!(doc.contains_edge(&Edge::new(
            IMAGE_SPDX_ID,
            RelationshipKind::Contains,
            "SPDXRef-app"
        )));
        let root = doc.root().unwrap();
        assert_eq!(root.hashes, vec![Hash::new(HashAlgorithm::Sha256, &DIGEST[7..])]);
        assert_eq!(root.extra["supplier"], "NOASSERTION");
        assert_eq!(
            doc.metadata.name.as_deref(),
            Some(format!("quay.io/foo/bar/ubi8@{DIGEST}").as_str())
        );
    }

    #[test]
    fn test_virtual_root_is_replaced() {
        let mut doc = spdx_doc(Node::new("SPDXRef-DocumentRoot-Directory", "./src"));
        doc.add_node(Node::new("SPDXRef-x", "x").with_version("1"));
        doc.add_edge(Edge::new(
            "SPDXRef-DocumentRoot-Directory",
            RelationshipKind::Contains,
            "SPDXRef-x",
        ));

        let stats = ImageReferenceEnricher::new(image()).enrich(&mut doc).unwrap();
        assert_eq!(stats.nodes_removed, 1);
        assert!(doc
            .find_node(&NodeId::from("SPDXRef-DocumentRoot-Directory"))
            .is_none());
        assert!(doc.contains_edge(&Edge::new(IMAGE_SPDX_ID, RelationshipKind::Contains, "SPDXRef-x")));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_cyclonedx_root_becomes_dependency() {
        let meta = DocumentMetadata::new(SbomFormat::CycloneDx, "1.5");
        let mut doc = Document::new(meta, Node::new("scan-root", "quay.io/foo/bar/ubi8").with_version("1.1"));
        ImageReferenceEnricher::new(image()).enrich(&mut doc).unwrap();

        let purl = image().purl();
        assert_eq!(doc.root_id().as_str(), purl);
        assert!(doc.contains_edge(&Edge::new(purl.as_str(), RelationshipKind::DependsOn, "scan-root")));
        assert_eq!(doc.metadata.name, None);
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let mut doc = spdx_doc(Node::new("SPDXRef-app", "app").with_version("1"));
        let enricher = ImageReferenceEnricher::new(image());
        enricher.enrich(&mut doc).unwrap();
        let once = doc.clone();

        let stats = enricher.enrich(&mut doc).unwrap();
        assert_eq!(stats.nodes_added, 0);
        assert_eq!(doc, once);
    }
}
