//! Base-image enrichment: record the images a build started from.

use super::dockerfile::is_real_base_image;
use super::image::{mark_noassertion, ImageReference};
use super::{element_id, find_by_key, DocumentEnricher, EnrichmentStats};
use crate::error::{Result, SbomMergeError};
use crate::matching::resolver_key;
use crate::model::{Document, Edge, Node, RelationshipKind, SbomFormat};
use indexmap::IndexMap;

/// Property marking an image used by a builder stage; the value is the
/// stage index
pub const BUILDER_STAGE_PROPERTY: &str = "konflux:container:is_builder_image:for_stage";
/// Property marking the image the final stage was built from
pub const BASE_IMAGE_PROPERTY: &str = "konflux:container:is_base_image";

/// Adds one node per distinct base image, each a build tool of the root.
#[derive(Debug, Clone)]
pub struct BaseImagesEnricher {
    /// Base image of every Dockerfile stage, as written, in stage order
    stages: Vec<String>,
    /// Image as written to its digest-pinned reference
    digests: IndexMap<String, String>,
    builder_stage_property: String,
    base_image_property: String,
}

impl BaseImagesEnricher {
    #[must_use]
    pub fn new(stages: Vec<String>, digests: IndexMap<String, String>) -> Self {
        Self {
            stages,
            digests,
            builder_stage_property: BUILDER_STAGE_PROPERTY.to_string(),
            base_image_property: BASE_IMAGE_PROPERTY.to_string(),
        }
    }

    #[must_use]
    pub fn with_property_names(
        mut self,
        builder_stage: impl Into<String>,
        base_image: impl Into<String>,
    ) -> Self {
        self.builder_stage_property = builder_stage.into();
        self.base_image_property = base_image.into();
        self
    }

    /// `(pinned image, property name, property value)` for every stage that
    /// used a real, digest-resolved image
    fn stage_properties(&self) -> Result<(Vec<(ImageReference, &str, String)>, usize)> {
        let mut entries = Vec::new();
        let mut skipped = 0;
        let last = self.stages.len().saturating_sub(1);
        for (index, image) in self.stages.iter().enumerate() {
            if !is_real_base_image(image) {
                skipped += 1;
                continue;
            }
            let Some(pinned) = self.digests.get(image) else {
                // buildah skipped the stage, so it did not take part in the build
                tracing::debug!("No digest for stage {} image {}, skipping", index, image);
                skipped += 1;
                continue;
            };
            let reference = ImageReference::from_pinned(pinned).map_err(|e| {
                SbomMergeError::validation(format!("base image of stage {index}: {e}"))
            })?;
            let (name, value) = if index == last {
                (self.base_image_property.as_str(), "true".to_string())
            } else {
                (self.builder_stage_property.as_str(), index.to_string())
            };
            entries.push((reference, name, value));
        }
        Ok((entries, skipped))
    }
}

fn base_image_node(image: &ImageReference, format: SbomFormat) -> Node {
    let purl = image.purl();
    let id = element_id(format, &image.repository, &purl);
    let mut node = Node::new(id, image.repository.clone())
        .with_type("container")
        .with_purl(purl);
    if format == SbomFormat::Spdx {
        mark_noassertion(&mut node, &["downloadLocation"]);
    }
    node
}

impl DocumentEnricher for BaseImagesEnricher {
    fn enrich(&self, document: &mut Document) -> Result<EnrichmentStats> {
        let mut stats = EnrichmentStats::default();
        let (entries, skipped) = self.stage_properties()?;
        stats.skipped = skipped;
        let format = document.metadata.format;
        let root = document.root_id().clone();

        for (image, property, value) in entries {
            let mut node = base_image_node(&image, format);
            let key = resolver_key(&node)?;
            let id = match find_by_key(document, &key)? {
                Some(existing) => {
                    let added = document
                        .find_node_mut(&existing)
                        .is_some_and(|n| n.add_property(property, value));
                    if added {
                        stats.nodes_updated += 1;
                    }
                    existing
                }
                None => {
                    node.id = document.unique_id(&node.id);
                    node.add_property(property, value);
                    let id = node.id.clone();
                    document.add_node(node);
                    stats.nodes_added += 1;
                    id
                }
            };

            if id != root
                && document.add_edge(Edge::new(id.clone(), RelationshipKind::BuildToolOf, root.clone()))
            {
                stats.edges_added += 1;
            }
        }
        Ok(stats)
    }

    fn name(&self) -> &'static str {
        "base images"
    }
}
