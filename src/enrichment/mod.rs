//! Build-fact enrichment.
//!
//! Enrichers add what the build system knows but the scanners do not to an
//! existing document: the image that was produced ([`ImageReferenceEnricher`])
//! and the images the build started from ([`BaseImagesEnricher`]).
//!
//! # Example
//!
//! ```no_run
//! use sbom_merge::enrichment::{DocumentEnricher, ImageReference, ImageReferenceEnricher};
//! use sbom_merge::formats::parse_document_str;
//!
//! # fn run(content: &str) -> sbom_merge::Result<()> {
//! let mut document = parse_document_str(content, "Tool: konflux:jsonencoded")?;
//! let image = ImageReference::from_url_and_digest("quay.io/org/app:v1", "sha256:abc")?;
//! let stats = ImageReferenceEnricher::new(image).enrich(&mut document)?;
//! stats.log_summary("image reference");
//! # Ok(())
//! # }
//! ```

mod base_images;
mod dockerfile;
mod image;
mod stats;
mod traits;

pub use base_images::{BaseImagesEnricher, BASE_IMAGE_PROPERTY, BUILDER_STAGE_PROPERTY};
pub use dockerfile::{base_images_from_dockerfile, is_real_base_image, parse_digests_file, SCRATCH};
pub use image::{ImageReference, ImageReferenceEnricher, IMAGE_SPDX_ID};
pub use stats::EnrichmentStats;
pub use traits::DocumentEnricher;

use crate::error::Result;
use crate::matching::{resolver_key, ResolverKey};
use crate::model::{Document, NodeId, SbomFormat};
use crate::utils::{sanitize_spdx_id, sha256_hex};

/// Element id for an image added to a document: the purl in CycloneDX,
/// `SPDXRef-image-<name>-<sha256(purl)>` in SPDX
pub(crate) fn element_id(format: SbomFormat, name: &str, purl: &str) -> String {
    match format {
        SbomFormat::CycloneDx => purl.to_string(),
        SbomFormat::Spdx => format!("SPDXRef-image-{}-{}", sanitize_spdx_id(name), sha256_hex(purl)),
    }
}

/// Id of the first node whose resolver key is `key`
pub(crate) fn find_by_key(document: &Document, key: &ResolverKey) -> Result<Option<NodeId>> {
    for node in document.nodes() {
        if &resolver_key(node)? == key {
            return Ok(Some(node.id.clone()));
        }
    }
    Ok(None)
}
