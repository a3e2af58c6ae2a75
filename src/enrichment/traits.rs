//! Enrichment traits.

use crate::enrichment::EnrichmentStats;
use crate::error::Result;
use crate::model::Document;

/// Trait for document enrichers.
///
/// An enricher adds facts about the build (the image that was produced,
/// the images it was built from) to an existing document in place. Running
/// an enricher twice with the same inputs must leave the document as the
/// first run did.
///
/// # Example
///
/// ```ignore
/// use sbom_merge::enrichment::{DocumentEnricher, ImageReference, ImageReferenceEnricher};
///
/// let image = ImageReference::from_pinned("quay.io/org/app:v1@sha256:...")?;
/// let stats = ImageReferenceEnricher::new(image).enrich(&mut document)?;
/// stats.log_summary("image reference");
/// ```
pub trait DocumentEnricher {
    /// Enrich the document in place.
    fn enrich(&self, document: &mut Document) -> Result<EnrichmentStats>;

    /// Name of this enricher, used in logs.
    fn name(&self) -> &'static str;
}
