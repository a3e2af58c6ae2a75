//! **Merge, enrich and generate SBOMs for container builds.**
//!
//! `sbom-merge` combines the Software Bills of Materials produced for one
//! container build by different tools (a dependency prefetcher, an image
//! scanner, a source scanner) into a single document, and adds the facts only
//! the build system knows: the image that was produced and the images it was
//! built from.
//!
//! **CycloneDX** and **SPDX** JSON are read into one format-agnostic graph
//! model and written back in the format they came in. Fields the model does
//! not interpret are carried through untouched.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: the [`Document`] graph: nodes, typed edges and one root.
//! - **[`formats`]**: the CycloneDX and SPDX adapters, format detection.
//! - **[`matching`]**: package URLs, the resolver key that decides when two
//!   nodes are the same package, and the cachi2-over-syft duplicate filter.
//! - **[`merge`]**: the [`GraphMerger`].
//! - **[`enrichment`]**: image-reference and base-image enrichers.
//! - **[`generate`]**: documents built from build artifacts (image indexes,
//!   oci-copy artifacts) and the purl listing.
//! - **[`pipeline`]** and **[`cli`]**: file plumbing behind the command line.
//!
//! ## Merging two SBOMs
//!
//! ```no_run
//! use sbom_merge::formats::{adapter_for, parse_document_str};
//! use sbom_merge::merge::GraphMerger;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let annotator = "Tool: konflux:jsonencoded";
//!     let image = parse_document_str(&std::fs::read_to_string("image.json")?, annotator)?;
//!     let source = parse_document_str(&std::fs::read_to_string("source.json")?, annotator)?;
//!
//!     let adapter = adapter_for(image.metadata.format, annotator);
//!     let merged = GraphMerger::new(adapter.as_ref()).merge(&[image, source])?;
//!     println!("{}", adapter.serialize(&merged, 2)?);
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    // Doc completeness: # Errors sections are not written for every fallible fn
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod formats;
pub mod generate;
pub mod matching;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod utils;

// Re-export main types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError, Validatable};
pub use enrichment::{
    BaseImagesEnricher, DocumentEnricher, EnrichmentStats, ImageReference, ImageReferenceEnricher,
};
pub use error::{ErrorContext, FormatErrorKind, OptionContext, Result, SbomMergeError};
pub use formats::{adapter_for, detect_format, parse_document_str, SbomAdapter};
pub use matching::{resolver_key, Flavour, FlavouredInput, Purl, ResolverKey};
pub use merge::GraphMerger;
pub use model::{Document, Edge, Node, NodeId, RelationshipKind, SbomFormat};
