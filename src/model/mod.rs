//! Format-agnostic SBOM model.
//!
//! Both CycloneDX and SPDX documents are translated into a [`Document`]: a
//! set of [`Node`]s, a set of typed [`Edge`]s and one designated root. The
//! merge, enrichment and generation code only ever sees this model; all wire
//! knowledge lives in [`crate::formats`].

mod identifiers;
mod metadata;
mod sbom;

pub use identifiers::*;
pub use metadata::*;
pub use sbom::*;
