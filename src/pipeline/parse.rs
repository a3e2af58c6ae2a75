//! Reading SBOM and build-fact inputs from disk.

use super::PipelineError;
use crate::formats::{adapter_for, detect_format};
use crate::matching::{Flavour, FlavouredInput};
use crate::model::{Document, SbomFormat};
use anyhow::{Context, Result};
use std::path::Path;

/// Read a whole text input
pub fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| crate::SbomMergeError::io(path, e))
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Parse an SBOM file, detecting its format unless one is forced.
///
/// A forced format that disagrees with the detected one is rejected before
/// parsing.
pub fn parse_sbom_with_context(
    path: &Path,
    format: Option<SbomFormat>,
    annotator: &str,
) -> Result<Document> {
    tracing::info!("Parsing SBOM: {}", path.display());
    let content = read_input(path)?;

    let detected = detect_format(&content).map_err(|e| PipelineError::ParseFailed {
        path: path.display().to_string(),
        source: e.into(),
    })?;
    if let Some(forced) = format {
        if forced != detected {
            return Err(PipelineError::ParseFailed {
                path: path.display().to_string(),
                source: crate::SbomMergeError::unsupported_format(format!(
                    "expected {forced} input, found {detected}"
                ))
                .into(),
            }
            .into());
        }
    }

    let document = adapter_for(detected, annotator)
        .parse_str(&content)
        .map_err(|e| PipelineError::ParseFailed {
            path: path.display().to_string(),
            source: e.into(),
        })?;
    tracing::info!(
        "Parsed {} nodes and {} edges from {}",
        document.node_count(),
        document.edge_count(),
        path.display()
    );
    Ok(document)
}

/// Parse every input, in order
pub fn parse_inputs(
    paths: &[&Path],
    format: Option<SbomFormat>,
    annotator: &str,
) -> Result<Vec<Document>> {
    paths
        .iter()
        .map(|path| parse_sbom_with_context(path, format, annotator))
        .collect()
}

/// Parse flavour-tagged inputs, keeping each document's flavour
pub fn parse_flavoured_inputs(
    inputs: &[FlavouredInput],
    format: Option<SbomFormat>,
    annotator: &str,
) -> Result<Vec<(Flavour, Document)>> {
    inputs
        .iter()
        .map(|input| {
            parse_sbom_with_context(&input.path, format, annotator)
                .map(|document| (input.flavour, document))
        })
        .collect()
}
