//! Merge command handler.
//!
//! Implements the `merge` subcommand: N documents of one format in, one out.

use crate::config::AppConfig;
use crate::formats::adapter_for;
use crate::matching::{Flavour, FlavouredInput};
use crate::merge::GraphMerger;
use crate::model::SbomFormat;
use crate::pipeline::{parse_flavoured_inputs, render_document, write_output, OutputTarget};
use anyhow::{bail, Result};

/// Run the merge command.
///
/// Inputs tagged `cachi2:` switch to the flavoured merge, where scanner
/// (`syft:` or untagged) nodes already reported by cachi2 are dropped first.
pub fn run_merge(
    config: &AppConfig,
    inputs: &[FlavouredInput],
    format: Option<SbomFormat>,
    output: &OutputTarget,
) -> Result<()> {
    if inputs.is_empty() {
        bail!("merge needs at least one input SBOM");
    }
    let annotator = &config.enrichment.annotator;
    let documents = parse_flavoured_inputs(inputs, format, annotator)?;
    let format = documents[0].1.metadata.format;

    let adapter = adapter_for(format, annotator);
    let merger = GraphMerger::new(adapter.as_ref())
        .with_synthetic_root_name(config.merge.synthetic_root_name.clone());

    let merged = if documents.iter().any(|(flavour, _)| *flavour == Flavour::Cachi2) {
        merger.merge_flavoured(documents)?
    } else {
        let documents: Vec<_> = documents.into_iter().map(|(_, document)| document).collect();
        merger.merge(&documents)?
    };

    let content = render_document(&merged, config.output.indent, annotator)?;
    write_output(&content, output)
}
