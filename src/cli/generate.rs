//! Generation command handlers: `index-image`, `oci-copy` and `purls`.

use crate::config::AppConfig;
use crate::formats::to_json_string;
use crate::generate::{index_image_sbom, oci_copy_sbom, parse_oci_copy, purl_listing};
use crate::model::SbomFormat;
use crate::pipeline::{
    parse_sbom_with_context, read_input, render_document, write_output, OutputTarget,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the index-image command
pub fn run_index_image(
    config: &AppConfig,
    index_url: &str,
    index_digest: &str,
    inspect: &Path,
    output: &OutputTarget,
) -> Result<()> {
    let document = index_image_sbom(index_url, index_digest, &read_input(inspect)?)
        .with_context(|| format!("Failed to build index SBOM from {}", inspect.display()))?;
    tracing::info!("Index image lists {} manifests", document.node_count() - 1);

    let content = render_document(&document, config.output.indent, &config.enrichment.annotator)?;
    write_output(&content, output)
}

/// Run the oci-copy command
pub fn run_oci_copy(
    config: &AppConfig,
    input: &Path,
    format: SbomFormat,
    output: &OutputTarget,
) -> Result<()> {
    let artifacts = parse_oci_copy(&read_input(input)?)
        .with_context(|| format!("Failed to read artifacts from {}", input.display()))?;
    tracing::info!("Describing {} copied artifacts", artifacts.len());
    let document = oci_copy_sbom(&artifacts, format);

    let content = render_document(&document, config.output.indent, &config.enrichment.annotator)?;
    write_output(&content, output)
}

/// Run the purls command
pub fn run_purls(config: &AppConfig, input: &Path, output: &OutputTarget) -> Result<()> {
    let document = parse_sbom_with_context(input, None, &config.enrichment.annotator)?;
    let listing = purl_listing(&document);
    tracing::debug!(
        "Listing {} purls",
        listing.image_contents.dependencies.len()
    );
    write_output(&to_json_string(&listing, config.output.indent)?, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_oci_copy_writes_spdx() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("oci-copy.yaml");
        std::fs::write(
            &input,
            "artifacts:\n  - source: https://example.com/model.bin\n    filename: model.bin\n    type: application/octet-stream\n    sha256sum: 0c3a1b\n",
        )
        .unwrap();
        let out = tmp.path().join("sbom.json");

        run_oci_copy(
            &AppConfig::default(),
            &input,
            SbomFormat::Spdx,
            &OutputTarget::File(out.clone()),
        )
        .unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["spdxVersion"], "SPDX-2.3");
        assert!(doc["packages"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["downloadLocation"] == "https://example.com/model.bin"));
    }

    #[test]
    fn test_purls_lists_dependencies() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("sbom.json");
        std::fs::write(
            &input,
            serde_json::json!({
                "bomFormat": "CycloneDX",
                "specVersion": "1.5",
                "metadata": {"component": {"bom-ref": "root", "type": "container",
                                           "name": "app", "purl": "pkg:oci/app"}},
                "components": [{"bom-ref": "a", "type": "library", "name": "a",
                                "purl": "pkg:npm/a@1"}]
            })
            .to_string(),
        )
        .unwrap();
        let out = tmp.path().join("purls.json");

        run_purls(&AppConfig::default(), &input, &OutputTarget::File(out.clone())).unwrap();
        let listing: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(
            listing,
            serde_json::json!({"image_contents": {"dependencies": [{"purl": "pkg:npm/a@1"}]}})
        );
    }
}
