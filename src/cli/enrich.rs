//! Enrichment command handlers.
//!
//! `add-image-ref` and `add-base-images` read one document, run a single
//! enricher over it and write it back out.

use crate::config::AppConfig;
use crate::enrichment::{
    base_images_from_dockerfile, parse_digests_file, BaseImagesEnricher, DocumentEnricher,
    ImageReference, ImageReferenceEnricher,
};
use crate::pipeline::{
    parse_sbom_with_context, read_input, render_document, write_output, OutputTarget,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the add-image-ref command
pub fn run_add_image_ref(
    config: &AppConfig,
    input: &Path,
    image_url: &str,
    image_digest: &str,
    output: &OutputTarget,
) -> Result<()> {
    let image = ImageReference::from_url_and_digest(image_url, image_digest)
        .context("Invalid image reference")?;
    let enricher = ImageReferenceEnricher::new(image);
    run_enricher(config, input, &enricher, output)
}

/// Run the add-base-images command.
///
/// `parsed_dockerfile` is the JSON rendering of the Dockerfile produced by
/// the build; `digests` lists one `image digest-pinned-image` pair per line.
pub fn run_add_base_images(
    config: &AppConfig,
    sbom: &Path,
    parsed_dockerfile: &Path,
    digests: &Path,
    output: &OutputTarget,
) -> Result<()> {
    let stages = base_images_from_dockerfile(&read_input(parsed_dockerfile)?)
        .with_context(|| format!("Invalid parsed Dockerfile {}", parsed_dockerfile.display()))?;
    let digests = parse_digests_file(&read_input(digests)?)
        .with_context(|| format!("Invalid base image digests file {}", digests.display()))?;
    tracing::debug!("Dockerfile stages: {:?}", stages);

    let enricher = BaseImagesEnricher::new(stages, digests).with_property_names(
        config.enrichment.builder_stage_property.clone(),
        config.enrichment.base_image_property.clone(),
    );
    run_enricher(config, sbom, &enricher, output)
}

fn run_enricher(
    config: &AppConfig,
    input: &Path,
    enricher: &dyn DocumentEnricher,
    output: &OutputTarget,
) -> Result<()> {
    let annotator = &config.enrichment.annotator;
    let mut document = parse_sbom_with_context(input, None, annotator)?;
    let stats = enricher
        .enrich(&mut document)
        .with_context(|| format!("Failed to apply {} to {}", enricher.name(), input.display()))?;
    stats.log_summary(enricher.name());

    let content = render_document(&document, config.output.indent, annotator)?;
    write_output(&content, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIGEST: &str = "sha256:3f1ca1d2b3e8a3e4d7c0e2f8b14a2c9d6e5f7a8b9c0d1e2f3a4b5c6d7e8f9a0b";

    fn write_spdx(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("sbom.json");
        let doc = serde_json::json!({
            "spdxVersion": "SPDX-2.3",
            "dataLicense": "CC0-1.0",
            "SPDXID": "SPDXRef-DOCUMENT",
            "name": "scan",
            "documentNamespace": "https://example.com/scan",
            "creationInfo": {"created": "2024-01-01T00:00:00Z", "creators": ["Tool: syft"]},
            "packages": [
                {"SPDXID": "SPDXRef-root", "name": ".", "downloadLocation": "NOASSERTION"},
                {"SPDXID": "SPDXRef-a", "name": "a", "versionInfo": "1",
                 "downloadLocation": "NOASSERTION",
                 "externalRefs": [{"referenceCategory": "PACKAGE-MANAGER",
                                   "referenceType": "purl", "referenceLocator": "pkg:npm/a@1"}]}
            ],
            "relationships": [
                {"spdxElementId": "SPDXRef-DOCUMENT", "relationshipType": "DESCRIBES",
                 "relatedSpdxElement": "SPDXRef-root"},
                {"spdxElementId": "SPDXRef-root", "relationshipType": "CONTAINS",
                 "relatedSpdxElement": "SPDXRef-a"}
            ]
        });
        std::fs::write(&path, doc.to_string()).unwrap();
        path
    }

    #[test]
    fn test_add_image_ref_replaces_virtual_root() {
        let tmp = TempDir::new().unwrap();
        let input = write_spdx(tmp.path());
        let out = tmp.path().join("out.json");

        run_add_image_ref(
            &AppConfig::default(),
            &input,
            "quay.io/org/app:v1",
            DIGEST,
            &OutputTarget::File(out.clone()),
        )
        .unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["name"], format!("quay.io/org/app@{DIGEST}"));
        let ids: Vec<&str> = doc["packages"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["SPDXID"].as_str())
            .collect();
        assert!(ids.contains(&"SPDXRef-image"));
        assert!(!ids.contains(&"SPDXRef-root"));
    }

    #[test]
    fn test_add_image_ref_rejects_untagged_url() {
        let tmp = TempDir::new().unwrap();
        let input = write_spdx(tmp.path());
        let result = run_add_image_ref(
            &AppConfig::default(),
            &input,
            "quay.io/org/app",
            DIGEST,
            &OutputTarget::Stdout,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_add_base_images_in_place() {
        let tmp = TempDir::new().unwrap();
        let sbom = write_spdx(tmp.path());
        let dockerfile = tmp.path().join("dockerfile.json");
        std::fs::write(
            &dockerfile,
            r#"{"Stages": [{"From": {"Image": "registry.io/base:1"}}]}"#,
        )
        .unwrap();
        let digests = tmp.path().join("digests.txt");
        std::fs::write(
            &digests,
            format!("registry.io/base:1 registry.io/base:1@{DIGEST}\n"),
        )
        .unwrap();

        run_add_base_images(
            &AppConfig::default(),
            &sbom,
            &dockerfile,
            &digests,
            &OutputTarget::File(sbom.clone()),
        )
        .unwrap();

        let content = std::fs::read_to_string(&sbom).unwrap();
        assert!(content.contains("BUILD_TOOL_OF"));
        assert!(content.contains("konflux:container:is_base_image"));
    }
}
