//! Inputs of base-image enrichment: the parsed Dockerfile (dockerfile-json
//! output) and the digests file written after the build.

use crate::error::{Result, SbomMergeError};
use indexmap::IndexMap;
use serde::Deserialize;

/// Base image name used for `FROM scratch`
pub const SCRATCH: &str = "scratch";

#[derive(Debug, Deserialize)]
struct ParsedDockerfile {
    #[serde(rename = "Stages", default)]
    stages: Vec<Stage>,
}

#[derive(Debug, Deserialize)]
struct Stage {
    #[serde(rename = "From")]
    from: StageFrom,
}

#[derive(Debug, Deserialize)]
struct StageFrom {
    #[serde(rename = "Image")]
    image: Option<String>,
    #[serde(rename = "Scratch", default)]
    scratch: bool,
    #[serde(rename = "Stage")]
    stage: Option<StageRef>,
}

#[derive(Debug, Deserialize)]
struct StageRef {
    #[serde(rename = "Index")]
    index: usize,
}

/// The base image of every stage, in stage order.
///
/// A stage built `FROM` an earlier stage reports the image that stage chain
/// ultimately starts from; a chain ending in `scratch` reports `scratch`.
pub fn base_images_from_dockerfile(content: &str) -> Result<Vec<String>> {
    let parsed: ParsedDockerfile = serde_json::from_str(content)
        .map_err(|e| SbomMergeError::validation(format!("invalid parsed Dockerfile: {e}")))?;
    let stages = &parsed.stages;

    let mut images = Vec::with_capacity(stages.len());
    for (index, stage) in stages.iter().enumerate() {
        images.push(resolve_stage(stages, index, &stage.from)?);
    }
    Ok(images)
}

fn resolve_stage(stages: &[Stage], index: usize, from: &StageFrom) -> Result<String> {
    let mut current = from;
    // a chain visiting more stages than exist has a cycle
    for _ in 0..=stages.len() {
        if let Some(image) = &current.image {
            return Ok(image.clone());
        }
        if current.scratch {
            return Ok(SCRATCH.to_string());
        }
        let Some(stage_ref) = &current.stage else {
            return Err(SbomMergeError::validation(format!(
                "stage {index} has no Image, Scratch or Stage in From"
            )));
        };
        current = &stages
            .get(stage_ref.index)
            .ok_or_else(|| {
                SbomMergeError::validation(format!(
                    "stage {index} refers to missing stage {}",
                    stage_ref.index
                ))
            })?
            .from;
    }
    Err(SbomMergeError::validation(format!(
        "stage {index} is part of a FROM cycle"
    )))
}

/// Whether a base image is a real image rather than `scratch` or an OCI
/// archive
#[must_use]
pub fn is_real_base_image(image: &str) -> bool {
    image != SCRATCH && !image.starts_with("oci-archive")
}

/// Parse the digests file: one `<reference as written> <pinned reference>`
/// pair per line. Blank lines are ignored.
pub fn parse_digests_file(content: &str) -> Result<IndexMap<String, String>> {
    let mut digests = IndexMap::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [reference, pinned] = parts.as_slice() else {
            return Err(SbomMergeError::validation(format!(
                "base image digests line {} has {} fields, expected 2",
                number + 1,
                parts.len()
            )));
        };
        digests.insert((*reference).to_string(), (*pinned).to_string());
    }
    Ok(digests)
}
