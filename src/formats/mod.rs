//! Wire formats: CycloneDX and SPDX JSON adapters.
//!
//! Each adapter turns its wire format into a [`Document`] and back. All
//! format-specific knowledge stays in this module.

pub mod annotations;
mod cyclonedx;
mod detection;
mod spdx;
mod traits;

pub use cyclonedx::{CycloneDxAdapter, FORMULATION_SUBJECT_PROPERTY, SYNTHETIC_ROOT_REF};
pub use detection::{DetectionResult, FormatDetector, MIN_CONFIDENCE_THRESHOLD};
pub use spdx::{SpdxAdapter, DOCUMENT_ID, SYNTHETIC_ROOT_ID};
pub use traits::{FormatConfidence, FormatDetection, SbomAdapter};

pub(crate) use spdx::spdx_timestamp_now;

use crate::error::{Result, SbomMergeError};
use crate::model::{Document, SbomFormat};
use serde::Serialize;

/// Adapter for a format. `annotator` names the SPDX annotator used for
/// JSON-encoded properties; CycloneDX ignores it.
#[must_use]
pub fn adapter_for(format: SbomFormat, annotator: &str) -> Box<dyn SbomAdapter> {
    match format {
        SbomFormat::CycloneDx => Box::new(CycloneDxAdapter::new()),
        SbomFormat::Spdx => Box::new(SpdxAdapter::with_annotator(annotator)),
    }
}

/// Detect the format of `content` without parsing it
pub fn detect_format(content: &str) -> Result<SbomFormat> {
    let detection = FormatDetector::new().detect(content);
    for warning in &detection.warnings {
        tracing::debug!("{}", warning);
    }
    detection.format.ok_or_else(|| {
        SbomMergeError::unsupported_format("expected CycloneDX or SPDX JSON".to_string())
    })
}

/// Detect the format of `content` and parse it with the matching adapter
pub fn parse_document_str(content: &str, annotator: &str) -> Result<Document> {
    let format = detect_format(content)?;
    adapter_for(format, annotator).parse_str(content)
}

/// Remove the first item matching `matches`; `false` when there is none
pub(crate) fn take_first<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    match items.iter().position(matches) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

/// Serialize with `indent` spaces per level, or compact when `indent` is 0
pub(crate) fn to_json_string<T: Serialize>(value: &T, indent: usize) -> Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(value)?);
    }
    let spaces = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(spaces.as_bytes());
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buffer)
        .map_err(|e| SbomMergeError::validation(format!("serialized JSON is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_str_dispatches() {
        let cdx = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5",
            "metadata": {"component": {"bom-ref": "r", "name": "r"}}}"#;
        let doc = parse_document_str(cdx, annotations::DEFAULT_ANNOTATOR).unwrap();
        assert_eq!(doc.metadata.format, SbomFormat::CycloneDx);

        let err = parse_document_str("[1, 2]", annotations::DEFAULT_ANNOTATOR).unwrap_err();
        assert!(matches!(err, SbomMergeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_indent() {
        let value = serde_json::json!({"a": [1]});
        assert_eq!(to_json_string(&value, 0).unwrap(), r#"{"a":[1]}"#);
        assert_eq!(to_json_string(&value, 4).unwrap(), "{\n    \"a\": [\n        1\n    ]\n}");
    }
}
