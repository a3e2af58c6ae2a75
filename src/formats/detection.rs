//! Format detection across the supported adapters.

use super::traits::{FormatConfidence, FormatDetection, SbomAdapter};
use super::{CycloneDxAdapter, SpdxAdapter};
use crate::model::SbomFormat;

/// Minimum confidence for accepting a detection.
pub const MIN_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Result of format detection.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// The detected format, if any adapter was confident enough.
    pub format: Option<SbomFormat>,
    pub confidence: FormatConfidence,
    /// Detected spec version if available.
    pub version: Option<String>,
    pub warnings: Vec<String>,
}

impl DetectionResult {
    /// Create a result indicating no format was detected.
    #[must_use]
    pub fn unknown(reason: &str) -> Self {
        Self {
            format: None,
            confidence: FormatConfidence::NONE,
            version: None,
            warnings: vec![reason.to_string()],
        }
    }

    fn detected(format: SbomFormat, detection: FormatDetection) -> Self {
        Self {
            format: Some(format),
            confidence: detection.confidence,
            version: detection.version,
            warnings: detection.warnings,
        }
    }
}

/// Picks the adapter with the highest confidence for some content.
pub struct FormatDetector {
    cyclonedx: CycloneDxAdapter,
    spdx: SpdxAdapter,
    min_confidence: f32,
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDetector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cyclonedx: CycloneDxAdapter::new(),
            spdx: SpdxAdapter::new(),
            min_confidence: MIN_CONFIDENCE_THRESHOLD,
        }
    }

    /// Detect the format of a whole document
    #[must_use]
    pub fn detect(&self, content: &str) -> DetectionResult {
        if content.trim().is_empty() {
            return DetectionResult::unknown("Empty content");
        }
        let cdx = self.cyclonedx.detect(content);
        let spdx = self.spdx.detect(content);
        self.select_best(cdx, spdx)
    }

    fn select_best(&self, cdx: FormatDetection, spdx: FormatDetection) -> DetectionResult {
        let cdx_conf = cdx.confidence.value();
        let spdx_conf = spdx.confidence.value();

        tracing::debug!(
            "Format detection: CycloneDX={:.2}, SPDX={:.2}, threshold={:.2}",
            cdx_conf,
            spdx_conf,
            self.min_confidence
        );

        if cdx_conf >= self.min_confidence && cdx_conf > spdx_conf {
            DetectionResult::detected(SbomFormat::CycloneDx, cdx)
        } else if spdx_conf >= self.min_confidence {
            DetectionResult::detected(SbomFormat::Spdx, spdx)
        } else {
            let mut result =
                DetectionResult::unknown("Could not detect SBOM format with sufficient confidence");
            if cdx_conf > 0.0 {
                result.warnings.push(format!(
                    "CycloneDX detection: {:.0}% confidence (threshold: {:.0}%)",
                    cdx_conf * 100.0,
                    self.min_confidence * 100.0
                ));
            }
            if spdx_conf > 0.0 {
                result.warnings.push(format!(
                    "SPDX detection: {:.0}% confidence (threshold: {:.0}%)",
                    spdx_conf * 100.0,
                    self.min_confidence * 100.0
                ));
            }
            result
        }
    }
}
