//! Adapter trait and format detection types.
//!
//! An [`SbomAdapter`] translates one wire format to and from the
//! [`Document`] model. Detection is a cheap structural check reported as a
//! confidence score, so callers can pick an adapter without trial parsing.

use crate::error::Result;
use crate::model::{Document, Node, SbomFormat};
use std::path::Path;

/// Confidence level for format detection
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FormatConfidence(f32);

impl FormatConfidence {
    /// Definitely not this format
    pub const NONE: Self = Self(0.0);
    /// Might be this format
    pub const LOW: Self = Self(0.25);
    /// Likely this format
    pub const MEDIUM: Self = Self(0.5);
    /// Almost certainly this format
    pub const HIGH: Self = Self(0.75);
    /// Definitely this format
    pub const CERTAIN: Self = Self(1.0);

    #[must_use]
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }

    /// Whether this confidence is enough to attempt parsing
    #[must_use]
    pub fn can_parse(&self) -> bool {
        self.0 >= Self::LOW.0
    }
}

impl Default for FormatConfidence {
    fn default() -> Self {
        Self::NONE
    }
}

/// Detection result from an adapter
#[derive(Debug, Clone, Default)]
pub struct FormatDetection {
    pub confidence: FormatConfidence,
    /// Detected spec version, e.g. `1.5` or `SPDX-2.3`
    pub version: Option<String>,
    pub warnings: Vec<String>,
}

impl FormatDetection {
    #[must_use]
    pub fn no_match() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_confidence(confidence: FormatConfidence) -> Self {
        Self {
            confidence,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn warning(mut self, warning: &str) -> Self {
        self.warnings.push(warning.to_string());
        self
    }
}

/// Bidirectional translator between one wire format and the model.
pub trait SbomAdapter {
    /// The format this adapter speaks
    fn format(&self) -> SbomFormat;

    /// Parse a whole document from JSON text
    fn parse_str(&self, content: &str) -> Result<Document>;

    /// Parse a document from a file
    fn parse(&self, path: &Path) -> Result<Document> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::SbomMergeError::io(path, e))?;
        self.parse_str(&content)
    }

    /// Serialize a document as JSON text, indented by `indent` spaces
    /// (0 for compact output)
    fn serialize(&self, document: &Document, indent: usize) -> Result<String>;

    /// Lightweight structural check without full parsing
    fn detect(&self, content: &str) -> FormatDetection;

    /// A root node to wrap several independent roots
    fn synthetic_root(&self, name: &str) -> Node;

    /// Whether `node` is a root produced by [`SbomAdapter::synthetic_root`]
    fn is_synthetic_root(&self, node: &Node) -> bool;

    /// Spec versions this adapter reads
    fn supported_versions(&self) -> Vec<&str>;
}
