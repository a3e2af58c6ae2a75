//! Configuration types for sbom-merge operations.

use super::defaults::DEFAULT_OUTPUT_INDENT;
use crate::enrichment::{BASE_IMAGE_PROPERTY, BUILDER_STAGE_PROPERTY};
use crate::formats::annotations::DEFAULT_ANNOTATOR;
use crate::merge::DEFAULT_SYNTHETIC_ROOT_NAME;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Unified application configuration that can be loaded from CLI args or config files.
///
/// CLI flags are layered over the file with [`AppConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// Merge configuration
    pub merge: MergeConfig,
    /// Output configuration
    pub output: OutputConfig,
    /// Enrichment configuration (property names, SPDX annotator)
    pub enrichment: EnrichmentConfig,
}

impl AppConfig {
    /// Create a new `AppConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AppConfig` builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

/// Builder for constructing `AppConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the name of the root created when merged documents have several.
    pub fn synthetic_root_name(mut self, name: impl Into<String>) -> Self {
        self.config.merge.synthetic_root_name = name.into();
        self
    }

    /// Set the JSON indentation, 0 for compact output.
    pub const fn indent(mut self, indent: usize) -> Self {
        self.config.output.indent = indent;
        self
    }

    /// Set the SPDX annotator used for JSON-encoded properties.
    pub fn annotator(mut self, annotator: impl Into<String>) -> Self {
        self.config.enrichment.annotator = annotator.into();
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Section Types
// ============================================================================

/// Merge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MergeConfig {
    /// Name of the root created when the inputs have more than one root
    pub synthetic_root_name: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            synthetic_root_name: DEFAULT_SYNTHETIC_ROOT_NAME.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Spaces of JSON indentation; 0 writes compact JSON
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent: DEFAULT_OUTPUT_INDENT,
        }
    }
}

/// Enrichment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Property recording the stage index of a builder image
    pub builder_stage_property: String,
    /// Property marking the final base image
    pub base_image_property: String,
    /// SPDX annotator of annotations that carry properties
    pub annotator: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            builder_stage_property: BUILDER_STAGE_PROPERTY.to_string(),
            base_image_property: BASE_IMAGE_PROPERTY.to_string(),
            annotator: DEFAULT_ANNOTATOR.to_string(),
        }
    }
}
