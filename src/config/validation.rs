//! Configuration validation for sbom-merge.
//!
//! Provides validation traits and implementations for all configuration types.

use super::defaults::MAX_OUTPUT_INDENT;
use super::types::{AppConfig, EnrichmentConfig, MergeConfig, OutputConfig};

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.merge.validate());
        errors.extend(self.output.validate());
        errors.extend(self.enrichment.validate());
        errors
    }
}

impl Validatable for MergeConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.synthetic_root_name.trim().is_empty() {
            errors.push(ConfigError::new(
                "merge.synthetic_root_name",
                "Synthetic root name must not be empty",
            ));
        } else if self.synthetic_root_name.starts_with('.') {
            // such a root would be taken for a virtual root and replaced
            errors.push(ConfigError::new(
                "merge.synthetic_root_name",
                format!(
                    "Synthetic root name must not start with '.', got '{}'",
                    self.synthetic_root_name
                ),
            ));
        }
        errors
    }
}

impl Validatable for OutputConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.indent > MAX_OUTPUT_INDENT {
            errors.push(ConfigError::new(
                "output.indent",
                format!(
                    "Indent must be between 0 and {MAX_OUTPUT_INDENT}, got {}",
                    self.indent
                ),
            ));
        }
        errors
    }
}

impl Validatable for EnrichmentConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let properties = [
            ("enrichment.builder_stage_property", &self.builder_stage_property),
            ("enrichment.base_image_property", &self.base_image_property),
        ];
        for (field, value) in properties {
            if value.trim().is_empty() {
                errors.push(ConfigError::new(field, "Property name must not be empty"));
            }
        }
        if !self.base_image_property.is_empty()
            && self.builder_stage_property == self.base_image_property
        {
            errors.push(ConfigError::new(
                "enrichment.base_image_property",
                "Base image and builder stage properties must differ",
            ));
        }

        if self.annotator.trim().is_empty() {
            errors.push(ConfigError::new(
                "enrichment.annotator",
                "Annotator must not be empty",
            ));
        }

        errors
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().is_valid());
    }

    #[test]
    fn test_merge_config_validation() {
        let empty = MergeConfig {
            synthetic_root_name: "  ".to_string(),
        };
        assert!(!empty.is_valid());

        let dotted = MergeConfig {
            synthetic_root_name: "./merged".to_string(),
        };
        assert_eq!(dotted.validate()[0].field, "merge.synthetic_root_name");
    }

    #[test]
    fn test_output_indent_validation() {
        assert!(OutputConfig { indent: 0 }.is_valid());
        assert!(OutputConfig { indent: 16 }.is_valid());
        assert!(!OutputConfig { indent: 17 }.is_valid());
    }

    #[test]
    fn test_enrichment_validation() {
        let same = EnrichmentConfig {
            builder_stage_property: "p".to_string(),
            base_image_property: "p".to_string(),
            ..EnrichmentConfig::default()
        };
        assert_eq!(same.validate().len(), 1);

        let blank = EnrichmentConfig {
            annotator: String::new(),
            builder_stage_property: String::new(),
            ..EnrichmentConfig::default()
        };
        let fields: Vec<String> = blank.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            ["enrichment.builder_stage_property", "enrichment.annotator"]
        );
    }

    #[test]
    fn test_errors_are_collected_across_sections() {
        let config = AppConfig {
            merge: MergeConfig {
                synthetic_root_name: String::new(),
            },
            output: OutputConfig { indent: 99 },
            ..AppConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].to_string(), "output.indent: Indent must be between 0 and 16, got 99");
    }
}
