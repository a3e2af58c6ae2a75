//! Configuration for sbom-merge.
//!
//! - Type-safe configuration structures with a JSON Schema
//! - Field-level validation
//! - YAML config file loading and discovery
//! - CLI argument layering
//!
//! # Configuration File
//!
//! Place a `.sbom-merge.yaml` file in your project root or in
//! `~/.config/sbom-merge/`:
//!
//! ```yaml
//! merge:
//!   synthetic_root_name: release
//! output:
//!   indent: 4
//! enrichment:
//!   annotator: "Tool: konflux:jsonencoded"
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAMES, DEFAULT_OUTPUT_INDENT, MAX_OUTPUT_INDENT};
pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    ConfigFileError,
};
pub use types::{AppConfig, AppConfigBuilder, EnrichmentConfig, MergeConfig, OutputConfig};
pub use validation::{ConfigError, Validatable};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// The schema documents every option of `.sbom-merge.yaml` files and can be
/// used by editors for validation and autocompletion.
pub fn generate_json_schema() -> crate::Result<String> {
    let schema = schemars::schema_for!(AppConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_lists_sections() {
        let schema: serde_json::Value =
            serde_json::from_str(&generate_json_schema().unwrap()).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("merge").is_some());
        assert!(properties.get("output").is_some());
        assert!(properties.get("enrichment").is_some());
    }
}
