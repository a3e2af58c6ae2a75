//! Default values for sbom-merge configuration.

/// JSON indentation of written documents
pub const DEFAULT_OUTPUT_INDENT: usize = 2;

/// Largest indentation accepted from configuration
pub const MAX_OUTPUT_INDENT: usize = 16;

/// Config file names searched for, in order
pub const CONFIG_FILE_NAMES: &[&str] = &[".sbom-merge.yaml", ".sbom-merge.yml", "sbom-merge.yaml"];

/// Directory under the user config directory holding a global config file
pub const CONFIG_DIR_NAME: &str = "sbom-merge";
