//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAMES};
use super::types::AppConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (`$XDG_CONFIG_HOME/sbom-merge/`)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    let cwd = std::env::current_dir().ok();
    let candidates = [
        cwd.clone(),
        cwd.as_deref().and_then(find_git_root),
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME)),
        dirs::home_dir(),
    ];
    candidates
        .iter()
        .flatten()
        .find_map(|dir| find_config_in_dir(dir))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Find the git repository root by walking up from `start`.
fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml_ng::Error),
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml_ng::from_str(&content)?;
    Ok(config)
}

/// Load config from the discovered file, or return defaults when there is
/// none. An explicit path that cannot be loaded is an error; a discovered
/// file that cannot be loaded is logged and skipped.
pub fn load_or_default(
    explicit_path: Option<&Path>,
) -> Result<(AppConfig, Option<PathBuf>), ConfigFileError> {
    if let Some(path) = explicit_path {
        return load_config_file(path).map(|config| (config, Some(path.to_path_buf())));
    }
    let Some(path) = discover_config_file(None) else {
        return Ok((AppConfig::default(), None));
    };
    match load_config_file(&path) {
        Ok(config) => {
            tracing::debug!("Loaded config from {}", path.display());
            Ok((config, Some(path)))
        }
        Err(e) => {
            tracing::warn!("Failed to load config from {}: {}", path.display(), e);
            Ok((AppConfig::default(), None))
        }
    }
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl AppConfig {
    /// Merge another config into this one, with `other` taking precedence
    /// wherever it differs from the defaults.
    ///
    /// This is used for layering CLI args over file config.
    pub fn merge(&mut self, other: &Self) {
        let defaults = Self::default();

        if other.merge.synthetic_root_name != defaults.merge.synthetic_root_name {
            self.merge
                .synthetic_root_name
                .clone_from(&other.merge.synthetic_root_name);
        }

        if other.output.indent != defaults.output.indent {
            self.output.indent = other.output.indent;
        }

        let enrichment = &other.enrichment;
        if enrichment.builder_stage_property != defaults.enrichment.builder_stage_property {
            self.enrichment
                .builder_stage_property
                .clone_from(&enrichment.builder_stage_property);
        }
        if enrichment.base_image_property != defaults.enrichment.base_image_property {
            self.enrichment
                .base_image_property
                .clone_from(&enrichment.base_image_property);
        }
        if enrichment.annotator != defaults.enrichment.annotator {
            self.enrichment.annotator.clone_from(&enrichment.annotator);
        }
    }

    /// Load from file and merge with CLI overrides.
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        cli_overrides: &Self,
    ) -> Result<(Self, Option<PathBuf>), ConfigFileError> {
        let (mut config, loaded_from) = load_or_default(config_path)?;
        config.merge(cli_overrides);
        Ok((config, loaded_from))
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate a commented example config with all options.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AppConfig::default();
    format!(
        r"# sbom-merge configuration
#
# Place this file at .sbom-merge.yaml in your project root or at
# ~/.config/sbom-merge/sbom-merge.yaml for a global config.
# CLI arguments always override file settings.

{}",
        serde_yaml_ng::to_string(&example).unwrap_or_default()
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".sbom-merge.yaml");
        std::fs::write(&config_path, "output:\n  indent: 4\n").unwrap();

        assert_eq!(find_config_in_dir(tmp.path()), Some(config_path));
    }

    #[test]
    fn test_find_config_in_dir_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_in_dir(tmp.path()), None);
    }

    #[test]
    fn test_find_git_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_git_root(&nested), Some(tmp.path().to_path_buf()));
    }

    #[test]
    fn test_load_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");
        let yaml = r"
merge:
  synthetic_root_name: release
enrichment:
  annotator: 'Tool: custom'
";
        std::fs::write(&config_path, yaml).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.merge.synthetic_root_name, "release");
        assert_eq!(config.enrichment.annotator, "Tool: custom");
        assert_eq!(config.output.indent, 2);
    }

    #[test]
    fn test_load_config_file_errors() {
        let result = load_config_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));

        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.yaml");
        std::fs::write(&bad, "output: [").unwrap();
        assert!(matches!(load_config_file(&bad), Err(ConfigFileError::Parse(_))));
        assert!(load_or_default(Some(&bad)).is_err());
    }

    #[test]
    fn test_config_merge() {
        let mut base = AppConfig::builder().indent(4).synthetic_root_name("file").build();
        let overrides = AppConfig::builder().synthetic_root_name("cli").build();

        base.merge(&overrides);
        assert_eq!(base.merge.synthetic_root_name, "cli");
        // defaults in the override leave file values alone
        assert_eq!(base.output.indent, 4);
    }

    #[test]
    fn test_generate_example_config_parses() {
        let example = generate_example_config();
        assert!(example.contains("synthetic_root_name"));
        let parsed: AppConfig = serde_yaml_ng::from_str(&example).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn test_discover_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("custom-config.yaml");
        std::fs::write(&config_path, "output:\n  indent: 0\n").unwrap();

        assert_eq!(discover_config_file(Some(&config_path)), Some(config_path));
        assert_eq!(discover_config_file(Some(&tmp.path().join("missing.yaml"))), None);
    }
}
