//! sbom-merge: merge, enrich and generate SBOMs for container builds
//!
//! Combines `CycloneDX` or SPDX documents from several producers into one and
//! records build facts (the produced image, its base images) in them.

#![allow(clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use sbom_merge::{
    cli,
    config::{self, AppConfig, Validatable},
    matching::FlavouredInput,
    model::SbomFormat,
    pipeline::{write_output, OutputTarget},
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build long version string with format support info
const fn build_long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\n\nSupported SBOM Formats:",
        "\n  CycloneDX: 1.4, 1.5, 1.6 (JSON)",
        "\n  SPDX:      2.2, 2.3 (JSON)",
        "\n\nInput flavours for merge:",
        "\n  cachi2, syft (default)"
    )
}

#[derive(Parser)]
#[command(name = "sbom-merge")]
#[command(version, long_version = build_long_version())]
#[command(about = "Merge, enrich and generate SBOMs for container builds", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge scanner output with the prefetch report
    sbom-merge merge syft:image.json syft:source.json cachi2:cachi2.json -O sbom.json

    # Make the built image the root of the SBOM
    sbom-merge add-image-ref --image-url quay.io/org/app:v1 \\
        --image-digest sha256:... -i sbom.json -O sbom.json

    # Record base images from the parsed Dockerfile (rewrites --sbom in place)
    sbom-merge add-base-images --sbom sbom.json \\
        --parsed-dockerfile dockerfile.json --base-images-digests digests.txt

    # List the purls an SBOM reports
    sbom-merge purls sbom.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true, env = "SBOM_MERGE_CONFIG")]
    config: Option<PathBuf>,

    /// JSON indentation of written documents, 0 for compact output
    #[arg(long, global = true)]
    indent: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Format choice on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    #[value(name = "cyclonedx", alias = "cdx")]
    CycloneDx,
    Spdx,
}

impl From<FormatArg> for SbomFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::CycloneDx => Self::CycloneDx,
            FormatArg::Spdx => Self::Spdx,
        }
    }
}

// ============================================================================
// Command argument structs
// ============================================================================

/// Arguments for the `merge` subcommand
#[derive(Parser)]
struct MergeArgs {
    /// Input SBOMs, optionally prefixed with their producer (`cachi2:` or `syft:`)
    #[arg(required = true, value_name = "[FLAVOUR:]INPUT")]
    inputs: Vec<FlavouredInput>,

    /// Require every input to be of this format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,

    /// Name of the root introduced when the inputs have several roots
    #[arg(long)]
    synthetic_root_name: Option<String>,
}

/// Arguments for the `add-image-ref` subcommand
#[derive(Parser)]
struct AddImageRefArgs {
    /// Image URL including the tag, e.g. quay.io/org/app:v1
    #[arg(long)]
    image_url: String,

    /// Image manifest digest, e.g. sha256:...
    #[arg(long)]
    image_digest: String,

    /// SBOM to enrich
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,
}

/// Arguments for the `add-base-images` subcommand
#[derive(Parser)]
struct AddBaseImagesArgs {
    /// SBOM to enrich; rewritten in place unless --output-file is given
    #[arg(long)]
    sbom: PathBuf,

    /// Dockerfile parsed to JSON by dockerfile-json
    #[arg(long)]
    parsed_dockerfile: PathBuf,

    /// File of `image pinned-image` pairs, one per line
    #[arg(long)]
    base_images_digests: PathBuf,

    /// Output file path
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,
}

/// Arguments for the `index-image` subcommand
#[derive(Parser)]
struct IndexImageArgs {
    /// Image index URL including the tag
    #[arg(long)]
    image_index_url: String,

    /// Image index digest
    #[arg(long)]
    image_index_digest: String,

    /// Output of `buildah manifest inspect` for the index
    #[arg(short, long)]
    inspect_input_file: PathBuf,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,
}

/// Arguments for the `oci-copy` subcommand
#[derive(Parser)]
struct OciCopyArgs {
    /// oci-copy.yaml listing the copied artifacts
    input: PathBuf,

    /// Format of the generated SBOM
    #[arg(long, value_enum, default_value = "cyclonedx")]
    sbom_type: FormatArg,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,
}

/// Arguments for the `purls` subcommand
#[derive(Parser)]
struct PurlsArgs {
    /// SBOM to list
    input: PathBuf,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge SBOMs of one format into a single document
    Merge(MergeArgs),

    /// Make a built image the root of an SBOM
    AddImageRef(AddImageRefArgs),

    /// Record the base images of a build in an SBOM
    AddBaseImages(AddBaseImagesArgs),

    /// Generate the SPDX SBOM of an image index
    IndexImage(IndexImageArgs),

    /// Generate an SBOM for artifacts copied by oci-copy
    OciCopy(OciCopyArgs),

    /// Print the purls an SBOM reports as JSON
    Purls(PurlsArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Generate an example .sbom-merge.yaml in the current directory
    Init,
}

/// Effective configuration: defaults, then the config file, then flags
fn load_config(cli: &Cli, synthetic_root_name: Option<String>) -> Result<AppConfig> {
    let mut overrides = AppConfig::builder();
    if let Some(name) = synthetic_root_name {
        overrides = overrides.synthetic_root_name(name);
    }
    if let Some(indent) = cli.indent {
        overrides = overrides.indent(indent);
    }
    let (config, loaded_from) =
        AppConfig::from_file_with_overrides(cli.config.as_deref(), &overrides.build())?;
    if let Some(path) = loaded_from {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("invalid configuration:\n  {}", messages.join("\n  "));
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries the documents
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    match &cli.command {
        Commands::Merge(args) => {
            let config = load_config(&cli, args.synthetic_root_name.clone())?;
            cli::run_merge(
                &config,
                &args.inputs,
                args.format.map(Into::into),
                &OutputTarget::from_option(args.output_file.clone()),
            )
        }

        Commands::AddImageRef(args) => {
            let config = load_config(&cli, None)?;
            cli::run_add_image_ref(
                &config,
                &args.input,
                &args.image_url,
                &args.image_digest,
                &OutputTarget::from_option(args.output_file.clone()),
            )
        }

        Commands::AddBaseImages(args) => {
            let config = load_config(&cli, None)?;
            let target = args.output_file.clone().unwrap_or_else(|| args.sbom.clone());
            cli::run_add_base_images(
                &config,
                &args.sbom,
                &args.parsed_dockerfile,
                &args.base_images_digests,
                &OutputTarget::File(target),
            )
        }

        Commands::IndexImage(args) => {
            let config = load_config(&cli, None)?;
            cli::run_index_image(
                &config,
                &args.image_index_url,
                &args.image_index_digest,
                &args.inspect_input_file,
                &OutputTarget::from_option(args.output_file.clone()),
            )
        }

        Commands::OciCopy(args) => {
            let config = load_config(&cli, None)?;
            cli::run_oci_copy(
                &config,
                &args.input,
                args.sbom_type.into(),
                &OutputTarget::from_option(args.output_file.clone()),
            )
        }

        Commands::Purls(args) => {
            let config = load_config(&cli, None)?;
            cli::run_purls(
                &config,
                &args.input,
                &OutputTarget::from_option(args.output_file.clone()),
            )
        }

        Commands::Completions { shell } => {
            generate(*shell, &mut Cli::command(), "sbom-merge", &mut io::stdout());
            Ok(())
        }

        Commands::ConfigSchema { output } => {
            let schema = config::generate_json_schema()?;
            write_output(&schema, &OutputTarget::from_option(output.clone()))
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let (config, loaded_from) = config::load_or_default(cli.config.as_deref())?;
                if let Some(path) = &loaded_from {
                    eprintln!("# Loaded from: {}", path.display());
                } else {
                    eprintln!("# No config file found; showing defaults");
                }
                let yaml =
                    serde_yaml_ng::to_string(&config).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(())
            }
            ConfigAction::Path => {
                let search_paths: [Option<String>; 3] = [
                    std::env::current_dir()
                        .ok()
                        .map(|p| p.display().to_string()),
                    ::dirs::config_dir()
                        .map(|p| p.join(config::CONFIG_DIR_NAME).display().to_string()),
                    ::dirs::home_dir().map(|p| p.display().to_string()),
                ];
                eprintln!("Config file search paths (in order, git root after the first):");
                for path in search_paths.into_iter().flatten() {
                    eprintln!("  {path}");
                }
                eprintln!();
                eprintln!("Recognized file names:");
                for name in config::CONFIG_FILE_NAMES {
                    eprintln!("  {name}");
                }
                eprintln!();
                match config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("Active config file: {}", path.display()),
                    None => eprintln!("No config file found."),
                }
                Ok(())
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(".sbom-merge.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                std::fs::write(&target, config::generate_example_config())
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(())
            }
        },
    }
}
