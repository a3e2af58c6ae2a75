//! Pipeline orchestration for SBOM operations.
//!
//! Shared read → transform → write plumbing for the CLI command handlers.
//! Errors here are `anyhow` errors carrying the file they concern.

mod output;
mod parse;

pub use output::{render_document, write_output, OutputTarget};
pub use parse::{parse_flavoured_inputs, parse_inputs, parse_sbom_with_context, read_input};

/// Structured pipeline error types for better diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to read or parse an SBOM file
    #[error("Parse failed for {path}: {source}")]
    ParseFailed {
        path: String,
        source: anyhow::Error,
    },

    /// Failed to write the output file
    #[error("Writing {path} failed: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
