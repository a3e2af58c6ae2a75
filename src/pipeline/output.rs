//! Writing documents to stdout or to a file.

use super::PipelineError;
use crate::formats::adapter_for;
use crate::model::Document;
use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Target for output - either stdout or a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to stdout
    Stdout,
    /// Write to a file
    File(PathBuf),
}

impl OutputTarget {
    /// Create output target from optional path
    #[must_use]
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) => Self::File(p),
            None => Self::Stdout,
        }
    }
}

/// Serialize a document with the adapter of its own format
pub fn render_document(document: &Document, indent: usize, annotator: &str) -> Result<String> {
    let adapter = adapter_for(document.metadata.format, annotator);
    Ok(adapter.serialize(document, indent)?)
}

/// Write output to the target.
///
/// Files are written to a temporary file in the same directory and moved
/// into place only once fully written, so a failed run never leaves a
/// truncated output behind.
pub fn write_output(content: &str, target: &OutputTarget) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{content}")?;
            stdout.flush()?;
            Ok(())
        }
        OutputTarget::File(path) => {
            write_atomic(path, content).map_err(|source| PipelineError::WriteFailed {
                path: path.display().to_string(),
                source,
            })?;
            tracing::info!("Output written to {}", path.display());
            Ok(())
        }
    }
}

fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
