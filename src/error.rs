//! Unified error types for sbom-merge.
//!
//! Every failure is fatal: a bad input document aborts the whole operation
//! before anything is written.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sbom-merge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SbomMergeError {
    /// Malformed or incomplete input, or a graph that cannot be written
    #[error("Invalid SBOM document: {context}")]
    Format {
        context: String,
        #[source]
        source: FormatErrorKind,
    },

    /// A node carries a purl that is not a valid package URL
    #[error("Identity conflict for purl '{purl}': {reason}")]
    IdentityConflict { purl: String, reason: String },

    /// The requested or detected SBOM format has no adapter
    #[error("Unsupported SBOM format: {0}")]
    UnsupportedFormat(String),

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid operation arguments (image references, digests, stage files)
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific format error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FormatErrorKind {
    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {field} in {context}")]
    MissingField { field: String, context: String },

    #[error("Invalid field value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Edge {source_id} -[{kind}]-> {target_id} references an unknown element")]
    DanglingEdge {
        source_id: String,
        kind: String,
        target_id: String,
    },

    #[error("Root element '{0}' is not part of the document")]
    MissingRoot(String),

    #[error("Cannot merge documents of different formats: {0} and {1}")]
    MismatchedFormats(String, String),

    #[error("{format} cannot express relationship '{kind}'")]
    UnrepresentableRelationship { format: String, kind: String },
}

/// Convenient Result type for sbom-merge operations
pub type Result<T> = std::result::Result<T, SbomMergeError>;

impl SbomMergeError {
    /// Create a format error with context
    pub fn format(context: impl Into<String>, source: FormatErrorKind) -> Self {
        Self::Format {
            context: context.into(),
            source,
        }
    }

    /// Create a format error for a missing field
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::format(
            "missing required field",
            FormatErrorKind::MissingField {
                field: field.into(),
                context: context.into(),
            },
        )
    }

    /// Create a format error for a field with an unusable value
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::format(
            "invalid field value",
            FormatErrorKind::InvalidValue {
                field: field.into(),
                message: message.into(),
            },
        )
    }

    /// Create an identity conflict for an unparseable purl
    pub fn identity_conflict(purl: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IdentityConflict {
            purl: purl.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(name: impl Into<String>) -> Self {
        Self::UnsupportedFormat(name.into())
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for SbomMergeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SbomMergeError {
    fn from(err: serde_json::Error) -> Self {
        Self::format(
            "JSON deserialization",
            FormatErrorKind::InvalidJson(err.to_string()),
        )
    }
}

/// Extension trait for adding context to errors.
///
/// The new context is prepended to whatever context the error already
/// carries, so a failure deep in an adapter reads
/// `"parsing inputs/a.json: component 'x': missing required field"`.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<SbomMergeError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

fn add_context_to_error(err: SbomMergeError, new_ctx: &str) -> SbomMergeError {
    match err {
        SbomMergeError::Format {
            context: existing,
            source,
        } => SbomMergeError::Format {
            context: chain_context(new_ctx, &existing),
            source,
        },
        SbomMergeError::IdentityConflict { purl, reason } => SbomMergeError::IdentityConflict {
            purl,
            reason: chain_context(new_ctx, &reason),
        },
        SbomMergeError::UnsupportedFormat(msg) => {
            SbomMergeError::UnsupportedFormat(chain_context(new_ctx, &msg))
        }
        SbomMergeError::Io {
            path,
            message,
            source,
        } => SbomMergeError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        SbomMergeError::Config(msg) => SbomMergeError::Config(chain_context(new_ctx, &msg)),
        SbomMergeError::Validation(msg) => {
            SbomMergeError::Validation(chain_context(new_ctx, &msg))
        }
    }
}

/// Returns `"new: existing"`, or just `new` when nothing was there yet.
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to a validation error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;

    /// Convert None to a validation error with context from a closure.
    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| SbomMergeError::Validation(context.into()))
    }

    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.ok_or_else(|| SbomMergeError::Validation(f().into()))
    }
}
