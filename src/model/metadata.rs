//! Document metadata and per-node value types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// SBOM wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SbomFormat {
    CycloneDx,
    Spdx,
}

impl fmt::Display for SbomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycloneDx => write!(f, "CycloneDX"),
            Self::Spdx => write!(f, "SPDX"),
        }
    }
}

impl std::str::FromStr for SbomFormat {
    type Err = crate::error::SbomMergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cyclonedx" | "cdx" => Ok(Self::CycloneDx),
            "spdx" => Ok(Self::Spdx),
            other => Err(crate::error::SbomMergeError::unsupported_format(other)),
        }
    }
}

/// How CycloneDX `metadata.tools` is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolStyle {
    /// CycloneDX 1.4: a plain array of `{vendor, name, version}`
    Legacy,
    /// CycloneDX 1.5+: `{"components": [...], "services": [...]}`
    Structured,
}

/// Who produced a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub kind: CreatorKind,
    pub name: String,
    pub version: Option<String>,
    /// Unmodeled fields of structured CycloneDX tools
    pub extra: Map<String, Value>,
}

impl Creator {
    /// Create a tool creator
    pub fn tool(name: impl Into<String>) -> Self {
        Self {
            kind: CreatorKind::Tool,
            name: name.into(),
            version: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatorKind {
    Tool,
    Service,
    Organization,
    Person,
}

impl CreatorKind {
    /// SPDX `creators` prefix
    #[must_use]
    pub const fn spdx_prefix(self) -> &'static str {
        match self {
            Self::Tool | Self::Service => "Tool",
            Self::Organization => "Organization",
            Self::Person => "Person",
        }
    }
}

/// Document-level metadata.
///
/// `extra` holds top-level wire fields the model does not interpret, and
/// `creation_extra` the unmodeled fields of CycloneDX `metadata` or SPDX
/// `creationInfo`; both are written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub format: SbomFormat,
    /// `specVersion` / `spdxVersion`
    pub spec_version: String,
    /// SPDX `SPDXID` of the document itself
    pub document_id: Option<String>,
    /// SPDX document name
    pub name: Option<String>,
    /// SPDX `documentNamespace` / CycloneDX `serialNumber`
    pub namespace: Option<String>,
    /// Creation timestamp, kept as written
    pub created: Option<String>,
    pub creators: Vec<Creator>,
    pub tool_style: Option<ToolStyle>,
    pub creation_extra: Map<String, Value>,
    pub extra: Map<String, Value>,
}

impl DocumentMetadata {
    /// Empty metadata for a format
    #[must_use]
    pub fn new(format: SbomFormat, spec_version: impl Into<String>) -> Self {
        Self {
            format,
            spec_version: spec_version.into(),
            document_id: None,
            name: None,
            namespace: None,
            created: None,
            creators: Vec::new(),
            tool_style: None,
            creation_extra: Map::new(),
            extra: Map::new(),
        }
    }

    /// Fold another document's metadata in: scalars keep the first value,
    /// creators and unknown fields are unioned.
    pub fn absorb(&mut self, other: &Self) {
        fill(&mut self.document_id, &other.document_id);
        fill(&mut self.name, &other.name);
        fill(&mut self.namespace, &other.namespace);
        fill(&mut self.created, &other.created);
        if self.tool_style.is_none() {
            self.tool_style = other.tool_style;
        }
        for creator in &other.creators {
            if !self.creators.contains(creator) {
                self.creators.push(creator.clone());
            }
        }
        super::sbom::merge_extra(&mut self.creation_extra, &other.creation_extra);
        super::sbom::merge_extra(&mut self.extra, &other.extra);
    }
}

fn fill(slot: &mut Option<String>, other: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(other);
    }
}

/// Whether an element is a package/component or an SPDX file entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ElementKind {
    #[default]
    Package,
    File,
}

/// Hash algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Blake2b256,
    Blake2b384,
    Blake2b512,
    Blake3,
    Other(String),
}

impl HashAlgorithm {
    /// Parse an algorithm name as written by either format
    /// (`SHA-256`, `SHA256`, `sha256` all map to [`HashAlgorithm::Sha256`]).
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "MD5" => Self::Md5,
            "SHA1" => Self::Sha1,
            "SHA224" => Self::Sha224,
            "SHA256" => Self::Sha256,
            "SHA384" => Self::Sha384,
            "SHA512" => Self::Sha512,
            "SHA3256" => Self::Sha3_256,
            "SHA3384" => Self::Sha3_384,
            "SHA3512" => Self::Sha3_512,
            "BLAKE2B256" => Self::Blake2b256,
            "BLAKE2B384" => Self::Blake2b384,
            "BLAKE2B512" => Self::Blake2b512,
            "BLAKE3" => Self::Blake3,
            _ => Self::Other(name.to_string()),
        }
    }

    /// CycloneDX `alg` spelling
    #[must_use]
    pub fn cyclonedx_name(&self) -> String {
        self.to_string()
    }

    /// SPDX `algorithm` spelling
    #[must_use]
    pub fn spdx_name(&self) -> String {
        match self {
            Self::Md5 => "MD5".to_string(),
            Self::Sha1 => "SHA1".to_string(),
            Self::Sha224 => "SHA224".to_string(),
            Self::Sha256 => "SHA256".to_string(),
            Self::Sha384 => "SHA384".to_string(),
            Self::Sha512 => "SHA512".to_string(),
            Self::Other(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA-1"),
            Self::Sha224 => write!(f, "SHA-224"),
            Self::Sha256 => write!(f, "SHA-256"),
            Self::Sha384 => write!(f, "SHA-384"),
            Self::Sha512 => write!(f, "SHA-512"),
            Self::Sha3_256 => write!(f, "SHA3-256"),
            Self::Sha3_384 => write!(f, "SHA3-384"),
            Self::Sha3_512 => write!(f, "SHA3-512"),
            Self::Blake2b256 => write!(f, "BLAKE2b-256"),
            Self::Blake2b384 => write!(f, "BLAKE2b-384"),
            Self::Blake2b512 => write!(f, "BLAKE2b-512"),
            Self::Blake3 => write!(f, "BLAKE3"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A checksum of an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash {
    pub algorithm: HashAlgorithm,
    pub value: String,
}

impl Hash {
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Self {
        Self {
            algorithm,
            value: value.into(),
        }
    }

    /// Parse an OCI style digest, `algorithm:hex`
    #[must_use]
    pub fn from_digest(digest: &str) -> Option<Self> {
        let (algorithm, value) = digest.split_once(':')?;
        if algorithm.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self::new(HashAlgorithm::parse(algorithm), value))
    }
}

/// A reference from an element to an external resource.
///
/// CycloneDX fills `kind` and `locator` from `type` and `url`; SPDX fills all
/// four from `referenceType`, `referenceLocator`, `referenceCategory` and
/// `comment`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalReference {
    pub kind: String,
    pub locator: String,
    pub category: Option<String>,
    pub comment: Option<String>,
}

impl ExternalReference {
    pub fn new(kind: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            locator: locator.into(),
            category: None,
            comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_spellings() {
        assert_eq!(HashAlgorithm::parse("SHA-256"), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::parse("SHA256"), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::parse("sha256"), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::parse("SHA3-256"), HashAlgorithm::Sha3_256);
        assert_eq!(
            HashAlgorithm::parse("ADLER32"),
            HashAlgorithm::Other("ADLER32".to_string())
        );

        assert_eq!(HashAlgorithm::Sha256.cyclonedx_name(), "SHA-256");
        assert_eq!(HashAlgorithm::Sha256.spdx_name(), "SHA256");
        assert_eq!(HashAlgorithm::Blake2b256.spdx_name(), "BLAKE2b-256");
    }

    #[test]
    fn test_hash_from_digest() {
        let hash = Hash::from_digest("sha256:011f").unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);
        assert_eq!(hash.value, "011f");

        assert!(Hash::from_digest("011f").is_none());
        assert!(Hash::from_digest("sha256:").is_none());
    }

    #[test]
    fn test_metadata_absorb_keeps_first_scalars() {
        let mut first = DocumentMetadata::new(SbomFormat::Spdx, "SPDX-2.3");
        first.name = Some("first".to_string());
        first.creators.push(Creator::tool("syft-1.0"));

        let mut second = DocumentMetadata::new(SbomFormat::Spdx, "SPDX-2.3");
        second.name = Some("second".to_string());
        second.namespace = Some("https://example.com/doc".to_string());
        second.creators.push(Creator::tool("syft-1.0"));
        second.creators.push(Creator::tool("cachi2"));

        first.absorb(&second);
        assert_eq!(first.name.as_deref(), Some("first"));
        assert_eq!(first.namespace.as_deref(), Some("https://example.com/doc"));
        assert_eq!(first.creators.len(), 2);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("cyclonedx".parse::<SbomFormat>().unwrap(), SbomFormat::CycloneDx);
        assert_eq!("SPDX".parse::<SbomFormat>().unwrap(), SbomFormat::Spdx);
        assert!("swid".parse::<SbomFormat>().is_err());
    }
}
