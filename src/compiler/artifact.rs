use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::Program;
use crate::security::SecurityLevel;

/// LSF format version emitted by this compiler
pub const FORMAT_VERSION: &str = "LSF-3.0";

/// Compile-time metadata carried by the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Compiler identifier
    pub compiler_id: String,
    /// Base name of the source file
    pub source_file: String,
    /// Path the source was compiled from, as given
    pub source_path: String,
    /// Compilation timestamp (RFC 3339); excluded from round-trip
    /// equality
    pub compile_time: String,
    /// Security level the artifact was compiled under
    pub security_level: String,
    /// Optimization level (informational)
    pub optimization_level: u8,
}

impl ArtifactMetadata {
    /// Builds metadata stamped with the current time
    pub fn now(source_name: &str, level: SecurityLevel, optimization_level: u8) -> Self {
        let source_file = std::path::Path::new(source_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_name.to_string());

        ArtifactMetadata {
            compiler_id: super::COMPILER_ID.to_string(),
            source_file,
            source_path: source_name.to_string(),
            compile_time: chrono::Utc::now().to_rfc3339(),
            security_level: level.to_string(),
            optimization_level,
        }
    }
}

/// The persisted compiled artifact (LSF snapshot)
///
/// Decoding then re-encoding yields the same field values; the embedded
/// [`Program`] is reproduced bit-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Snapshot format version tag
    pub format_version: String,
    /// Compile-time metadata
    pub metadata: ArtifactMetadata,
    /// The parsed program
    pub program: Program,
}

impl Artifact {
    /// Wraps a program and metadata under the current format version
    pub fn new(program: Program, metadata: ArtifactMetadata) -> Self {
        Artifact {
            format_version: FORMAT_VERSION.to_string(),
            metadata,
            program,
        }
    }

    /// Serializes the artifact to pretty-printed JSON
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Artifact(format!("encode failed: {}", e)))
    }

    /// Deserializes an artifact, checking the format version and hash
    /// shape
    pub fn decode(json: &str) -> Result<Artifact> {
        let artifact: Artifact = serde_json::from_str(json)
            .map_err(|e| Error::Artifact(format!("decode failed: {}", e)))?;

        if !artifact.format_version.starts_with("LSF-") {
            return Err(Error::Artifact(format!(
                "unsupported format version '{}'",
                artifact.format_version
            )));
        }

        let hash = &artifact.program.source_hash;
        if hash.len() != 16 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Integrity {
                recorded: hash.clone(),
                computed: "<malformed>".to_string(),
            });
        }

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    #[test]
    fn test_round_trip_preserves_program() {
        let source = "#name \"Trip\"\npy.x = 1\n    py.y = 2";
        let artifact = Compiler::default()
            .compile(source, "trip.lf")
            .unwrap()
            .artifact;

        let json = artifact.encode().unwrap();
        let decoded = Artifact::decode(&json).unwrap();

        assert!(decoded.program.same_content(&artifact.program));
        assert_eq!(decoded.format_version, artifact.format_version);
        assert_eq!(decoded.metadata, artifact.metadata);
    }

    #[test]
    fn test_decode_rejects_bad_version() {
        let source = "py.x = 1";
        let mut artifact = Compiler::default()
            .compile(source, "v.lf")
            .unwrap()
            .artifact;
        artifact.format_version = "XYZ-9".to_string();

        let json = serde_json::to_string(&artifact).unwrap();
        assert!(Artifact::decode(&json).is_err());
    }

    #[test]
    fn test_decode_rejects_malformed_hash() {
        let source = "py.x = 1";
        let mut artifact = Compiler::default()
            .compile(source, "h.lf")
            .unwrap()
            .artifact;
        artifact.program.source_hash = "nothex".to_string();

        let json = serde_json::to_string(&artifact).unwrap();
        let err = Artifact::decode(&json).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
    }
}
