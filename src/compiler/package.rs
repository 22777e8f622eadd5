use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::Artifact;
use crate::error::{Error, Result};
use crate::parser::{LanguageTag, ProgramStats};

/// Package manifest format version
pub const PACKAGE_FORMAT_VERSION: &str = "LF-Package-3.0";

/// Characters of block content kept in the manifest execution order
const PREVIEW_LEN: usize = 100;

/// Manifest describing package contents and execution order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package format version tag
    pub format_version: String,
    /// Summary metadata mirrored from the artifact
    pub metadata: PackageMetadata,
    /// Extracted per-language source files
    pub files: Vec<PackageFile>,
    /// Block execution order with previews
    pub execution_order: Vec<ExecutionStep>,
    /// Program statistics
    pub stats: ProgramStats,
}

/// Package-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Compiler identifier
    pub compiler_id: String,
    /// Base name of the source file
    pub source_file: String,
    /// Source hash of the embedded artifact
    pub source_hash: String,
    /// Security level the artifact was compiled under
    pub security_level: String,
    /// Optimization level
    pub optimization_level: u8,
}

/// One extracted source file inside the package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageFile {
    /// File name inside the archive (e.g. `code.py`)
    pub name: String,
    /// Toolchain the file needs, as a language tag
    #[serde(rename = "type")]
    pub tag: LanguageTag,
    /// Content size in bytes
    pub size: usize,
}

/// One step of the execution order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// Language of the block
    #[serde(rename = "type")]
    pub tag: LanguageTag,
    /// First source line of the block
    pub line: usize,
    /// First characters of the block content
    pub content_preview: String,
}

/// Creates a `.lfp` package archive from a compiled artifact.
///
/// The archive contains per-language extracted sources (`code.<ext>`),
/// `manifest.json`, and the full artifact as `program.lsf`.
pub fn package(artifact: &Artifact) -> Result<Vec<u8>> {
    let mut by_tag: BTreeMap<LanguageTag, Vec<&str>> = BTreeMap::new();
    for block in &artifact.program.blocks {
        by_tag.entry(block.tag).or_default().push(&block.content);
    }

    let mut files = Vec::new();
    let mut contents = Vec::new();
    for (tag, snippets) in &by_tag {
        let name = format!("code.{}", tag.file_ext());
        let content = snippets.join("\n");
        files.push(PackageFile {
            name: name.clone(),
            tag: *tag,
            size: content.len(),
        });
        contents.push((name, content));
    }

    let manifest = PackageManifest {
        format_version: PACKAGE_FORMAT_VERSION.to_string(),
        metadata: PackageMetadata {
            compiler_id: artifact.metadata.compiler_id.clone(),
            source_file: artifact.metadata.source_file.clone(),
            source_hash: artifact.program.source_hash.clone(),
            security_level: artifact.metadata.security_level.clone(),
            optimization_level: artifact.metadata.optimization_level,
        },
        files,
        execution_order: artifact
            .program
            .blocks
            .iter()
            .map(|b| ExecutionStep {
                tag: b.tag,
                line: b.line,
                content_preview: b.content.chars().take(PREVIEW_LEN).collect(),
            })
            .collect(),
        stats: artifact.program.stats,
    };

    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| Error::Artifact(format!("manifest encode failed: {}", e)))?;
    let lsf_json = artifact.encode()?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in &contents {
        write_entry(&mut writer, name, content, options)?;
    }
    write_entry(&mut writer, "manifest.json", &manifest_json, options)?;
    write_entry(&mut writer, "program.lsf", &lsf_json, options)?;

    let cursor = writer
        .finish()
        .map_err(|e| Error::Artifact(format!("package write failed: {}", e)))?;
    Ok(cursor.into_inner())
}

fn write_entry(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    content: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    writer
        .start_file(name, options)
        .and_then(|_| writer.write_all(content.as_bytes()).map_err(Into::into))
        .map_err(|e| Error::Artifact(format!("package entry '{}' failed: {}", name, e)))
}

/// Loads an artifact back out of a package, verifying that the manifest
/// hash matches the embedded artifact.
pub fn load_package(bytes: &[u8]) -> Result<(Artifact, PackageManifest)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Artifact(format!("package open failed: {}", e)))?;

    let manifest_json = read_entry(&mut archive, "manifest.json")?;
    let manifest: PackageManifest = serde_json::from_str(&manifest_json)
        .map_err(|e| Error::Artifact(format!("manifest decode failed: {}", e)))?;

    let lsf_json = read_entry(&mut archive, "program.lsf")?;
    let artifact = Artifact::decode(&lsf_json)?;

    if manifest.metadata.source_hash != artifact.program.source_hash {
        return Err(Error::Integrity {
            recorded: manifest.metadata.source_hash,
            computed: artifact.program.source_hash,
        });
    }

    Ok((artifact, manifest))
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| Error::Artifact(format!("package entry '{}' missing: {}", name, e)))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| Error::Artifact(format!("package entry '{}' unreadable: {}", name, e)))?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    fn sample_artifact() -> Artifact {
        let source = "#name \"Pkg\"\npy.x = 1\ncpp.printf(\"hi\");\njs.console.log(1)";
        Compiler::default()
            .compile(source, "pkg.lf")
            .unwrap()
            .artifact
    }

    #[test]
    fn test_package_round_trip() {
        let artifact = sample_artifact();
        let bytes = package(&artifact).unwrap();
        let (loaded, manifest) = load_package(&bytes).unwrap();

        assert!(loaded.program.same_content(&artifact.program));
        assert_eq!(manifest.format_version, PACKAGE_FORMAT_VERSION);
        assert_eq!(manifest.execution_order.len(), 3);
        assert_eq!(manifest.stats, artifact.program.stats);
    }

    #[test]
    fn test_package_extracts_per_language_files() {
        let artifact = sample_artifact();
        let bytes = package(&artifact).unwrap();
        let (_, manifest) = load_package(&bytes).unwrap();

        let names: Vec<_> = manifest.files.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"code.py"));
        assert!(names.contains(&"code.cpp"));
        assert!(names.contains(&"code.js"));
    }

    #[test]
    fn test_tampered_hash_is_integrity_error() {
        let artifact = sample_artifact();
        let mut tampered = artifact.clone();
        tampered.program.source_hash = "deadbeefdeadbeef".to_string();

        // Repackage with a manifest built from the original but the
        // tampered artifact body.
        let bytes = package(&tampered).unwrap();
        let (loaded, _) = load_package(&bytes).unwrap();
        assert_eq!(loaded.program.source_hash, "deadbeefdeadbeef");

        // Cross-check: a manifest from one artifact with another's body.
        let good_bytes = package(&artifact).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(good_bytes.as_slice())).unwrap();
        let manifest_json = {
            let mut s = String::new();
            archive
                .by_name("manifest.json")
                .unwrap()
                .read_to_string(&mut s)
                .unwrap();
            s
        };

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("manifest.json", options).unwrap();
        writer.write_all(manifest_json.as_bytes()).unwrap();
        writer.start_file("program.lsf", options).unwrap();
        writer
            .write_all(tampered.encode().unwrap().as_bytes())
            .unwrap();
        let forged = writer.finish().unwrap().into_inner();

        let err = load_package(&forged).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
    }
}
