//! Compilation pipeline tests: line scanning, block assembly, directive
//! handling, and artifact round-trips.

use anyhow::Result;
use fuselang::{Compiler, Error, LanguageTag};

fn compile(source: &str) -> Result<fuselang::Artifact> {
    Ok(Compiler::default().compile(source, "test.lf")?.artifact)
}

#[test]
fn test_block_assembly_function_definition() -> Result<()> {
    // A def line, two deeper-indented lines, then a same-indentation
    // trailing line: one 3-line block plus a separate block.
    let source = "py.def f(x):\n    py.z = x + 1\n    py.return z\npy.y = f(1)";
    let artifact = compile(source)?;
    let blocks = &artifact.program.blocks;

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].raw_fragments.len(), 3);
    assert!(blocks[0].content.starts_with("def f(x):"));
    assert!(blocks[0].content.contains("    return z"));
    assert_eq!(blocks[1].content, "y = f(1)");
    Ok(())
}

#[test]
fn test_brace_continuation_groups_cpp() -> Result<()> {
    let source = "cpp.if (x > 0) {\ncpp.    printf(\"pos\");\ncpp.}";
    let artifact = compile(source)?;

    assert_eq!(artifact.program.blocks.len(), 1);
    assert_eq!(artifact.program.blocks[0].raw_fragments.len(), 3);
    Ok(())
}

#[test]
fn test_interleaved_languages_preserve_order() -> Result<()> {
    let source = "py.x = 1\ncpp.printf(\"a\");\npy.y = 2\njs.console.log(1)";
    let artifact = compile(source)?;

    let tags: Vec<LanguageTag> = artifact.program.blocks.iter().map(|b| b.tag).collect();
    assert_eq!(
        tags,
        vec![
            LanguageTag::Py,
            LanguageTag::Cpp,
            LanguageTag::Py,
            LanguageTag::Js
        ]
    );
    Ok(())
}

#[test]
fn test_directives_repeatable_and_ordered() -> Result<()> {
    let source = "#native_import \"math\"\n#native_import \"random\"\npy.x = 1";
    let artifact = compile(source)?;

    assert_eq!(
        artifact.program.directive_values("native_import"),
        vec!["math", "random"]
    );
    Ok(())
}

#[test]
fn test_unknown_directive_is_warning_not_error() -> Result<()> {
    let compilation = Compiler::default().compile("#nonsense \"v\"\npy.x = 1", "w.lf")?;
    assert_eq!(compilation.warnings.len(), 1);
    assert!(compilation.warnings[0].message.contains("nonsense"));
    Ok(())
}

#[test]
fn test_invalid_native_import_module_name() {
    let err = Compiler::default()
        .compile("#native_import \"no spaces\"", "b.lf")
        .unwrap_err();
    assert!(matches!(err, Error::SyntaxError { line: 1, .. }));
}

#[test]
fn test_artifact_round_trip_identity() -> Result<()> {
    let source = "#name \"RT\"\n// comment\npy.x = 1\n    py.y = 2\ncpp.printf(\"%d\", 1);";
    let artifact = compile(source)?;

    let decoded = fuselang::Artifact::decode(&artifact.encode()?)?;
    assert!(decoded.program.same_content(&artifact.program));
    // Everything except timestamps is preserved exactly.
    assert_eq!(decoded.metadata, artifact.metadata);
    Ok(())
}

#[test]
fn test_package_round_trip() -> Result<()> {
    let artifact = compile("#name \"P\"\npy.x = 1\njs.console.log(x)")?;
    let bytes = fuselang::package(&artifact)?;
    let (restored, manifest) = fuselang::load_package(&bytes)?;

    assert!(restored.program.same_content(&artifact.program));
    assert_eq!(manifest.metadata.source_hash, artifact.program.source_hash);
    assert_eq!(manifest.execution_order.len(), 2);
    Ok(())
}

#[test]
fn test_unknown_language_tag_aborts() {
    let err = Compiler::default()
        .compile("py.x = 1\nperl.print 1", "u.lf")
        .unwrap_err();
    match err {
        Error::UnknownLanguage { tag, line } => {
            assert_eq!(tag, "perl");
            assert_eq!(line, 2);
        }
        other => panic!("expected UnknownLanguage, got {other:?}"),
    }
}

#[test]
fn test_analyze_reports_structure() -> Result<()> {
    let source = "#name \"A\"\n// note\npy.x = 1\npy.y = 2\ncpp.printf(\"c\");\n\nrust.let z = 1;";
    let analysis = fuselang::analyze(source)?;

    assert_eq!(analysis.total_lines, 7);
    assert_eq!(analysis.directive_count, 1);
    assert_eq!(analysis.comment_count, 1);
    assert_eq!(analysis.blank_count, 1);
    assert_eq!(analysis.code_lines[&LanguageTag::Py], 2);
    assert_eq!(analysis.code_lines[&LanguageTag::Rust], 1);
    Ok(())
}
