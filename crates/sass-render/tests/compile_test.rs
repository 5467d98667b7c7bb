//! Integration tests for immediate-mode compilation.
//!
//! Covers:
//! - default formatting and indentation/line-ending options
//! - diagnostics for the entry and for imported files
//! - import resolution through include roots, partials and hooks
//! - included-file bookkeeping
//! - warnings and debug notices reaching the message sink

use std::path::{Path, PathBuf};
use std::sync::Arc;

use insta::assert_snapshot;
use sass_render::{
    BufferSink, CompileError, CompileRequest, Compiler, HookResolution, ImportContext,
    MemoryRuntime, NormalizationError, render_sync,
};

fn compiler(rt: MemoryRuntime) -> Compiler {
    Compiler::new(Arc::new(rt))
}

fn css(rt: MemoryRuntime, request: CompileRequest) -> String {
    compiler(rt).compile(&request).unwrap().css
}

fn diagnostic(rt: MemoryRuntime, request: CompileRequest) -> sass_render::CompileDiagnostic {
    match compiler(rt).compile(&request) {
        Err(CompileError::Diagnostic(d)) => d,
        other => panic!("expected a diagnostic, got {:?}", other),
    }
}

// ============================================================================
// Output formatting
// ============================================================================

#[test]
fn test_default_output() {
    let out = css(MemoryRuntime::new(), CompileRequest::from_source("a {b: c}"));
    assert_eq!(out, "a {\n  b: c;\n}");
}

#[test]
fn test_tab_indentation() {
    let out = css(
        MemoryRuntime::new(),
        CompileRequest::from_source("a {b: c}").with_indent_type("tab"),
    );
    assert_eq!(out, "a {\n\t\tb: c;\n}");
}

#[test]
fn test_crlf_line_endings() {
    let out = css(
        MemoryRuntime::new(),
        CompileRequest::from_source("a {b: c}").with_line_ending("crlf"),
    );
    assert_eq!(out, "a {\r\n  b: c;\r\n}");
}

#[test]
fn test_unrecognized_options_fall_back() {
    let request = CompileRequest::from_source("a {b: c}")
        .with_indent_type("dots")
        .with_indent_width("lots")
        .with_line_ending("unix");
    assert_eq!(css(MemoryRuntime::new(), request), "a {\n  b: c;\n}");
}

#[test]
fn test_indentation_monotonic_in_width() {
    let source = "a { b { c: d; } }";
    let mut previous = 0;
    for width in 0..=10usize {
        let out = css(
            MemoryRuntime::new(),
            CompileRequest::from_source(source).with_indent_width(width),
        );
        let indent = out
            .lines()
            .map(|l| l.len() - l.trim_start_matches(' ').len())
            .max()
            .unwrap_or(0);
        assert!(indent >= previous, "width {} shrank indentation", width);
        previous = indent;
    }
}

#[test]
fn test_compressed_output() {
    let out = css(
        MemoryRuntime::new(),
        CompileRequest::from_source("a {b: c}").with_output_style("compressed"),
    );
    assert_eq!(out, "a{b:c}");
}

#[test]
fn test_indented_syntax_entry() {
    let rt = MemoryRuntime::new().with_file("/project/theme.sass", "a\n  b: c\n");
    let out = css(rt, CompileRequest::from_path("theme.sass"));
    assert_eq!(out, "a {\n  b: c;\n}");
}

// ============================================================================
// Request validation
// ============================================================================

#[test]
fn test_missing_source() {
    let err = compiler(MemoryRuntime::new())
        .compile(&CompileRequest::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Normalization(NormalizationError::MissingSource)
    ));
}

#[test]
fn test_unsupported_output_style() {
    let err = compiler(MemoryRuntime::new())
        .compile(&CompileRequest::from_source("a {b: c}").with_output_style("pretty"))
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Normalization(NormalizationError::UnsupportedOutputStyle(ref s)) if s == "pretty"
    ));
}

#[test]
fn test_source_text_with_nonexistent_path() {
    let result = compiler(MemoryRuntime::new())
        .compile(&CompileRequest::from_source("a {b: c}").with_source_path("/nowhere/main.scss"))
        .unwrap();
    assert_eq!(result.css, "a {\n  b: c;\n}");
    assert_eq!(result.stats.entry, "/nowhere/main.scss");
    assert!(result.included_files.is_empty());
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_entry_diagnostic_location() {
    let d = diagnostic(
        MemoryRuntime::new(),
        CompileRequest::from_source("a {b: }").with_source_path("/styles/main.scss"),
    );
    assert_eq!(d.message, "Expected expression.");
    assert_eq!((d.line, d.column), (1, 7));
    assert_eq!(d.file, "/styles/main.scss");
    assert_eq!(
        d.to_string(),
        "Expected expression.\n  /styles/main.scss 1:7  root stylesheet"
    );
    assert_snapshot!(d.formatted(), @r"
    Error: Expected expression.
    a {b: }
          ^
      /styles/main.scss 1:7  root stylesheet
    ");
}

#[test]
fn test_stdin_diagnostic_label() {
    let d = diagnostic(MemoryRuntime::new(), CompileRequest::from_source("a {b: }"));
    assert_eq!(d.file, "stdin");
    assert!(d.to_string().ends_with("  stdin 1:7  root stylesheet"));
}

#[test]
fn test_runtime_error_caret_starts_at_expression() {
    let d = diagnostic(
        MemoryRuntime::new(),
        CompileRequest::from_source("a {\n  color: $nope;\n}"),
    );
    assert_eq!(d.message, "Undefined variable.");
    assert_eq!((d.line, d.column), (2, 10));
    assert!(d.caret_line().starts_with("         ^"));
}

#[test]
fn test_diagnostic_uses_line_ending() {
    let d = diagnostic(
        MemoryRuntime::new(),
        CompileRequest::from_source("a {b: }").with_line_ending("crlf"),
    );
    assert_eq!(
        d.formatted(),
        "Error: Expected expression.\r\na {b: }\r\n      ^\r\n  stdin 1:7  root stylesheet"
    );
    assert_eq!(
        d.to_string(),
        "Expected expression.\r\n  stdin 1:7  root stylesheet"
    );
}

#[test]
fn test_diagnostic_in_imported_file() {
    let rt = MemoryRuntime::new()
        .with_file("/project/main.scss", "@import \"broken\";\n")
        .with_file("/project/_broken.scss", "x {\n  y: ;\n}\n");
    let d = diagnostic(rt, CompileRequest::from_path("/project/main.scss"));
    assert_eq!(d.file, "/project/_broken.scss");
    assert_eq!(d.line, 2);
    assert_eq!(d.source_line, "  y: ;");
}

#[test]
fn test_missing_import_is_a_diagnostic() {
    let d = diagnostic(
        MemoryRuntime::new(),
        CompileRequest::from_source("@import \"nowhere\";"),
    );
    assert!(d.message.starts_with("Can't find stylesheet to import"));
    assert_eq!(d.line, 1);
    assert_eq!(d.file, "stdin");
}

#[test]
fn test_unreadable_entry_is_a_diagnostic() {
    let d = diagnostic(
        MemoryRuntime::new(),
        CompileRequest::from_path("/project/missing.scss"),
    );
    assert_eq!((d.line, d.column), (1, 1));
    assert_eq!(d.file, "/project/missing.scss");
    assert_eq!(d.source_line, "");
}

// ============================================================================
// Import resolution
// ============================================================================

#[test]
fn test_include_root_partial() {
    let rt = MemoryRuntime::new()
        .with_file("/project/main.scss", "@import \"test\";\n")
        .with_file("/inc/_test.scss", "a { b: c; }\n");
    let result = compiler(rt)
        .compile(&CompileRequest::from_path("/project/main.scss").with_include_root("/inc"))
        .unwrap();

    assert_eq!(result.css, "a {\n  b: c;\n}");
    assert_eq!(
        result.included_files,
        vec![
            PathBuf::from("/project/main.scss"),
            PathBuf::from("/inc/_test.scss")
        ]
    );
}

#[test]
fn test_entry_directory_beats_include_roots() {
    let rt = MemoryRuntime::new()
        .with_file("/project/_vars.scss", "$c: red;\n")
        .with_file("/inc/_vars.scss", "$c: blue;\n");
    let out = css(
        rt,
        CompileRequest::from_source("@import \"vars\";\na { color: $c; }")
            .with_include_root("/inc"),
    );
    assert_eq!(out, "a {\n  color: red;\n}");
}

#[test]
fn test_include_roots_searched_in_order() {
    let rt = MemoryRuntime::new()
        .with_file("/first/_vars.scss", "$c: red;\n")
        .with_file("/second/vars.scss", "$c: blue;\n");
    let out = css(
        rt,
        CompileRequest::from_source("@import \"vars\";\na { color: $c; }")
            .with_include_root("/first")
            .with_include_root("/second"),
    );
    assert_eq!(out, "a {\n  color: red;\n}");
}

#[test]
fn test_extension_as_written_is_honored() {
    let rt = MemoryRuntime::new()
        .with_file("/project/vars.scss", "$c: red;\n")
        .with_file("/project/vars.sass", "$c: blue\n");
    let out = css(
        rt,
        CompileRequest::from_source("@import \"vars.sass\";\na { color: $c; }"),
    );
    assert_eq!(out, "a {\n  color: blue;\n}");
}

#[test]
fn test_explicit_partial_is_honored() {
    let rt = MemoryRuntime::new()
        .with_file("/project/vars.scss", "$c: red;\n")
        .with_file("/project/_vars.scss", "$c: green;\n");
    let out = css(
        rt,
        CompileRequest::from_source("@import \"_vars\";\na { color: $c; }"),
    );
    assert_eq!(out, "a {\n  color: green;\n}");
}

#[test]
fn test_extensionless_file_does_not_shadow_stylesheet() {
    let rt = MemoryRuntime::new()
        .with_file("/project/colors", "not a stylesheet\n")
        .with_file("/project/colors.scss", "$c: teal;\n");
    let out = css(
        rt,
        CompileRequest::from_source("@import \"colors\";\na { color: $c; }"),
    );
    assert_eq!(out, "a {\n  color: teal;\n}");
}

#[test]
fn test_qualified_import_from_include_root() {
    let rt = MemoryRuntime::new()
        .with_file("/project/main.scss", "@import \"theme.scss\";\n")
        .with_file("/inc/_theme.scss", "a { b: c; }\n");
    let result = compiler(rt)
        .compile(&CompileRequest::from_path("/project/main.scss").with_include_root("/inc"))
        .unwrap();

    assert_eq!(result.css, "a {\n  b: c;\n}");
    assert_eq!(
        result.included_files,
        vec![
            PathBuf::from("/project/main.scss"),
            PathBuf::from("/inc/_theme.scss")
        ]
    );
}

#[test]
fn test_included_files_are_unique() {
    let rt = MemoryRuntime::new()
        .with_file(
            "/project/main.scss",
            "@import \"mixin\";\n@import \"mixin\";\n",
        )
        .with_file("/project/_mixin.scss", "p { q: r; }\n");
    let result = compiler(rt)
        .compile(&CompileRequest::from_path("/project/main.scss"))
        .unwrap();

    assert_eq!(
        result.included_files,
        vec![
            PathBuf::from("/project/main.scss"),
            PathBuf::from("/project/_mixin.scss")
        ]
    );
}

#[test]
fn test_hook_contents() {
    let request = CompileRequest::from_source("@import \"brand\";\na { color: $brand; }")
        .with_importer(|specifier: &str, _: &ImportContext| -> Option<HookResolution> {
            (specifier == "brand").then(|| HookResolution::scss("$brand: blue;"))
        });
    let result = compiler(MemoryRuntime::new()).compile(&request).unwrap();

    assert_eq!(result.css, "a {\n  color: blue;\n}");
    assert!(result.included_files.is_empty());
}

#[test]
fn test_hook_redirect_and_decline() {
    let rt = MemoryRuntime::new()
        .with_file("/project/_brand.scss", "$brand: red;\n")
        .with_file("/vendor/brand.scss", "$brand: green;\n");
    let request = CompileRequest::from_source("@import \"brand\";\na { color: $brand; }")
        .with_importer(|_: &str, _: &ImportContext| -> Option<HookResolution> { None })
        .with_importer(|specifier: &str, _: &ImportContext| -> Option<HookResolution> {
            (specifier == "brand").then(|| HookResolution::File(PathBuf::from("/vendor/brand.scss")))
        });
    let result = compiler(rt).compile(&request).unwrap();

    assert_eq!(result.css, "a {\n  color: green;\n}");
    assert_eq!(
        result.included_files,
        vec![PathBuf::from("/vendor/brand.scss")]
    );
}

// ============================================================================
// Messages
// ============================================================================

#[test]
fn test_warnings_reach_sink() {
    let sink = Arc::new(BufferSink::new());
    let request = CompileRequest::from_source("@warn \"careful\";\na {b: c}").with_sink(sink.clone());
    compiler(MemoryRuntime::new()).compile(&request).unwrap();

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("WARNING: "));
    assert!(lines[0].contains("careful"));
    assert!(lines[0].contains("\n    stdin 1:"));
    assert!(lines[0].ends_with("  root stylesheet"));
}

#[test]
fn test_quiet_suppresses_warnings() {
    let sink = Arc::new(BufferSink::new());
    let request = CompileRequest::from_source("@warn \"careful\";\na {b: c}")
        .with_quiet(true)
        .with_sink(sink.clone());
    compiler(MemoryRuntime::new()).compile(&request).unwrap();
    assert!(sink.lines().is_empty());
}

#[test]
fn test_debug_notices_reach_sink() {
    let sink = Arc::new(BufferSink::new());
    let request = CompileRequest::from_source("a {b: c}\n@debug 42px;").with_sink(sink.clone());
    compiler(MemoryRuntime::new()).compile(&request).unwrap();
    assert_eq!(sink.lines(), vec!["stdin:2 DEBUG: 42px"]);
}

// ============================================================================
// Host filesystem
// ============================================================================

#[test]
fn test_native_include_root() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("R");
    let src = temp.path().join("src");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(root.join("_test.scss"), "a { b: c; }\n").unwrap();
    std::fs::write(src.join("main.scss"), "@import \"test\";\n").unwrap();

    let result =
        render_sync(&CompileRequest::from_path(src.join("main.scss")).with_include_root(&root))
            .unwrap();

    assert_eq!(result.css, "a {\n  b: c;\n}");
    assert_eq!(result.included_files.len(), 2);
    assert!(result.included_files[1].ends_with(Path::new("R/_test.scss")));
}
