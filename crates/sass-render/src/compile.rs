//! Running a compilation and assembling its result.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Two execution modes share one pipeline:
//! - immediate: [`Compiler::compile`] / [`render_sync`] run on the caller's thread
//! - deferred: [`Compiler::compile_deferred`] / [`render`] hand the same work to
//!   tokio's blocking pool and resolve with an identical outcome

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sass_render_runtime::{NativeRuntime, SystemRuntime};
use serde::Serialize;

use crate::diagnostic::CompileDiagnostic;
use crate::error::CompileError;
use crate::format::format_output;
use crate::fs::ResolvingFs;
use crate::messages::SinkLogger;
use crate::plan::{CompilePlan, normalize};
use crate::request::CompileRequest;

/// Timing and provenance of one compilation. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileStats {
    /// Entry label: the absolute entry path or `stdin`
    pub entry: String,
    pub start: i64,
    pub end: i64,
    /// `end - start`
    pub duration: i64,
}

/// A successful compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub css: String,
    pub stats: CompileStats,
    /// Every real stylesheet that went into `css`, once each, in the order
    /// first loaded. The entry comes first when it exists on disk.
    pub included_files: Vec<PathBuf>,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Compiles requests against a [`SystemRuntime`].
#[derive(Clone)]
pub struct Compiler {
    runtime: Arc<dyn SystemRuntime>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::native()
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("runtime", &"<SystemRuntime>")
            .finish()
    }
}

impl Compiler {
    pub fn new(runtime: Arc<dyn SystemRuntime>) -> Self {
        Self { runtime }
    }

    /// A compiler reading from the host filesystem.
    pub fn native() -> Self {
        Self::new(Arc::new(NativeRuntime::new()))
    }

    pub fn runtime(&self) -> &dyn SystemRuntime {
        self.runtime.as_ref()
    }

    /// Normalize and compile on the current thread.
    pub fn compile(&self, request: &CompileRequest) -> Result<CompileResult, CompileError> {
        let plan = normalize(request, self.runtime.as_ref())?;
        Ok(self.compile_plan(&plan)?)
    }

    /// Compile an already normalized plan.
    pub fn compile_plan(&self, plan: &CompilePlan) -> Result<CompileResult, CompileDiagnostic> {
        let start = now_millis();

        let fs = ResolvingFs::new(self.runtime.as_ref(), plan);
        let logger = SinkLogger::new(plan.sink.as_ref(), &fs, plan.quiet);
        let load_paths = plan.roots();
        let options = grass::Options::default()
            .fs(&fs)
            .logger(&logger)
            .load_paths(&load_paths)
            .style(plan.output_style.compiler_style())
            .input_syntax(plan.input_syntax())
            .quiet(plan.quiet)
            .allows_charset(plan.charset);

        let css = grass::from_path(&plan.entry_path, &options).map_err(|err| {
            let diagnostic = CompileDiagnostic::from_compiler(err, &fs, &plan.entry_label)
                .with_line_ending(plan.line_ending);
            tracing::debug!(
                entry = %plan.entry_label,
                file = %diagnostic.file,
                line = diagnostic.line,
                column = diagnostic.column,
                "Compilation failed"
            );
            diagnostic
        })?;

        let css = format_output(&css, plan.output_style, plan.indentation, plan.line_ending);
        let included_files = fs.included_files();
        let end = now_millis();

        tracing::debug!(
            entry = %plan.entry_label,
            files = included_files.len(),
            duration_ms = end - start,
            "Compiled stylesheet"
        );

        Ok(CompileResult {
            css,
            stats: CompileStats {
                entry: plan.entry_label.clone(),
                start,
                end,
                duration: end - start,
            },
            included_files,
        })
    }

    /// Run [`Compiler::compile`] on the blocking pool.
    ///
    /// Must be awaited inside a tokio runtime. A panic inside the
    /// compilation resumes on the awaiting task.
    pub async fn compile_deferred(
        &self,
        request: CompileRequest,
    ) -> Result<CompileResult, CompileError> {
        let compiler = self.clone();
        match tokio::task::spawn_blocking(move || compiler.compile(&request)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(CompileError::Cancelled),
        }
    }
}

/// Compile `request` against the host filesystem, blocking the caller.
pub fn render_sync(request: &CompileRequest) -> Result<CompileResult, CompileError> {
    Compiler::native().compile(request)
}

/// Compile `request` against the host filesystem without blocking the
/// calling task.
pub async fn render(request: CompileRequest) -> Result<CompileResult, CompileError> {
    Compiler::native().compile_deferred(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sass_render_runtime::MemoryRuntime;

    fn memory(rt: MemoryRuntime) -> Compiler {
        Compiler::new(Arc::new(rt))
    }

    #[test]
    fn test_stats_bracket_the_compile() {
        let compiler = memory(MemoryRuntime::new());
        let before = now_millis();
        let result = compiler
            .compile(&CompileRequest::from_source("a {b: c}"))
            .unwrap();
        let after = now_millis();

        assert_eq!(result.stats.entry, "stdin");
        assert!(result.stats.start >= before);
        assert!(result.stats.end <= after);
        assert_eq!(result.stats.duration, result.stats.end - result.stats.start);
    }

    #[test]
    fn test_normalization_errors_surface_unchanged() {
        let compiler = memory(MemoryRuntime::new());
        let err = compiler.compile(&CompileRequest::default()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Normalization(crate::NormalizationError::MissingSource)
        ));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let compiler = memory(MemoryRuntime::new().with_file("/project/main.scss", "a {b: c}"));
        let result = compiler
            .compile(&CompileRequest::from_path("main.scss"))
            .unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["css"], "a {\n  b: c;\n}");
        assert_eq!(value["stats"]["entry"], "/project/main.scss");
        assert_eq!(value["includedFiles"][0], "/project/main.scss");
    }
}
