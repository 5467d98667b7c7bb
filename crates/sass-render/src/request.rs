//! The caller-facing compilation request.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A `CompileRequest` is the raw, possibly ambiguous option bag a host hands
//! to the compiler. It is deserializable from the legacy Sass option names
//! (`data`, `file`, `includePaths`, `linefeed`, ...) so hosts can pass their
//! configuration straight through; unknown keys are ignored. Everything is
//! validated and defaulted later by [`crate::normalize`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::messages::MessageSink;
use crate::resolver::ImportHook;

/// Indentation width as supplied by the caller: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IndentWidth {
    Count(i64),
    Text(String),
}

impl From<i32> for IndentWidth {
    fn from(value: i32) -> Self {
        IndentWidth::Count(i64::from(value))
    }
}

impl From<i64> for IndentWidth {
    fn from(value: i64) -> Self {
        IndentWidth::Count(value)
    }
}

impl From<usize> for IndentWidth {
    fn from(value: usize) -> Self {
        IndentWidth::Count(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for IndentWidth {
    fn from(value: &str) -> Self {
        IndentWidth::Text(value.to_string())
    }
}

impl From<String> for IndentWidth {
    fn from(value: String) -> Self {
        IndentWidth::Text(value)
    }
}

/// A request to compile one entry stylesheet.
///
/// At least one of `source_text` / `source_path` must be set. When both are
/// present the text is compiled and the path only labels the entry and
/// anchors relative imports; it does not need to exist.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileRequest {
    /// Inline stylesheet source.
    #[serde(alias = "data")]
    pub source_text: Option<String>,

    /// Path of the entry stylesheet.
    #[serde(alias = "file")]
    pub source_path: Option<PathBuf>,

    /// Parse the entry with the indented syntax. Inferred from the
    /// extension of `source_path` when unset.
    pub indented_syntax: Option<bool>,

    /// `nested` (default), `expanded`, `compact` or `compressed`.
    pub output_style: Option<String>,

    /// `space` (default) or `tab`.
    pub indent_type: Option<String>,

    /// Units of `indent_type` per nesting level.
    pub indent_width: Option<IndentWidth>,

    /// `lf` (default), `cr`, `crlf` or `lfcr`.
    #[serde(alias = "linefeed")]
    pub line_ending: Option<String>,

    /// Extra import roots, searched in order after the entry's directory.
    #[serde(alias = "includePaths")]
    pub include_roots: Vec<PathBuf>,

    /// Suppress compiler warnings.
    pub quiet: bool,

    /// Emit `@charset` or a BOM when the output contains non-ASCII.
    pub charset: Option<bool>,

    /// Hooks consulted, in order, before the filesystem for every import.
    #[serde(skip)]
    pub importers: Vec<Arc<dyn ImportHook>>,

    /// Where `@warn`/`@debug` output goes. Defaults to `tracing`.
    #[serde(skip)]
    pub sink: Option<Arc<dyn MessageSink>>,
}

impl CompileRequest {
    /// Request compiling inline source text.
    pub fn from_source(text: impl Into<String>) -> Self {
        Self {
            source_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Request compiling the stylesheet at `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_indented_syntax(mut self, indented: bool) -> Self {
        self.indented_syntax = Some(indented);
        self
    }

    pub fn with_output_style(mut self, style: impl Into<String>) -> Self {
        self.output_style = Some(style.into());
        self
    }

    pub fn with_indent_type(mut self, indent_type: impl Into<String>) -> Self {
        self.indent_type = Some(indent_type.into());
        self
    }

    pub fn with_indent_width(mut self, width: impl Into<IndentWidth>) -> Self {
        self.indent_width = Some(width.into());
        self
    }

    pub fn with_line_ending(mut self, line_ending: impl Into<String>) -> Self {
        self.line_ending = Some(line_ending.into());
        self
    }

    pub fn with_include_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.include_roots.push(root.into());
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_charset(mut self, charset: bool) -> Self {
        self.charset = Some(charset);
        self
    }

    pub fn with_importer(mut self, hook: impl ImportHook + 'static) -> Self {
        self.importers.push(Arc::new(hook));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl fmt::Debug for CompileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileRequest")
            .field(
                "source_text",
                &self.source_text.as_ref().map(|s| format!("<{} bytes>", s.len())),
            )
            .field("source_path", &self.source_path)
            .field("indented_syntax", &self.indented_syntax)
            .field("output_style", &self.output_style)
            .field("indent_type", &self.indent_type)
            .field("indent_width", &self.indent_width)
            .field("line_ending", &self.line_ending)
            .field("include_roots", &self.include_roots)
            .field("quiet", &self.quiet)
            .field("charset", &self.charset)
            .field("importers", &self.importers.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
