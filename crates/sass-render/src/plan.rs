//! Option normalization: turning a `CompileRequest` into a `CompilePlan`.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Every option of the plan has a concrete value. Unrecognized indentation
//! and line-ending values fall back to their defaults silently; a missing
//! source or an unknown output style is an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use sass_render_runtime::SystemRuntime;

use crate::error::NormalizationError;
use crate::messages::{MessageSink, TracingSink};
use crate::request::{CompileRequest, IndentWidth};
use crate::resolver::ImportHook;

/// Label used for the entry when it has no path.
pub const STDIN_LABEL: &str = "stdin";

/// Indentation width used when the caller's value is unusable.
pub const DEFAULT_INDENT_WIDTH: usize = 2;

/// Largest accepted indentation width.
pub const MAX_INDENT_WIDTH: usize = 10;

/// Output style of the compiled stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStyle {
    #[default]
    Nested,
    Expanded,
    Compact,
    Compressed,
}

impl OutputStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStyle::Nested => "nested",
            OutputStyle::Expanded => "expanded",
            OutputStyle::Compact => "compact",
            OutputStyle::Compressed => "compressed",
        }
    }

    /// The compiler style this output style is produced from.
    pub fn compiler_style(&self) -> grass::OutputStyle {
        match self {
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
            _ => grass::OutputStyle::Expanded,
        }
    }

    /// Whether the compiler output is re-indented after compilation.
    pub fn reindents(&self) -> bool {
        !matches!(self, OutputStyle::Compressed)
    }
}

impl FromStr for OutputStyle {
    type Err = NormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nested" => Ok(OutputStyle::Nested),
            "expanded" => Ok(OutputStyle::Expanded),
            "compact" => Ok(OutputStyle::Compact),
            "compressed" => Ok(OutputStyle::Compressed),
            other => Err(NormalizationError::UnsupportedOutputStyle(other.to_string())),
        }
    }
}

impl fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Character repeated to build one indentation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndentType {
    #[default]
    Space,
    Tab,
}

impl IndentType {
    /// Parse a caller value. Anything other than `tab` is a space.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("tab") => IndentType::Tab,
            _ => IndentType::Space,
        }
    }

    pub fn unit(&self) -> char {
        match self {
            IndentType::Space => ' ',
            IndentType::Tab => '\t',
        }
    }
}

/// Line terminator written between output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    Cr,
    Crlf,
    Lfcr,
}

impl LineEnding {
    /// Parse a caller value, falling back to `lf`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("cr") => LineEnding::Cr,
            Some("crlf") => LineEnding::Crlf,
            Some("lfcr") => LineEnding::Lfcr,
            _ => LineEnding::Lf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::Crlf => "\r\n",
            LineEnding::Lfcr => "\n\r",
        }
    }
}

/// One nesting level of output indentation: `width` copies of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indentation {
    pub unit: IndentType,
    pub width: usize,
}

impl Default for Indentation {
    fn default() -> Self {
        Self {
            unit: IndentType::Space,
            width: DEFAULT_INDENT_WIDTH,
        }
    }
}

impl Indentation {
    pub fn level(&self) -> String {
        std::iter::repeat_n(self.unit.unit(), self.width).collect()
    }
}

/// Resolve a caller-supplied width, falling back to the default when it is
/// not a number in `0..=MAX_INDENT_WIDTH`.
pub fn parse_indent_width(value: Option<&IndentWidth>) -> usize {
    let parsed = match value {
        Some(IndentWidth::Count(n)) => Some(*n),
        Some(IndentWidth::Text(s)) => s.trim().parse::<i64>().ok(),
        None => None,
    };
    parsed
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n <= MAX_INDENT_WIDTH)
        .unwrap_or(DEFAULT_INDENT_WIDTH)
}

/// Where the entry stylesheet's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// Source text supplied with the request
    Inline(String),
    /// A stylesheet read from disk at the entry path
    File,
}

/// A fully resolved compile request.
#[derive(Clone)]
pub struct CompilePlan {
    pub entry: EntrySource,
    /// Absolute path the compiler loads the entry from. For inline source
    /// without a path this is `<base_dir>/stdin`, which never touches disk.
    pub entry_path: PathBuf,
    /// Entry name used in diagnostics and stats: the absolute path or `stdin`.
    pub entry_label: String,
    /// Absolute form of the request's source path, if any.
    pub source_path: Option<PathBuf>,
    pub base_dir: PathBuf,
    /// Absolute, deduplicated, without `base_dir`.
    pub include_roots: Vec<PathBuf>,
    pub indented_syntax: bool,
    pub output_style: OutputStyle,
    pub indentation: Indentation,
    pub line_ending: LineEnding,
    pub quiet: bool,
    pub charset: bool,
    pub importers: Vec<Arc<dyn ImportHook>>,
    pub sink: Arc<dyn MessageSink>,
}

impl CompilePlan {
    /// Search roots in priority order: `base_dir`, then the include roots.
    pub fn roots(&self) -> Vec<PathBuf> {
        std::iter::once(self.base_dir.clone())
            .chain(self.include_roots.iter().cloned())
            .collect()
    }

    /// Syntax the compiler parses the entry with.
    pub fn input_syntax(&self) -> grass::InputSyntax {
        if self.indented_syntax {
            grass::InputSyntax::Sass
        } else {
            grass::InputSyntax::Scss
        }
    }
}

impl fmt::Debug for CompilePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilePlan")
            .field("entry_path", &self.entry_path)
            .field("entry_label", &self.entry_label)
            .field("inline", &matches!(self.entry, EntrySource::Inline(_)))
            .field("base_dir", &self.base_dir)
            .field("include_roots", &self.include_roots)
            .field("indented_syntax", &self.indented_syntax)
            .field("output_style", &self.output_style)
            .field("indentation", &self.indentation)
            .field("line_ending", &self.line_ending)
            .field("quiet", &self.quiet)
            .field("charset", &self.charset)
            .field("importers", &self.importers.len())
            .finish()
    }
}

fn has_sass_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "sass")
}

/// Validate and default a request.
///
/// Fails with [`NormalizationError::MissingSource`] before consulting the
/// runtime when the request has neither source text nor a source path.
pub fn normalize(
    request: &CompileRequest,
    runtime: &dyn SystemRuntime,
) -> Result<CompilePlan, NormalizationError> {
    if request.source_text.is_none() && request.source_path.is_none() {
        return Err(NormalizationError::MissingSource);
    }

    let output_style = match request.output_style.as_deref() {
        Some(style) => style.parse::<OutputStyle>()?,
        None => OutputStyle::default(),
    };

    let absolute = |path: &Path| {
        runtime
            .absolute(path)
            .map_err(|e| NormalizationError::WorkingDirectory(e.to_string()))
    };

    let source_path = request
        .source_path
        .as_deref()
        .map(absolute)
        .transpose()?;

    let base_dir = match source_path.as_deref().and_then(Path::parent) {
        Some(parent) => parent.to_path_buf(),
        None => runtime
            .cwd()
            .map_err(|e| NormalizationError::WorkingDirectory(e.to_string()))?,
    };

    let mut include_roots: Vec<PathBuf> = Vec::with_capacity(request.include_roots.len());
    for root in &request.include_roots {
        let root = absolute(root.as_path())?;
        if root != base_dir && !include_roots.contains(&root) {
            include_roots.push(root);
        }
    }

    let (entry, entry_path, entry_label) = match (&request.source_text, &source_path) {
        (Some(text), Some(path)) => (
            EntrySource::Inline(text.clone()),
            path.clone(),
            path.display().to_string(),
        ),
        (Some(text), None) => (
            EntrySource::Inline(text.clone()),
            base_dir.join(STDIN_LABEL),
            STDIN_LABEL.to_string(),
        ),
        (None, Some(path)) => (EntrySource::File, path.clone(), path.display().to_string()),
        (None, None) => return Err(NormalizationError::MissingSource),
    };

    let indented_syntax = request
        .indented_syntax
        .unwrap_or_else(|| source_path.as_deref().is_some_and(has_sass_extension));

    let plan = CompilePlan {
        entry,
        entry_path,
        entry_label,
        source_path,
        base_dir,
        include_roots,
        indented_syntax,
        output_style,
        indentation: Indentation {
            unit: IndentType::parse(request.indent_type.as_deref()),
            width: parse_indent_width(request.indent_width.as_ref()),
        },
        line_ending: LineEnding::parse(request.line_ending.as_deref()),
        quiet: request.quiet,
        charset: request.charset.unwrap_or(true),
        importers: request.importers.clone(),
        sink: request
            .sink
            .clone()
            .unwrap_or_else(|| Arc::new(TracingSink) as Arc<dyn MessageSink>),
    };

    tracing::debug!(
        entry = %plan.entry_label,
        style = %plan.output_style,
        roots = plan.include_roots.len() + 1,
        "Normalized compile request"
    );

    Ok(plan)
}
