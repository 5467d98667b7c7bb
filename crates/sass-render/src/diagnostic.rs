//! Located compile failures and their textual renderings.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Downstream tools parse these strings, so both renderings are byte-exact
//! (`\n` stands for the configured line ending):
//!
//! ```text
//! short:     <message>\n  <file> <line>:<column>  root stylesheet
//! extended:  Error: <message>\n<source line>\n<caret line>\n  <file> <line>:<column>  root stylesheet
//! ```

use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

use crate::fs::ResolvingFs;
use crate::plan::LineEnding;

/// A compile failure pinned to a source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{message}{eol}  {file} {line}:{column}  root stylesheet",
    eol = .line_ending.as_str()
)]
pub struct CompileDiagnostic {
    pub message: String,
    /// 1-based
    pub line: usize,
    /// 1-based, in characters
    pub column: usize,
    /// Absolute path of the failing stylesheet, or `stdin`
    pub file: String,
    /// The full text of the failing line
    pub source_line: String,
    /// Number of carets under the failing range, at least 1
    pub span: usize,
    /// Separator between the lines of both renderings
    pub line_ending: LineEnding,
}

impl CompileDiagnostic {
    pub fn new(
        message: impl Into<String>,
        line: usize,
        column: usize,
        file: impl Into<String>,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            file: file.into(),
            source_line: source_line.into(),
            span: 1,
            line_ending: LineEnding::default(),
        }
    }

    pub fn with_span(mut self, span: usize) -> Self {
        self.span = span.max(1);
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// A failure with no position in any stylesheet (unreadable files,
    /// invalid UTF-8), reported against the entry at 1:1.
    pub fn unlocated(message: impl Into<String>, entry_label: impl Into<String>) -> Self {
        Self::new(message, 1, 1, entry_label, "")
    }

    /// `<file> <line>:<column>  root stylesheet`
    fn trailer(&self) -> String {
        format!("  {} {}:{}  root stylesheet", self.file, self.line, self.column)
    }

    /// Spaces up to the column, then one caret per spanned character.
    pub fn caret_line(&self) -> String {
        let mut caret = " ".repeat(self.column.saturating_sub(1));
        caret.push_str(&"^".repeat(self.span.max(1)));
        caret
    }

    /// Same text as `Display`.
    pub fn short(&self) -> String {
        format!(
            "{}{}{}",
            self.message,
            self.line_ending.as_str(),
            self.trailer()
        )
    }

    /// The long form with the offending source line and a caret marker.
    pub fn formatted(&self) -> String {
        [
            format!("Error: {}", self.message),
            self.source_line.clone(),
            self.caret_line(),
            self.trailer(),
        ]
        .join(self.line_ending.as_str())
    }

    /// Convert a compiler error, naming files the way `files` displays them.
    #[allow(unreachable_patterns)]
    pub(crate) fn from_compiler(
        err: Box<grass::Error>,
        files: &ResolvingFs<'_>,
        entry_label: &str,
    ) -> Self {
        let rendered = err.to_string();
        match (*err).kind() {
            grass::ErrorKind::ParseError { message, loc, .. } => {
                let source_line = loc
                    .file
                    .source_line(loc.begin.line)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                let rest = source_line.chars().skip(loc.begin.column);
                let width = if loc.end.line == loc.begin.line {
                    loc.end.column.saturating_sub(loc.begin.column)
                } else {
                    rest.clone().count()
                };
                // The compiler's range can open on the whitespace before the
                // offending token; the caret goes under the token itself.
                let leading = rest.take_while(|c| c.is_whitespace()).count();
                let skip = leading.min(width.saturating_sub(1));
                Self::new(
                    message,
                    loc.begin.line + 1,
                    loc.begin.column + skip + 1,
                    files.display_name(loc.file.name()),
                    source_line,
                )
                .with_span(width - skip)
            }
            grass::ErrorKind::IoError(io) => Self::unlocated(io.to_string(), entry_label),
            grass::ErrorKind::FromUtf8Error(message) => Self::unlocated(message, entry_label),
            _ => Self::unlocated(rendered, entry_label),
        }
    }
}

impl Serialize for CompileDiagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CompileDiagnostic", 7)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("line", &self.line)?;
        state.serialize_field("column", &self.column)?;
        state.serialize_field("file", &self.file)?;
        state.serialize_field("sourceLine", &self.source_line)?;
        state.serialize_field("span", &self.span)?;
        state.serialize_field("formatted", &self.formatted())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn expected_expression() -> CompileDiagnostic {
        CompileDiagnostic::new("Expected expression.", 1, 7, "/styles/main.scss", "a {b: }")
    }

    #[test]
    fn test_short_form() {
        let diagnostic = expected_expression();
        assert_eq!(
            diagnostic.to_string(),
            "Expected expression.\n  /styles/main.scss 1:7  root stylesheet"
        );
        assert_eq!(diagnostic.short(), diagnostic.to_string());
    }

    #[test]
    fn test_extended_form() {
        assert_snapshot!(expected_expression().formatted(), @r"
        Error: Expected expression.
        a {b: }
              ^
          /styles/main.scss 1:7  root stylesheet
        ");
    }

    #[test]
    fn test_caret_span() {
        let diagnostic =
            CompileDiagnostic::new("Undefined variable.", 2, 10, "stdin", "  color: $nope;")
                .with_span(5);
        assert_eq!(diagnostic.caret_line(), "         ^^^^^");

        assert_eq!(diagnostic.clone().with_span(0).caret_line(), "         ^");
    }

    #[test]
    fn test_line_ending_joins_both_renderings() {
        let diagnostic = expected_expression().with_line_ending(LineEnding::Crlf);
        assert_eq!(
            diagnostic.to_string(),
            "Expected expression.\r\n  /styles/main.scss 1:7  root stylesheet"
        );
        assert_eq!(
            diagnostic.formatted(),
            "Error: Expected expression.\r\na {b: }\r\n      ^\r\n  /styles/main.scss 1:7  root stylesheet"
        );
        assert_eq!(diagnostic.short(), diagnostic.to_string());
    }

    #[test]
    fn test_unlocated() {
        let diagnostic = CompileDiagnostic::unlocated("No such file or directory", "stdin");
        assert_eq!(
            diagnostic.formatted(),
            "Error: No such file or directory\n\n^\n  stdin 1:1  root stylesheet"
        );
    }

    #[test]
    fn test_serialize_includes_formatted() {
        let value = serde_json::to_value(expected_expression()).unwrap();
        assert_eq!(value["line"], 1);
        assert_eq!(value["column"], 7);
        assert_eq!(value["sourceLine"], "a {b: }");
        assert_eq!(
            value["formatted"].as_str().unwrap(),
            expected_expression().formatted()
        );
    }
}
