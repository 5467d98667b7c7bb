//! Output re-rendering: indentation and line endings.
//!
//! Copyright (c) 2025 Posit, PBC

use crate::plan::{Indentation, LineEnding, OutputStyle};

/// Spaces the compiler emits per nesting level.
const COMPILER_INDENT: usize = 2;

/// Re-render compiler output according to the plan's formatting options.
///
/// Trailing newlines are dropped. For every style but `compressed`, each
/// two-space indentation level becomes one [`Indentation::level`] and a
/// leftover odd space is kept; continuation lines of block comments are left
/// as written. Lines are joined with the line ending.
pub fn format_output(
    css: &str,
    style: OutputStyle,
    indentation: Indentation,
    line_ending: LineEnding,
) -> String {
    let css = css.trim_end_matches(['\n', '\r']);
    let level = indentation.level();

    let mut in_comment = false;
    let lines: Vec<String> = css
        .split('\n')
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let continues_comment = in_comment;
            in_comment = ends_inside_comment(line, in_comment);
            if style.reindents() && !continues_comment {
                reindent(line, &level)
            } else {
                line.to_string()
            }
        })
        .collect();

    lines.join(line_ending.as_str())
}

/// Whether a `/* ... */` comment is still open at the end of `line`.
/// Comment markers inside quoted strings are ignored.
fn ends_inside_comment(line: &str, mut in_comment: bool) -> bool {
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if in_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_comment = false;
            }
            continue;
        }
        match quote {
            Some(_) if c == '\\' => {
                chars.next();
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '/' && chars.peek() == Some(&'*') => {
                chars.next();
                in_comment = true;
            }
            None => {}
        }
    }
    in_comment
}

fn reindent(line: &str, level: &str) -> String {
    let body = line.trim_start_matches(' ');
    let leading = line.len() - body.len();
    let depth = leading / COMPILER_INDENT;
    let leftover = leading % COMPILER_INDENT;

    let mut out = String::with_capacity(depth * level.len() + leftover + body.len());
    for _ in 0..depth {
        out.push_str(level);
    }
    out.extend(std::iter::repeat_n(' ', leftover));
    out.push_str(body);
    out
}
