//! Side-channel output: compiler warnings and `@debug` notices.
//!
//! Copyright (c) 2025 Posit, PBC

use std::fmt;
use std::sync::Mutex;

use codemap::SpanLoc;

use crate::fs::ResolvingFs;

/// Receives rendered warning and debug lines, one call per message.
pub trait MessageSink: Send + Sync {
    fn write_line(&self, line: &str);

    /// Debug notices. Defaults to [`MessageSink::write_line`].
    fn write_debug(&self, line: &str) {
        self.write_line(line);
    }
}

/// Forwards messages to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::warn!("{}", line);
    }

    fn write_debug(&self, line: &str) {
        tracing::debug!("{}", line);
    }
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drain the buffer.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl MessageSink for BufferSink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
    }
}

/// `WARNING: <message>` plus the location trailer.
pub fn render_warning(message: &str, file: &str, line: usize, column: usize) -> String {
    format!(
        "WARNING: {}\n    {} {}:{}  root stylesheet",
        message, file, line, column
    )
}

/// `<file>:<line> DEBUG: <message>`
pub fn render_debug(message: &str, file: &str, line: usize) -> String {
    format!("{}:{} DEBUG: {}", file, line, message)
}

/// Bridges the compiler's logger to a [`MessageSink`].
pub(crate) struct SinkLogger<'a> {
    sink: &'a dyn MessageSink,
    files: &'a ResolvingFs<'a>,
    quiet: bool,
}

impl<'a> SinkLogger<'a> {
    pub(crate) fn new(sink: &'a dyn MessageSink, files: &'a ResolvingFs<'a>, quiet: bool) -> Self {
        Self { sink, files, quiet }
    }
}

impl fmt::Debug for SinkLogger<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkLogger")
            .field("quiet", &self.quiet)
            .finish()
    }
}

impl grass::Logger for SinkLogger<'_> {
    fn debug(&self, location: SpanLoc, message: &str) {
        let file = self.files.display_name(location.file.name());
        self.sink
            .write_debug(&render_debug(message, &file, location.begin.line + 1));
    }

    fn warn(&self, location: SpanLoc, message: &str) {
        if self.quiet {
            return;
        }
        let file = self.files.display_name(location.file.name());
        self.sink.write_line(&render_warning(
            message,
            &file,
            location.begin.line + 1,
            location.begin.column + 1,
        ));
    }
}
