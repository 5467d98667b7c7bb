//! Sass/SCSS compilation façade.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate provides:
//! - `CompileRequest`, the caller-facing option bag, and `normalize` which
//!   turns it into a fully defaulted `CompilePlan`
//! - Import resolution across the entry directory and include roots, with
//!   partial-file and extension conventions and caller-supplied hooks
//! - Output re-rendering (indentation unit and width, line endings)
//! - Located diagnostics with byte-exact short and extended renderings
//! - Immediate (`render_sync`) and deferred (`render`) compilation
//!
//! Stylesheet evaluation itself is done by `grass`.

mod compile;
mod diagnostic;
mod error;
mod format;
mod fs;
mod messages;
mod plan;
mod request;
mod resolver;

pub use compile::{CompileResult, CompileStats, Compiler, render, render_sync};
pub use diagnostic::CompileDiagnostic;
pub use error::{CompileError, NormalizationError, ResolveError};
pub use format::format_output;
pub use messages::{BufferSink, MessageSink, TracingSink, render_debug, render_warning};
pub use plan::{
    CompilePlan, EntrySource, IndentType, Indentation, LineEnding, OutputStyle, STDIN_LABEL,
    normalize,
};
pub use request::{CompileRequest, IndentWidth};
pub use resolver::{
    Convention, HookResolution, ImportCandidate, ImportContext, ImportHook, ImportResolver,
    Resolution, Syntax, candidates,
};

pub use sass_render_runtime::{MemoryRuntime, NativeRuntime, SystemRuntime};
