//! Error types for compilation requests.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::CompileDiagnostic;

/// A request that was rejected before the compiler ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// Neither source text nor a source path was given
    #[error("Either source text or a source path must be set.")]
    MissingSource,

    /// The output style is not one of nested, expanded, compact, compressed
    #[error("Unsupported output style \"{0}\".")]
    UnsupportedOutputStyle(String),

    /// The working directory could not be determined
    #[error("Failed to determine the working directory: {0}")]
    WorkingDirectory(String),
}

/// An import that no hook and no search root could satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Can't find stylesheet to import: \"{specifier}\" (imported from {})", .importer.display())]
    ImportNotFound {
        specifier: String,
        importer: PathBuf,
    },
}

/// Errors surfaced by the public compile entry points.
///
/// Option problems are reported as-is; every failure after the compiler
/// started (parse errors, evaluation errors, missing imports, unreadable
/// files) arrives as a [`CompileDiagnostic`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error(transparent)]
    Diagnostic(#[from] CompileDiagnostic),

    /// The deferred compilation task was dropped by its scheduler
    #[error("Compilation was cancelled before it completed")]
    Cancelled,
}

impl CompileError {
    /// The located diagnostic, if the failure came from the compiler.
    pub fn diagnostic(&self) -> Option<&CompileDiagnostic> {
        match self {
            CompileError::Diagnostic(diagnostic) => Some(diagnostic),
            _ => None,
        }
    }

    /// Long-form rendering: the extended diagnostic with its source snippet,
    /// or the plain message for errors that carry no location.
    pub fn formatted(&self) -> String {
        match self {
            CompileError::Diagnostic(diagnostic) => diagnostic.formatted(),
            other => format!("Error: {}", other),
        }
    }
}
