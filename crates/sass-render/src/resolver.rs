//! Import resolution across multiple search roots.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! An import specifier is resolved by first asking the configured importer
//! hooks, in order, and then probing each search root for the candidates the
//! partial-file and extension conventions produce. The first root with an
//! existing candidate wins; within a root the first existing candidate wins.
//!
//! Resolution never caches. Given the same hooks and the same (read-only)
//! filesystem, resolving a specifier twice yields the same answer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sass_render_runtime::SystemRuntime;

use crate::error::ResolveError;

/// Extensions tried, in order, for specifiers that carry none.
pub const EXTENSIONS: [&str; 3] = ["scss", "sass", "css"];

/// Syntax of a stylesheet produced by an importer hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Scss,
    Sass,
    Css,
}

impl Syntax {
    pub fn extension(&self) -> &'static str {
        match self {
            Syntax::Scss => "scss",
            Syntax::Sass => "sass",
            Syntax::Css => "css",
        }
    }
}

/// What an importer hook answered for a specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResolution {
    /// Load this file instead of searching the roots.
    File(PathBuf),
    /// Use this source text as the imported stylesheet.
    Contents { source: String, syntax: Syntax },
}

impl HookResolution {
    pub fn scss(source: impl Into<String>) -> Self {
        HookResolution::Contents {
            source: source.into(),
            syntax: Syntax::Scss,
        }
    }
}

/// Where an import is being resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    /// Directory of the importing stylesheet (the base directory for the
    /// entry document).
    pub importer_dir: PathBuf,
    /// Base directory followed by the include roots.
    pub roots: Vec<PathBuf>,
}

impl ImportContext {
    pub fn new(importer_dir: impl Into<PathBuf>, roots: Vec<PathBuf>) -> Self {
        Self {
            importer_dir: importer_dir.into(),
            roots,
        }
    }

    /// The importer's directory followed by `roots`, each kept once at its
    /// first position.
    pub fn search_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::with_capacity(self.roots.len() + 1);
        for root in std::iter::once(&self.importer_dir).chain(self.roots.iter()) {
            if !roots.contains(root) {
                roots.push(root.clone());
            }
        }
        roots
    }
}

/// A caller-supplied resolver consulted before the filesystem.
///
/// Returning `None` declines the import and lets the next hook (and finally
/// the filesystem search) handle it.
pub trait ImportHook: Send + Sync {
    fn resolve(&self, specifier: &str, context: &ImportContext) -> Option<HookResolution>;
}

impl<F> ImportHook for F
where
    F: Fn(&str, &ImportContext) -> Option<HookResolution> + Send + Sync,
{
    fn resolve(&self, specifier: &str, context: &ImportContext) -> Option<HookResolution> {
        self(specifier, context)
    }
}

/// Which naming convention produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Convention {
    /// `_` was prefixed to the final path segment.
    pub partial: bool,
    /// This extension was appended.
    pub extension: Option<&'static str>,
    /// The candidate is an index file inside the named directory.
    pub index: bool,
}

/// One absolute path the resolver may load for a specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCandidate {
    pub path: PathBuf,
    /// Position of the producing root in the search order.
    pub root_index: usize,
    pub convention: Convention,
}

impl fmt::Display for ImportCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (root {}", self.path.display(), self.root_index)?;
        if self.convention.partial {
            f.write_str(", partial")?;
        }
        if let Some(ext) = self.convention.extension {
            write!(f, ", .{}", ext)?;
        }
        if self.convention.index {
            f.write_str(", index")?;
        }
        f.write_str(")")
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The hook at `hook_index` answered.
    Hook {
        hook_index: usize,
        resolution: HookResolution,
    },
    /// A file found by searching the roots.
    File(ImportCandidate),
}

/// Whether `name` ends in one of [`EXTENSIONS`].
pub fn has_known_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext))
}

/// Candidate paths for `specifier` under `root`, in probing order.
pub fn candidates(specifier: &str, root: &Path, root_index: usize) -> Vec<ImportCandidate> {
    let joined = root.join(specifier);
    let Some(name) = joined.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
        return Vec::new();
    };
    let dir = joined.parent().map(Path::to_path_buf).unwrap_or_default();
    let already_partial = name.starts_with('_');
    let known_extension = has_known_extension(&name);

    let candidate = |path: PathBuf, convention: Convention| ImportCandidate {
        path,
        root_index,
        convention,
    };

    let mut out = vec![candidate(joined.clone(), Convention::default())];
    if !already_partial {
        out.push(candidate(
            dir.join(format!("_{}", name)),
            Convention {
                partial: true,
                ..Convention::default()
            },
        ));
    }

    if known_extension {
        return out;
    }

    for ext in EXTENSIONS {
        out.push(candidate(
            dir.join(format!("{}.{}", name, ext)),
            Convention {
                extension: Some(ext),
                ..Convention::default()
            },
        ));
    }
    if !already_partial {
        for ext in EXTENSIONS {
            out.push(candidate(
                dir.join(format!("_{}.{}", name, ext)),
                Convention {
                    partial: true,
                    extension: Some(ext),
                    index: false,
                },
            ));
        }
    }
    for partial in [false, true] {
        let prefix = if partial { "_" } else { "" };
        for ext in EXTENSIONS {
            out.push(candidate(
                joined.join(format!("{}index.{}", prefix, ext)),
                Convention {
                    partial,
                    extension: Some(ext),
                    index: true,
                },
            ));
        }
    }
    out
}

/// Resolves import specifiers against hooks and the filesystem.
pub struct ImportResolver<'a> {
    runtime: &'a dyn SystemRuntime,
    hooks: &'a [Arc<dyn ImportHook>],
}

impl<'a> ImportResolver<'a> {
    pub fn new(runtime: &'a dyn SystemRuntime, hooks: &'a [Arc<dyn ImportHook>]) -> Self {
        Self { runtime, hooks }
    }

    /// Resolve `specifier` as imported from `context`.
    pub fn resolve(
        &self,
        specifier: &str,
        context: &ImportContext,
    ) -> Result<Resolution, ResolveError> {
        if let Some((hook_index, resolution)) = self.consult_hooks(specifier, context) {
            return Ok(Resolution::Hook {
                hook_index,
                resolution,
            });
        }

        self.search(specifier, context)
            .map(Resolution::File)
            .ok_or_else(|| ResolveError::ImportNotFound {
                specifier: specifier.to_string(),
                importer: context.importer_dir.clone(),
            })
    }

    /// Search the roots of `context` in order, without consulting hooks.
    pub fn search(&self, specifier: &str, context: &ImportContext) -> Option<ImportCandidate> {
        let candidate = context
            .search_roots()
            .iter()
            .enumerate()
            .find_map(|(root_index, root)| self.resolve_in_root(specifier, root, root_index))?;
        tracing::debug!(%specifier, resolved = %candidate, "Resolved import");
        Some(candidate)
    }

    /// First existing candidate for `specifier` under a single root.
    pub fn resolve_in_root(
        &self,
        specifier: &str,
        root: &Path,
        root_index: usize,
    ) -> Option<ImportCandidate> {
        self.first_existing(candidates(specifier, root, root_index))
    }

    /// The first of `candidates` that names an existing file.
    pub fn first_existing(
        &self,
        candidates: impl IntoIterator<Item = ImportCandidate>,
    ) -> Option<ImportCandidate> {
        candidates.into_iter().find(|candidate| {
            let exists = self.runtime.is_file(&candidate.path).unwrap_or(false);
            tracing::trace!(path = %candidate.path.display(), exists, "Import probe");
            exists
        })
    }

    /// Ask each hook in order; the first answer wins.
    pub fn consult_hooks(
        &self,
        specifier: &str,
        context: &ImportContext,
    ) -> Option<(usize, HookResolution)> {
        self.hooks
            .iter()
            .enumerate()
            .find_map(|(index, hook)| hook.resolve(specifier, context).map(|r| (index, r)))
    }
}
