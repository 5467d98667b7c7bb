//! Filesystem adapter that drives the compiler's import probing through
//! [`ImportResolver`].
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! For every `@import` the compiler asks whether a fixed sequence of paths
//! are files, and the sequence always opens with an import-only probe that
//! still carries the name as written (`<dir>/<name>.import.sass`, or
//! `<dir>/<stem>..import<ext>` when the name has an extension). That
//! opening probe is decoded, the import is resolved with the façade's own
//! rules, and only the one path chosen for it is confirmed until the next
//! import opens. This keeps candidate order, hooks and root priority under
//! our control while the compiler does the parsing.
//!
//! Key pieces:
//! - the entry stylesheet, when given as text, is served from memory
//! - hook-provided stylesheets are mounted as in-memory files
//! - hook redirects, and files found for extension-qualified imports outside
//!   the importer's directory, are aliased so diagnostics show the real path
//! - every real file read is recorded, in order, once

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use sass_render_runtime::{RuntimeError, SystemRuntime, normalize_lexically};

use crate::plan::{CompilePlan, EntrySource};
use crate::resolver::{
    EXTENSIONS, HookResolution, ImportContext, ImportResolver, candidates, has_known_extension,
};

/// The import an opening compiler probe stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Probe {
    pub dir: PathBuf,
    /// Final path segment of the import, as written: `colors`, `_colors`,
    /// `colors.sass`
    pub name: String,
}

impl Probe {
    /// Decode an opening probe. Any other path decodes to `None`.
    pub fn opening(path: &Path) -> Option<Self> {
        let dir = path.parent()?.to_path_buf();
        let file = path.file_name()?.to_str()?;

        let name = match file.strip_suffix(".import.sass") {
            Some(stem) => stem.to_string(),
            None => {
                let (stem, ext) = file.rsplit_once("..import")?;
                if !EXTENSIONS.contains(&ext) {
                    return None;
                }
                format!("{}.{}", stem, ext)
            }
        };
        if name.is_empty() || name.starts_with('.') {
            return None;
        }

        Some(Self { dir, name })
    }

    /// Import-only stylesheets (`<stem>.import.<ext>`) are not supported.
    fn is_import_only(&self) -> bool {
        let stem = match self.name.rsplit_once('.') {
            Some((stem, ext)) if EXTENSIONS.contains(&ext) => stem,
            _ => self.name.as_str(),
        };
        stem.ends_with(".import")
    }

    fn key(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

/// Probe bookkeeping between two `is_file` calls.
#[derive(Debug, Default)]
struct ProbeState {
    last: Option<PathBuf>,
    /// The one path confirmed for the import being probed
    answer: Option<PathBuf>,
}

fn into_io_error(err: RuntimeError) -> io::Error {
    match err {
        RuntimeError::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}

/// `grass::Fs` implementation for a single compilation.
pub struct ResolvingFs<'a> {
    runtime: &'a dyn SystemRuntime,
    plan: &'a CompilePlan,
    resolver: ImportResolver<'a>,
    roots: Vec<PathBuf>,
    /// In-memory stylesheets: the inline entry and hook contents
    mounted: RefCell<HashMap<PathBuf, Vec<u8>>>,
    /// Probe path -> real file, for hook redirects and qualified imports
    /// found outside the importer's directory
    aliases: RefCell<HashMap<PathBuf, PathBuf>>,
    /// Hook answers per import; `None` when every hook declined
    hook_answers: RefCell<HashMap<PathBuf, Option<PathBuf>>>,
    probes: RefCell<ProbeState>,
    loaded: RefCell<IndexSet<PathBuf>>,
}

impl<'a> ResolvingFs<'a> {
    pub fn new(runtime: &'a dyn SystemRuntime, plan: &'a CompilePlan) -> Self {
        let mut mounted = HashMap::new();
        if let EntrySource::Inline(text) = &plan.entry {
            mounted.insert(plan.entry_path.clone(), text.clone().into_bytes());
        }
        Self {
            runtime,
            plan,
            resolver: ImportResolver::new(runtime, &plan.importers),
            roots: plan.roots(),
            mounted: RefCell::new(mounted),
            aliases: RefCell::new(HashMap::new()),
            hook_answers: RefCell::new(HashMap::new()),
            probes: RefCell::new(ProbeState::default()),
            loaded: RefCell::new(IndexSet::new()),
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_lexically(path)
        } else {
            normalize_lexically(&self.plan.base_dir.join(path))
        }
    }

    /// The search root nearest to the probe, and the import relative to it.
    fn specifier_for(&self, probe: &Probe) -> (PathBuf, String) {
        let nearest = self
            .roots
            .iter()
            .filter(|root| probe.dir.starts_with(root))
            .max_by_key(|root| root.components().count());
        match nearest {
            Some(root) => {
                let relative = probe.key();
                let relative = relative.strip_prefix(root).unwrap_or(relative.as_path());
                (
                    root.clone(),
                    relative.to_string_lossy().replace('\\', "/"),
                )
            }
            None => (probe.dir.clone(), probe.key().to_string_lossy().into_owned()),
        }
    }

    /// Ask the hooks about an import once, mounting the answer.
    /// Returns the path the answer was mounted at.
    fn hook_answer(&self, probe: &Probe) -> Option<PathBuf> {
        if self.plan.importers.is_empty() {
            return None;
        }
        let key = probe.key();
        if let Some(answer) = self.hook_answers.borrow().get(&key) {
            return answer.clone();
        }

        let (importer_dir, specifier) = self.specifier_for(probe);
        let context = ImportContext::new(importer_dir, self.roots.clone());
        let answer = self
            .resolver
            .consult_hooks(&specifier, &context)
            .map(|(hook_index, resolution)| {
                tracing::debug!(%specifier, hook_index, "Import answered by hook");
                self.mount(probe, resolution)
            });

        self.hook_answers.borrow_mut().insert(key, answer.clone());
        answer
    }

    fn mount(&self, probe: &Probe, resolution: HookResolution) -> PathBuf {
        let qualified = has_known_extension(&probe.name);
        match resolution {
            HookResolution::Contents { source, syntax } => {
                let path = if qualified {
                    probe.key()
                } else {
                    probe
                        .dir
                        .join(format!("{}.{}", probe.name, syntax.extension()))
                };
                self.mounted
                    .borrow_mut()
                    .insert(path.clone(), source.into_bytes());
                path
            }
            HookResolution::File(target) => {
                let target = self.absolute(&target);
                let path = if qualified {
                    probe.key()
                } else {
                    let ext = target
                        .extension()
                        .and_then(|e| e.to_str())
                        .filter(|e| EXTENSIONS.contains(e))
                        .unwrap_or("scss");
                    probe.dir.join(format!("{}.{}", probe.name, ext))
                };
                self.aliases.borrow_mut().insert(path.clone(), target);
                path
            }
        }
    }

    /// The path to confirm for an import.
    ///
    /// Names without an extension are resolved in the probed directory only;
    /// the compiler probes the remaining roots itself, in the same order.
    /// Extension-qualified names are only ever probed in the importer's
    /// directory, so every root is searched here and a find elsewhere is
    /// aliased in.
    fn answer(&self, probe: &Probe) -> Option<PathBuf> {
        if probe.is_import_only() {
            return None;
        }
        if let Some(mounted) = self.hook_answer(probe) {
            return Some(mounted);
        }

        if !has_known_extension(&probe.name) {
            let probed = candidates(&probe.name, &probe.dir, 0).into_iter().filter(|c| {
                c.path
                    .file_name()
                    .and_then(|f| f.to_str())
                    .is_some_and(has_known_extension)
            });
            return self.resolver.first_existing(probed).map(|c| c.path);
        }

        let (importer_dir, specifier) = self.specifier_for(probe);
        let context = ImportContext::new(importer_dir, self.roots.clone());
        let winner = self.resolver.search(&specifier, &context)?.path;
        let verbatim = probe.key();
        let partial = probe.dir.join(format!("_{}", probe.name));
        if winner == verbatim || winner == partial {
            return Some(winner);
        }
        self.aliases.borrow_mut().insert(verbatim.clone(), winner);
        Some(verbatim)
    }

    /// Name to show for a file the compiler reports: the entry label for the
    /// entry, the real path for aliased files, absolute paths otherwise.
    pub fn display_name(&self, name: &str) -> String {
        let path = self.absolute(Path::new(name));
        if path == self.plan.entry_path {
            return self.plan.entry_label.clone();
        }
        if let Some(real) = self.aliases.borrow().get(&path) {
            return real.display().to_string();
        }
        path.display().to_string()
    }

    /// The entry (when it is an existing file) followed by every real file
    /// loaded, each once, in first-load order.
    pub fn included_files(&self) -> Vec<PathBuf> {
        let mut files = IndexSet::new();
        if let Some(source) = &self.plan.source_path {
            if self.runtime.is_file(source).unwrap_or(false) {
                files.insert(source.clone());
            }
        }
        files.extend(self.loaded.borrow().iter().cloned());
        files.into_iter().collect()
    }
}

impl Debug for ResolvingFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvingFs")
            .field("runtime", &"<SystemRuntime>")
            .field("roots", &self.roots)
            .field("mounted", &self.mounted.borrow().len())
            .field("loaded", &self.loaded.borrow().len())
            .finish()
    }
}

impl grass::Fs for ResolvingFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        let path = self.absolute(path);
        self.runtime.is_dir(&path).unwrap_or(false)
            || self.mounted.borrow().keys().any(|p| p.starts_with(&path) && *p != path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = self.absolute(path);
        let continues = {
            let state = self.probes.borrow();
            path.file_name()
                .and_then(|f| f.to_str())
                .and_then(|f| f.strip_prefix('_'))
                .is_some_and(|f| state.last.as_deref() == Some(path.with_file_name(f).as_path()))
        };
        if !continues && let Some(probe) = Probe::opening(&path) {
            let answer = self.answer(&probe);
            tracing::trace!(import = %probe.key().display(), ?answer, "Import opened");
            self.probes.borrow_mut().answer = answer;
        }

        let mut state = self.probes.borrow_mut();
        state.last = Some(path.clone());
        state.answer.as_deref() == Some(path.as_path())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = self.absolute(path);
        if let Some(bytes) = self.mounted.borrow().get(&path) {
            return Ok(bytes.clone());
        }
        let real = self.aliases.borrow().get(&path).cloned().unwrap_or(path);
        let bytes = self.runtime.file_read(&real).map_err(into_io_error)?;
        tracing::trace!(path = %real.display(), "Loaded stylesheet");
        self.loaded.borrow_mut().insert(real);
        Ok(bytes)
    }
}
