/*
 * memory.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * MemoryRuntime: an in-memory filesystem for hermetic compilation.
 */

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime, normalize_lexically};

/// Helper function to create a "not found" error.
fn not_found_error(path: &Path) -> RuntimeError {
    RuntimeError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("Path not found: {}", path.display()),
    ))
}

#[derive(Debug, Default)]
struct Tree {
    /// File contents, keyed by normalized absolute path
    files: HashMap<PathBuf, Vec<u8>>,
    /// Directory entries (automatically includes parents of all files)
    directories: HashSet<PathBuf>,
}

impl Tree {
    fn add_directory_and_parents(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }
}

/// Runtime whose filesystem lives entirely in memory.
///
/// Files are keyed by lexically normalized absolute paths; relative paths
/// resolve against the working directory (`/project` unless configured).
/// Adding a file creates all of its parent directories.
///
/// Thread safety: Uses RwLock to satisfy Send + Sync trait bounds.
#[derive(Debug)]
pub struct MemoryRuntime {
    cwd: PathBuf,
    tree: RwLock<Tree>,
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRuntime {
    /// Create an empty filesystem rooted at `/` with `/project` as the
    /// working directory.
    pub fn new() -> Self {
        Self::with_cwd(PathBuf::from("/project"))
    }

    /// Create an empty filesystem with a custom working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let mut tree = Tree::default();
        tree.directories.insert(PathBuf::from("/"));
        tree.add_directory_and_parents(&cwd);
        Self {
            cwd,
            tree: RwLock::new(tree),
        }
    }

    /// Builder-style variant of [`MemoryRuntime::add_file`].
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, contents);
        self
    }

    /// Add or replace a file, creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let normalized = self.normalize_path(path.as_ref());
        let mut tree = self.tree.write().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = normalized.parent() {
            tree.add_directory_and_parents(parent);
        }
        tree.files.insert(normalized, contents.into());
    }

    /// Add an empty directory (and all parent directories).
    pub fn add_directory(&self, path: impl AsRef<Path>) {
        let normalized = self.normalize_path(path.as_ref());
        self.tree
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add_directory_and_parents(&normalized);
    }

    /// Remove a file. Returns true if the file existed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let normalized = self.normalize_path(path.as_ref());
        self.tree
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .files
            .remove(&normalized)
            .is_some()
    }

    /// All file paths currently stored, sorted.
    pub fn list_files(&self) -> Vec<PathBuf> {
        let tree = self.tree.read().unwrap_or_else(|e| e.into_inner());
        let mut files: Vec<PathBuf> = tree.files.keys().cloned().collect();
        files.sort();
        files
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_lexically(path)
        } else {
            normalize_lexically(&self.cwd.join(path))
        }
    }
}

impl SystemRuntime for MemoryRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize_path(path);
        let tree = self.tree.read().unwrap_or_else(|e| e.into_inner());
        tree.files
            .get(&normalized)
            .cloned()
            .ok_or_else(|| not_found_error(&normalized))
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        let normalized = self.normalize_path(path);
        let tree = self.tree.read().unwrap_or_else(|e| e.into_inner());
        let exists = match kind {
            None => tree.files.contains_key(&normalized) || tree.directories.contains(&normalized),
            Some(PathKind::File) => tree.files.contains_key(&normalized),
            Some(PathKind::Directory) => tree.directories.contains(&normalized),
        };
        Ok(exists)
    }

    fn cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
