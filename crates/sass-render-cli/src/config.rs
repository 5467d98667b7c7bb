/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Loading compile options from config files and the environment.
 */

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sass_render::CompileRequest;

/// Environment variable holding extra include roots, in the platform's
/// path-list syntax.
pub const SASS_PATH: &str = "SASS_PATH";

/// Read a compile request from a YAML or JSON file.
///
/// `.json` files are parsed as JSON; everything else as YAML, which also
/// accepts JSON documents.
pub fn load_config(path: &Path) -> Result<CompileRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let request = if is_json {
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in config file {}", path.display()))?
    } else {
        serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid YAML in config file {}", path.display()))?
    };
    Ok(request)
}

/// Include roots listed in a `SASS_PATH` value. Empty entries are skipped.
pub fn sass_path_roots(value: Option<&OsStr>) -> Vec<PathBuf> {
    value
        .map(|v| {
            std::env::split_paths(v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}
