/*
 * sass-render-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Runtime abstraction layer for stylesheet loading.
 *
 * The compiler façade never touches std::fs directly; everything goes
 * through a SystemRuntime so the same pipeline can run against:
 *
 * - NativeRuntime: the host filesystem (default)
 * - MemoryRuntime: an in-memory tree (tests, embedding, sandboxed hosts)
 */

mod memory;
mod native;
mod traits;

pub use traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime, normalize_lexically};

pub use memory::MemoryRuntime;
pub use native::NativeRuntime;

/// Create a default runtime for the current platform.
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}
