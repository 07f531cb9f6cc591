//! Module path resolution.

use std::io;
use std::path::{Path, PathBuf};

use wasm_executor_common::ExecutorError;

/// Turns user-supplied module paths into canonical absolute paths.
///
/// Relative paths are joined to the base directory when one is set, and to
/// the process working directory otherwise. The canonical form is what the
/// instance id is derived from, so `./a.wasm` and `a.wasm` name the same
/// instance.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    base_dir: Option<PathBuf>,
}

impl PathResolver {
    /// Create a resolver with an optional base directory.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    /// The base directory relative paths are resolved against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Resolve and canonicalize `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Load`] if `raw` is empty or the path does
    /// not exist.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ExecutorError> {
        if raw.trim().is_empty() {
            return Err(ExecutorError::load(
                raw,
                io::Error::new(io::ErrorKind::InvalidInput, "empty module path"),
            ));
        }

        let path = Path::new(raw);
        let joined = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };

        std::fs::canonicalize(&joined)
            .map_err(|e| ExecutorError::load(joined.display().to_string(), e))
    }
}
