//! Privilege checks for module loading.
//!
//! Loading a module maps a file from disk into the process and runs its start
//! function, so it is a privileged operation. [`Permissions`] describes what a
//! caller may do; listing and invoking need no privilege.

use std::path::{Path, PathBuf};

use wasm_executor_common::ExecutorError;

/// What a caller is allowed to do.
///
/// # Security Philosophy
///
/// We follow the principle of least privilege:
/// - By default, nothing is allowed
/// - Each capability must be explicitly granted
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    /// Allow registering new modules.
    pub load_enabled: bool,

    /// Directories modules may be loaded from.
    ///
    /// Empty means any directory. Entries are compared against canonical
    /// module paths, after canonicalizing the entry itself when it exists.
    pub allowed_dirs: Vec<PathBuf>,
}

impl Permissions {
    /// Create a permission set with all capabilities disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Create a permission set that may load from any directory.
    ///
    /// Intended for trusted local callers such as the CLI.
    pub fn all() -> Self {
        Self {
            load_enabled: true,
            allowed_dirs: Vec::new(),
        }
    }

    /// Create a builder for constructing permissions.
    pub fn builder() -> PermissionsBuilder {
        PermissionsBuilder::default()
    }

    /// Check if loading the module at `canonical` is allowed.
    pub fn is_load_allowed(&self, canonical: &Path) -> bool {
        if !self.load_enabled {
            return false;
        }

        if self.allowed_dirs.is_empty() {
            return true;
        }

        self.allowed_dirs.iter().any(|dir| {
            let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
            canonical.starts_with(dir)
        })
    }

    /// Ensure the caller may register modules at all.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::PermissionDenied`] without load privilege.
    pub fn check_load_enabled(&self) -> Result<(), ExecutorError> {
        if self.load_enabled {
            Ok(())
        } else {
            Err(ExecutorError::permission_denied(
                "must be privileged to create instances",
            ))
        }
    }

    /// Ensure the caller may load the module at `canonical`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::PermissionDenied`] without load privilege or
    /// when the path is outside every allowed directory.
    pub fn check_load(&self, canonical: &Path) -> Result<(), ExecutorError> {
        self.check_load_enabled()?;

        if self.is_load_allowed(canonical) {
            Ok(())
        } else {
            Err(ExecutorError::permission_denied(format!(
                "'{}' is outside the allowed module directories",
                canonical.display()
            )))
        }
    }
}

/// Builder for [`Permissions`].
#[derive(Debug, Default)]
pub struct PermissionsBuilder {
    inner: Permissions,
}

impl PermissionsBuilder {
    /// Allow registering new modules.
    #[must_use]
    pub fn allow_load(mut self) -> Self {
        self.inner.load_enabled = true;
        self
    }

    /// Restrict loads to the given directories.
    #[must_use]
    pub fn allow_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inner.allowed_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Build the permissions.
    #[must_use]
    pub fn build(self) -> Permissions {
        self.inner
    }
}
