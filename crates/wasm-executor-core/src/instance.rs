//! A registered module instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use wasm_executor_common::{ExecutorError, InstanceId};

use crate::backend::Backend;
use crate::catalog::Catalog;
use crate::module::{ModuleFormat, ModuleSource};

/// A module loaded from disk and instantiated once.
///
/// The instance keeps its engine objects for as long as it is registered.
/// Calls into it are serialized by an execution lock; the function catalog
/// is built lazily on first use and then reused.
pub struct ModuleInstance<B: Backend> {
    id: InstanceId,
    source_path: PathBuf,
    format: ModuleFormat,
    content_hash: String,
    handle: Mutex<B::Instance>,
    catalog: Mutex<Option<Arc<Catalog>>>,
}

impl<B: Backend> ModuleInstance<B> {
    pub(crate) fn new(id: InstanceId, source: &ModuleSource, handle: B::Instance) -> Self {
        Self {
            id,
            source_path: source.path().to_path_buf(),
            format: source.format(),
            content_hash: source.content_hash().to_string(),
            handle: Mutex::new(handle),
            catalog: Mutex::new(None),
        }
    }

    /// Identifier the instance is registered under.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Path the module was loaded from.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Encoding of the module file.
    pub fn format(&self) -> ModuleFormat {
        self.format
    }

    /// Hash of the binary module bytes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Get the function catalog, building it on first use.
    ///
    /// A failed build is not cached; the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns the signature error of the first unsupported exported
    /// function.
    pub fn catalog(&self, backend: &B) -> Result<Arc<Catalog>, ExecutorError> {
        let mut slot = self.catalog.lock();
        if let Some(catalog) = slot.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        // Lock order: catalog, then handle.
        let exports = backend.exports(&self.handle.lock());
        let catalog = Arc::new(Catalog::build(self.id, exports)?);

        debug!(
            instance_id = %self.id,
            functions = catalog.len(),
            "Function catalog built"
        );

        *slot = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Run `f` with exclusive access to the engine instance.
    pub(crate) fn with_handle<R>(&self, f: impl FnOnce(&mut B::Instance) -> R) -> R {
        let mut handle = self.handle.lock();
        f(&mut handle)
    }
}

impl<B: Backend> std::fmt::Debug for ModuleInstance<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("id", &self.id)
            .field("source_path", &self.source_path)
            .field("format", &self.format)
            .field("catalog_built", &self.catalog.lock().is_some())
            .finish_non_exhaustive()
    }
}
