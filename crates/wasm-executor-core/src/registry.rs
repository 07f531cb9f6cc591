//! Registry of live module instances.
//!
//! Maps an [`InstanceId`] to the [`ModuleInstance`] loaded for it. Entries
//! are created at most once per id and live until the registry is dropped.
//!
//! # Concurrency
//!
//! Registration of a new id takes a per-id load gate, so two concurrent
//! registrations of the same id produce a single instance: the loser waits
//! on the gate and observes [`Registration::Existing`]. The gate is not a
//! map lock, so lookups and loads of other ids proceed while a module
//! compiles. Readers never see a partially constructed instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use wasm_executor_common::{ExecutorError, InstanceId, RuntimeConfig};

use crate::backend::Backend;
use crate::engine::{WasmEngine, WasmtimeBackend};
use crate::instance::ModuleInstance;
use crate::module;

/// Outcome of a registration request.
pub enum Registration<B: Backend> {
    /// The module was loaded and registered by this request.
    Created(Arc<ModuleInstance<B>>),
    /// An instance was already registered under the id; nothing was loaded.
    Existing(Arc<ModuleInstance<B>>),
}

impl<B: Backend> Registration<B> {
    /// The registered instance.
    pub fn instance(&self) -> &Arc<ModuleInstance<B>> {
        match self {
            Self::Created(instance) | Self::Existing(instance) => instance,
        }
    }

    /// The registered instance's id.
    pub fn id(&self) -> InstanceId {
        self.instance().id()
    }

    /// Returns `true` if this request created the instance.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

impl<B: Backend> std::fmt::Debug for Registration<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = if self.is_created() { "Created" } else { "Existing" };
        f.debug_tuple(variant).field(&self.id()).finish()
    }
}

/// A registry entry as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSummary {
    /// Instance identifier.
    pub id: InstanceId,
    /// Path the module was loaded from.
    pub source_path: PathBuf,
}

/// Registry of instantiated modules.
pub struct Registry<B: Backend = WasmtimeBackend> {
    backend: B,
    instances: DashMap<InstanceId, Arc<ModuleInstance<B>>>,
    loading: DashMap<InstanceId, Arc<Mutex<()>>>,
    order: RwLock<Vec<InstanceSummary>>,
}

impl Registry<WasmtimeBackend> {
    /// Create a registry on a Wasmtime engine built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidConfig`] if the engine cannot be
    /// created.
    pub fn new(config: &RuntimeConfig) -> Result<Self, ExecutorError> {
        let engine = WasmEngine::new(&config.engine)?;
        Ok(Self::with_backend(WasmtimeBackend::new(
            engine,
            config.execution.clone(),
        )))
    }
}

impl<B: Backend> Registry<B> {
    /// Create an empty registry on the given backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            instances: DashMap::new(),
            loading: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// The backend instances are created with.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register the module at `path` under `id`.
    ///
    /// If `id` is already registered, returns the existing instance and
    /// does not touch the file.
    ///
    /// # Errors
    ///
    /// Returns a load error if the module cannot be read, validated,
    /// compiled or instantiated. The registry is unchanged in that case.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn register(&self, id: InstanceId, path: &Path) -> Result<Registration<B>, ExecutorError> {
        if let Some(existing) = self.existing(id) {
            return Ok(existing);
        }

        let gate = Arc::clone(self.loading.entry(id).or_default().value());
        let _loading = gate.lock();

        let result = match self.existing(id) {
            Some(existing) => Ok(existing),
            None => module::load(&self.backend, id, path).map(|instance| {
                let instance = Arc::new(instance);

                let mut order = self.order.write();
                self.instances.insert(id, Arc::clone(&instance));
                order.push(InstanceSummary {
                    id,
                    source_path: path.to_path_buf(),
                });

                info!(instance_id = %id, "Instance registered");
                Registration::Created(instance)
            }),
        };

        // Drop the gate unless another registration is already waiting on it.
        self.loading.remove_if(&id, |_, current| {
            Arc::ptr_eq(current, &gate) && Arc::strong_count(current) == 2
        });

        result
    }

    fn existing(&self, id: InstanceId) -> Option<Registration<B>> {
        let entry = self.instances.get(&id)?;
        debug!(instance_id = %id, "Instance already registered");
        Some(Registration::Existing(Arc::clone(entry.value())))
    }

    /// Register the module at `path` under the id derived from the path.
    ///
    /// # Errors
    ///
    /// See [`Registry::register`].
    pub fn load(&self, path: &Path) -> Result<Registration<B>, ExecutorError> {
        let id = InstanceId::from_bytes(path.as_os_str().as_encoded_bytes());
        self.register(id, path)
    }

    /// Look up a registered instance.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InstanceNotFound`] if `id` is not registered.
    pub fn lookup(&self, id: InstanceId) -> Result<Arc<ModuleInstance<B>>, ExecutorError> {
        self.instances
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ExecutorError::instance_not_found(id))
    }

    /// Returns `true` if `id` is registered.
    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Snapshot of all registered instances in registration order.
    pub fn list(&self) -> Vec<InstanceSummary> {
        self.order.read().clone()
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl<B: Backend> std::fmt::Debug for Registry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("backend", &self.backend.name())
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}
