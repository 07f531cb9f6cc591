//! Shared application state.
//!
//! This module provides [`AppState`], which holds shared resources
//! across all HTTP request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use wasm_executor_common::{
    AdminConfig, ExecutorError, LoaderConfig, ModuleEntry, RuntimeConfig,
};
use wasm_executor_host::{CreateOutcome, HostApi, Permissions};

/// Shared state across all request handlers.
///
/// This struct is cloned for each request, so it uses `Arc` for shared data.
#[derive(Clone)]
pub struct AppState {
    /// Registry facade (shared across all requests).
    api: Arc<HostApi>,

    /// Token required for module loads, if any.
    admin_token: Option<Arc<str>>,

    /// Directories modules may be loaded from.
    allowed_dirs: Arc<[PathBuf]>,
}

impl AppState {
    /// Create new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be created, or if the admin
    /// token is enabled without a token value.
    pub fn new(
        runtime: &RuntimeConfig,
        loader: &LoaderConfig,
        admin: &AdminConfig,
    ) -> Result<Self, ExecutorError> {
        if admin.enabled && !admin.is_configured() {
            return Err(ExecutorError::invalid_config(
                "admin.enabled is set but admin.token is missing",
            ));
        }

        let api = HostApi::from_config(runtime, loader)?;
        let token = admin.is_configured().then(|| admin.token.clone()).flatten();

        Ok(Self::from_api(api, token, loader.allowed_dirs.clone()))
    }

    /// Wrap an existing API.
    pub fn from_api(api: HostApi, admin_token: Option<String>, allowed_dirs: Vec<PathBuf>) -> Self {
        Self {
            api: Arc::new(api),
            admin_token: admin_token.map(Into::into),
            allowed_dirs: allowed_dirs.into(),
        }
    }

    /// Get the registry facade.
    pub fn api(&self) -> &Arc<HostApi> {
        &self.api
    }

    /// Get the admin token, if loads are protected.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    /// Permissions granted to a caller allowed to load modules.
    pub fn load_permissions(&self) -> Permissions {
        Permissions::builder()
            .allow_load()
            .allow_dirs(self.allowed_dirs.iter().cloned())
            .build()
    }

    /// Register the configured startup modules.
    ///
    /// # Errors
    ///
    /// Returns the first load error; modules registered before it stay
    /// registered.
    pub fn preload(&self, modules: &[ModuleEntry]) -> Result<Vec<CreateOutcome>, ExecutorError> {
        let permissions = self.load_permissions();

        modules
            .iter()
            .map(|entry| {
                let outcome = self.api.create_instance(&permissions, &entry.path)?;
                info!(instance_id = %outcome.id, path = %entry.path, "Module preloaded");
                Ok(outcome)
            })
            .collect()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("instances", &self.api.registry().len())
            .field("admin_protected", &self.admin_token.is_some())
            .finish_non_exhaustive()
    }
}
