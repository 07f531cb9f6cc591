//! Operations exposed to the embedding host.
//!
//! [`HostApi`] wraps a [`Registry`] with the host-side concerns: privilege
//! checks and path canonicalization on load, row conversion for listings,
//! and textual instance ids on invocation. The fixed-arity `invoke_N`
//! wrappers exist for hosts that bind one entry point per argument count.

use serde::Serialize;
use tracing::{info, instrument};

use wasm_executor_common::{ExecutorError, InstanceId, LoaderConfig, RuntimeConfig};
use wasm_executor_core::{Backend, Registry, WasmtimeBackend};

use crate::paths::PathResolver;
use crate::permissions::Permissions;
use crate::rows::{FunctionRow, InstanceRow};

/// Result of [`HostApi::create_instance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOutcome {
    /// Identifier of the instance.
    pub id: InstanceId,
    /// `true` if this call loaded the module.
    pub created: bool,
    /// Informational message when the instance already existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Host-facing facade over a [`Registry`].
pub struct HostApi<B: Backend = WasmtimeBackend> {
    registry: Registry<B>,
    resolver: PathResolver,
}

impl HostApi<WasmtimeBackend> {
    /// Build the API on a fresh Wasmtime registry.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidConfig`] if the engine cannot be
    /// created.
    pub fn from_config(
        runtime: &RuntimeConfig,
        loader: &LoaderConfig,
    ) -> Result<Self, ExecutorError> {
        Ok(Self::new(
            Registry::new(runtime)?,
            PathResolver::new(loader.base_dir.clone()),
        ))
    }
}

impl<B: Backend> HostApi<B> {
    /// Wrap an existing registry.
    pub fn new(registry: Registry<B>, resolver: PathResolver) -> Self {
        Self { registry, resolver }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Registry<B> {
        &self.registry
    }

    /// The path resolver used by [`HostApi::create_instance`].
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Load the module at `path`, or return the instance already registered
    /// for it.
    ///
    /// The path is canonicalized first; the instance id is derived from the
    /// canonical path.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::PermissionDenied`] if the caller may not
    /// load modules or the path is outside the allowed directories, and any
    /// load error from the registry.
    #[instrument(skip(self, permissions))]
    pub fn create_instance(
        &self,
        permissions: &Permissions,
        path: &str,
    ) -> Result<CreateOutcome, ExecutorError> {
        permissions.check_load_enabled()?;

        let canonical = self.resolver.resolve(path)?;
        permissions.check_load(&canonical)?;

        let registration = self.registry.load(&canonical)?;
        let id = registration.id();

        if registration.is_created() {
            return Ok(CreateOutcome {
                id,
                created: true,
                notice: None,
            });
        }

        let notice = format!("instance already created for {}", canonical.display());
        info!(instance_id = %id, "{notice}");

        Ok(CreateOutcome {
            id,
            created: false,
            notice: Some(notice),
        })
    }

    /// List registered instances in registration order.
    pub fn list_instances(&self) -> Vec<InstanceRow> {
        self.registry
            .list()
            .into_iter()
            .map(InstanceRow::from)
            .collect()
    }

    /// List the callable functions of an instance in export order.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InstanceNotFound`] or a signature error.
    pub fn list_exported_functions(
        &self,
        id: InstanceId,
    ) -> Result<Vec<FunctionRow>, ExecutorError> {
        let catalog = self.registry.exports_of(id)?;
        Ok(catalog.iter().map(FunctionRow::from).collect())
    }

    /// Invoke `function` on the instance whose id is given as text.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidInstanceId`] if `id` does not parse,
    /// and any error of [`Registry::invoke`].
    pub fn invoke(&self, id: &str, function: &str, args: &[i64]) -> Result<i64, ExecutorError> {
        let id: InstanceId = id.parse()?;
        self.registry.invoke(id, function, args)
    }
}

/// Generate fixed-arity wrappers around [`HostApi::invoke`].
macro_rules! invoke_with_arity {
    ($($name:ident($($arg:ident),*);)*) => {
        impl<B: Backend> HostApi<B> {
            $(
                #[doc = concat!(
                    "Fixed-arity form of [`HostApi::invoke`] with arguments `(",
                    stringify!($($arg),*),
                    ")`."
                )]
                ///
                /// # Errors
                ///
                /// See [`HostApi::invoke`].
                #[allow(clippy::too_many_arguments)]
                pub fn $name(
                    &self,
                    id: &str,
                    function: &str
                    $(, $arg: i64)*
                ) -> Result<i64, ExecutorError> {
                    self.invoke(id, function, &[$($arg),*])
                }
            )*
        }
    };
}

invoke_with_arity! {
    invoke_0();
    invoke_1(a1);
    invoke_2(a1, a2);
    invoke_3(a1, a2, a3);
    invoke_4(a1, a2, a3, a4);
    invoke_5(a1, a2, a3, a4, a5);
    invoke_6(a1, a2, a3, a4, a5, a6);
    invoke_7(a1, a2, a3, a4, a5, a6, a7);
    invoke_8(a1, a2, a3, a4, a5, a6, a7, a8);
    invoke_9(a1, a2, a3, a4, a5, a6, a7, a8, a9);
    invoke_10(a1, a2, a3, a4, a5, a6, a7, a8, a9, a10);
}

impl<B: Backend> std::fmt::Debug for HostApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostApi")
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const ADDER: &str = r#"
        (module
            (memory (export "memory") 1)
            (func (export "add") (param i64 i64) (result i64)
                local.get 0
                local.get 1
                i64.add))
    "#;

    fn api(dir: &Path) -> HostApi {
        let loader = LoaderConfig {
            base_dir: Some(dir.to_path_buf()),
            allowed_dirs: Vec::new(),
        };
        HostApi::from_config(&RuntimeConfig::default(), &loader).unwrap()
    }

    #[test]
    fn test_adder_scenario() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("adder.wat"), ADDER).unwrap();
        let api = api(dir.path());

        let outcome = api.create_instance(&Permissions::all(), "adder.wat").unwrap();
        assert!(outcome.created);
        assert!(outcome.notice.is_none());

        let rows = api.list_exported_functions(outcome.id).unwrap();
        assert_eq!(
            rows,
            [FunctionRow {
                name: "add".to_string(),
                parameter_kinds: "bigint,bigint".to_string(),
                return_kind: "bigint".to_string(),
            }]
        );

        let id = outcome.id.to_string();
        assert_eq!(api.invoke_2(&id, "add", 40, 2).unwrap(), 42);
        assert_eq!(api.invoke(&id, "add", &[1, 1]).unwrap(), 2);
    }

    #[test]
    fn test_create_twice_returns_notice() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("adder.wat"), ADDER).unwrap();
        let api = api(dir.path());

        let first = api.create_instance(&Permissions::all(), "adder.wat").unwrap();
        let second = api
            .create_instance(&Permissions::all(), "./adder.wat")
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(!second.created);
        assert!(second.notice.unwrap().contains("already created"));
        assert_eq!(api.list_instances().len(), 1);
    }

    #[test]
    fn test_id_derives_from_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("adder.wat"), ADDER).unwrap();
        let api = api(dir.path());

        let outcome = api.create_instance(&Permissions::all(), "adder.wat").unwrap();
        let canonical = std::fs::canonicalize(dir.path().join("adder.wat")).unwrap();

        assert_eq!(
            outcome.id,
            InstanceId::from_path(&canonical.to_string_lossy())
        );
        assert_eq!(api.list_instances()[0].path, canonical.display().to_string());
    }

    #[test]
    fn test_create_requires_privilege() {
        let dir = tempfile::tempdir().unwrap();
        let api = api(dir.path());

        // Checked before the path is even looked at
        let err = api
            .create_instance(&Permissions::none(), "missing.wat")
            .unwrap_err();
        assert!(matches!(err, ExecutorError::PermissionDenied { .. }));
        assert!(api.list_instances().is_empty());
    }

    #[test]
    fn test_create_outside_allowed_dirs() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        std::fs::write(other.path().join("adder.wat"), ADDER).unwrap();
        let api = api(other.path());

        let perms = Permissions::builder()
            .allow_load()
            .allow_dirs([allowed.path()])
            .build();

        let err = api.create_instance(&perms, "adder.wat").unwrap_err();
        assert!(matches!(err, ExecutorError::PermissionDenied { .. }));
    }

    #[test]
    fn test_invoke_bad_id_text() {
        let dir = tempfile::tempdir().unwrap();
        let api = api(dir.path());

        let err = api.invoke_0("abc", "f").unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidInstanceId { .. }));

        let err = api.invoke_0("17", "f").unwrap_err();
        assert!(matches!(err, ExecutorError::InstanceNotFound { .. }));
    }

    #[test]
    fn test_every_arity_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let funcs: String = (0..=10)
            .map(|n| {
                let params = "i64 ".repeat(n);
                let body = if n == 0 {
                    "i64.const 0".to_string()
                } else {
                    (0..n).map(|i| format!("local.get {i} ")).collect::<String>()
                        + &"i64.add ".repeat(n - 1)
                };
                format!(r#"(func (export "sum{n}") (param {params}) (result i64) {body})"#)
            })
            .collect();
        std::fs::write(dir.path().join("sums.wat"), format!("(module {funcs})")).unwrap();

        let api = api(dir.path());
        let id = api
            .create_instance(&Permissions::all(), "sums.wat")
            .unwrap()
            .id
            .to_string();

        assert_eq!(api.invoke_0(&id, "sum0").unwrap(), 0);
        assert_eq!(api.invoke_1(&id, "sum1", 1).unwrap(), 1);
        assert_eq!(api.invoke_2(&id, "sum2", 1, 2).unwrap(), 3);
        assert_eq!(api.invoke_3(&id, "sum3", 1, 2, 3).unwrap(), 6);
        assert_eq!(api.invoke_4(&id, "sum4", 1, 2, 3, 4).unwrap(), 10);
        assert_eq!(api.invoke_5(&id, "sum5", 1, 2, 3, 4, 5).unwrap(), 15);
        assert_eq!(api.invoke_6(&id, "sum6", 1, 2, 3, 4, 5, 6).unwrap(), 21);
        assert_eq!(api.invoke_7(&id, "sum7", 1, 2, 3, 4, 5, 6, 7).unwrap(), 28);
        assert_eq!(
            api.invoke_8(&id, "sum8", 1, 2, 3, 4, 5, 6, 7, 8).unwrap(),
            36
        );
        assert_eq!(
            api.invoke_9(&id, "sum9", 1, 2, 3, 4, 5, 6, 7, 8, 9).unwrap(),
            45
        );
        assert_eq!(
            api.invoke_10(&id, "sum10", 1, 2, 3, 4, 5, 6, 7, 8, 9, 10)
                .unwrap(),
            55
        );

        // Wrong wrapper for the function's arity
        let err = api.invoke_1(&id, "sum2", 1).unwrap_err();
        assert!(matches!(err, ExecutorError::ArityMismatch { .. }));
    }
}
