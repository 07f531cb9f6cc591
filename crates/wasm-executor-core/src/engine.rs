//! Wasmtime engine configuration and the Wasmtime [`Backend`] adapter.
//!
//! The [`WasmEngine`] is shared by every instance in a registry. It holds
//! compilation settings only; all per-instance state lives in the store
//! owned by each [`WasmtimeInstance`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use wasmtime::{Config, Engine, ExternType, Instance, Module, Store, Trap, Val, ValType};

use wasm_executor_common::{EngineConfig, ExecutionConfig, ExecutorError, OptLevel};

use crate::backend::{Backend, CallError, ExportDescriptor, ExportKind, RawValType, Value};
use crate::store::{InstanceState, create_store, fuel_consumed, refuel};

/// Thread-safe WebAssembly engine wrapper.
///
/// Wraps a Wasmtime [`Engine`] together with the configuration it was
/// built from. Cloning is cheap.
///
/// # Example
///
/// ```ignore
/// use wasm_executor_common::EngineConfig;
/// use wasm_executor_core::WasmEngine;
///
/// let engine = WasmEngine::new(&EngineConfig::default())?;
/// ```
#[derive(Clone)]
pub struct WasmEngine {
    engine: Arc<Engine>,
    config: EngineConfig,
}

impl WasmEngine {
    /// Create a new engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InvalidConfig`] if Wasmtime rejects the
    /// configuration (for example a zero stack size).
    pub fn new(config: &EngineConfig) -> Result<Self, ExecutorError> {
        if config.max_wasm_stack_kb == 0 {
            return Err(ExecutorError::invalid_config(
                "max_wasm_stack_kb must be greater than zero",
            ));
        }

        let mut wasmtime_config = Config::new();

        wasmtime_config.consume_fuel(config.fuel_metering);
        wasmtime_config.cranelift_opt_level(match config.cranelift_opt_level {
            OptLevel::None => wasmtime::OptLevel::None,
            OptLevel::Speed => wasmtime::OptLevel::Speed,
            OptLevel::SpeedAndSize => wasmtime::OptLevel::SpeedAndSize,
        });
        wasmtime_config.max_wasm_stack(config.max_wasm_stack_bytes());
        wasmtime_config.parallel_compilation(config.parallel_compilation);

        let engine = Engine::new(&wasmtime_config).map_err(|e| {
            ExecutorError::invalid_config(format!("Failed to create Wasmtime engine: {e}"))
        })?;

        info!(
            fuel_metering = config.fuel_metering,
            opt_level = ?config.cranelift_opt_level,
            max_wasm_stack_kb = config.max_wasm_stack_kb,
            "Wasmtime engine initialized"
        );

        Ok(Self {
            engine: Arc::new(engine),
            config: config.clone(),
        })
    }

    /// Get a reference to the inner Wasmtime engine.
    pub fn inner(&self) -> &Engine {
        &self.engine
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check if fuel metering is enabled.
    pub fn is_fuel_metering_enabled(&self) -> bool {
        self.config.fuel_metering
    }
}

impl std::fmt::Debug for WasmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmEngine")
            .field("fuel_metering", &self.config.fuel_metering)
            .field("opt_level", &self.config.cranelift_opt_level)
            .finish_non_exhaustive()
    }
}

/// A live Wasmtime instance with the store it runs in.
///
/// Dropping this releases the store, the instance and the module handle
/// together.
pub struct WasmtimeInstance {
    store: Store<InstanceState>,
    module: Module,
    instance: Instance,
}

impl WasmtimeInstance {
    /// Total calls executed by this instance.
    pub fn calls(&self) -> u64 {
        self.store.data().calls
    }
}

impl std::fmt::Debug for WasmtimeInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmtimeInstance")
            .field("module", &self.module.name())
            .field("calls", &self.store.data().calls)
            .finish_non_exhaustive()
    }
}

/// [`Backend`] implementation on top of Wasmtime.
#[derive(Debug, Clone)]
pub struct WasmtimeBackend {
    engine: WasmEngine,
    execution: ExecutionConfig,
}

impl WasmtimeBackend {
    /// Create a backend over an existing engine.
    pub fn new(engine: WasmEngine, execution: ExecutionConfig) -> Self {
        Self { engine, execution }
    }

    /// Get the shared engine.
    pub fn engine(&self) -> &WasmEngine {
        &self.engine
    }

    /// Get the per-instance execution limits.
    pub fn execution(&self) -> &ExecutionConfig {
        &self.execution
    }
}

impl Backend for WasmtimeBackend {
    type Module = Module;
    type Instance = WasmtimeInstance;

    fn name(&self) -> &'static str {
        "wasmtime"
    }

    fn validate(&self, path: &str, wasm: &[u8]) -> Result<(), ExecutorError> {
        Module::validate(self.engine.inner(), wasm)
            .map_err(|e| ExecutorError::validation(path, format!("{e:#}")))
    }

    fn compile(&self, path: &str, wasm: &[u8]) -> Result<Module, ExecutorError> {
        let start = Instant::now();

        let module = Module::from_binary(self.engine.inner(), wasm)
            .map_err(|e| ExecutorError::compile(path, format!("{e:#}")))?;

        debug!(
            path = %path,
            duration_ms = start.elapsed().as_millis(),
            "Module compiled"
        );

        Ok(module)
    }

    fn instantiate(&self, path: &str, module: Module) -> Result<WasmtimeInstance, ExecutorError> {
        let mut store = create_store(&self.engine, &self.execution)?;

        let instance = Instance::new(&mut store, &module, &[])
            .map_err(|e| ExecutorError::instantiation(path, format!("{e:#}")))?;

        Ok(WasmtimeInstance {
            store,
            module,
            instance,
        })
    }

    fn exports(&self, instance: &WasmtimeInstance) -> Vec<ExportDescriptor> {
        instance
            .module
            .exports()
            .map(|export| {
                let kind = match export.ty() {
                    ExternType::Func(func) => ExportKind::Function {
                        params: func.params().map(|ty| raw_val_type(&ty)).collect(),
                        results: func.results().map(|ty| raw_val_type(&ty)).collect(),
                    },
                    ExternType::Memory(_) => ExportKind::Memory,
                    ExternType::Global(_) => ExportKind::Global,
                    ExternType::Table(_) => ExportKind::Table,
                    #[allow(unreachable_patterns)]
                    _ => ExportKind::Other,
                };
                ExportDescriptor {
                    name: export.name().to_string(),
                    kind,
                }
            })
            .collect()
    }

    fn call(
        &self,
        handle: &mut WasmtimeInstance,
        function: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let metering = self.engine.is_fuel_metering_enabled();
        let WasmtimeInstance {
            store, instance, ..
        } = handle;

        let func = instance
            .get_func(&mut *store, function)
            .ok_or(CallError::MissingFunction)?;

        if metering {
            refuel(store, &self.execution).map_err(|e| CallError::Trap {
                message: e.to_string(),
            })?;
        }

        let params: Vec<Val> = args
            .iter()
            .map(|arg| match *arg {
                Value::I32(v) => Val::I32(v),
                Value::I64(v) => Val::I64(v),
            })
            .collect();
        let result_count = func.ty(&*store).results().len();
        let mut results = vec![Val::I32(0); result_count];

        let outcome = func.call(&mut *store, &params, &mut results);

        let consumed = if metering {
            fuel_consumed(self.execution.max_fuel, store)
        } else {
            0
        };
        store.data_mut().record_call(consumed);

        if let Err(error) = outcome {
            return Err(match error.downcast_ref::<Trap>() {
                Some(Trap::OutOfFuel) => CallError::FuelExhausted,
                Some(trap) => CallError::Trap {
                    message: trap.to_string(),
                },
                None => CallError::Trap {
                    message: format!("{error:#}"),
                },
            });
        }

        match results.as_slice() {
            [Val::I32(v)] => Ok(Value::I32(*v)),
            [Val::I64(v)] => Ok(Value::I64(*v)),
            [other] => Err(CallError::UnexpectedResult {
                found: format!("{other:?}"),
            }),
            many => Err(CallError::UnexpectedResult {
                found: format!("{} values", many.len()),
            }),
        }
    }
}

fn raw_val_type(ty: &ValType) -> RawValType {
    match ty {
        ValType::I32 => RawValType::I32,
        ValType::I64 => RawValType::I64,
        ValType::F32 => RawValType::F32,
        ValType::F64 => RawValType::F64,
        ValType::V128 => RawValType::V128,
        #[allow(unreachable_patterns)]
        other => RawValType::Ref(other.to_string()),
    }
}
