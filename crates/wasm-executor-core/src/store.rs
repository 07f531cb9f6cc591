//! Per-instance store state and resource limits.
//!
//! Every registered instance owns exactly one [`Store`] for its whole
//! lifetime. The store data, [`InstanceState`], carries the memory limiter
//! and a few counters that are reported in logs.

use wasmtime::{Store, StoreLimits, StoreLimitsBuilder};

use crate::WasmEngine;
use wasm_executor_common::{ExecutionConfig, ExecutorError};

/// Data attached to an instance's store.
#[derive(Debug)]
pub struct InstanceState {
    limits: StoreLimits,

    /// Number of calls executed.
    pub calls: u64,

    /// Fuel consumed across all calls (zero without metering).
    pub fuel_consumed: u64,
}

impl InstanceState {
    /// Create state enforcing the given memory limit.
    pub fn new(max_memory_bytes: usize) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(max_memory_bytes)
            .instances(1)
            .build();

        Self {
            limits,
            calls: 0,
            fuel_consumed: 0,
        }
    }

    /// Account for one finished call.
    pub fn record_call(&mut self, fuel: u64) {
        self.calls += 1;
        self.fuel_consumed = self.fuel_consumed.saturating_add(fuel);
    }
}

/// Create a store for a new instance.
///
/// The store enforces [`ExecutionConfig::max_memory_bytes`]. When the engine
/// meters fuel, the store starts with a full tank so that a start function
/// can run during instantiation.
///
/// # Errors
///
/// Returns an error if fuel cannot be set on the store.
pub fn create_store(
    engine: &WasmEngine,
    config: &ExecutionConfig,
) -> Result<Store<InstanceState>, ExecutorError> {
    let mut store = Store::new(engine.inner(), InstanceState::new(config.max_memory_bytes()));
    store.limiter(|state| &mut state.limits);

    if engine.is_fuel_metering_enabled() {
        refuel(&mut store, config)?;
    }

    Ok(store)
}

/// Reset the store's fuel to the per-call budget.
///
/// # Errors
///
/// Returns an error if the engine was built without fuel metering.
pub fn refuel(
    store: &mut Store<InstanceState>,
    config: &ExecutionConfig,
) -> Result<(), ExecutorError> {
    store
        .set_fuel(config.max_fuel)
        .map_err(|e| ExecutorError::invalid_config(format!("Failed to set fuel: {e}")))
}

/// Get remaining fuel from a store.
pub fn remaining_fuel(store: &Store<InstanceState>) -> Option<u64> {
    store.get_fuel().ok()
}

/// Fuel consumed since the store was last refueled to `initial_fuel`.
pub fn fuel_consumed(initial_fuel: u64, store: &Store<InstanceState>) -> u64 {
    let remaining = remaining_fuel(store).unwrap_or(0);
    initial_fuel.saturating_sub(remaining)
}
