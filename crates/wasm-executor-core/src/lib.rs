//! Embedded WebAssembly module registry and typed invocation.
//!
//! This crate loads modules from disk, keeps one live instance per
//! [`InstanceId`](wasm_executor_common::InstanceId), and calls their exported
//! integer functions:
//! - [`Registry`]: registration, lookup and listing of instances
//! - [`Catalog`]: the callable functions of an instance
//! - [`Registry::invoke`]: argument conversion and the call itself
//! - [`Backend`]: the engine seam, implemented by [`WasmtimeBackend`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Registry                          │
//! │  InstanceId -> ModuleInstance (created once per id)     │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    ModuleInstance                       │
//! │  - Lazily built Catalog (i32/i64, <= 10 params)         │
//! │  - Execution lock around the engine instance            │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          WasmtimeBackend (shared WasmEngine)            │
//! │  Store<InstanceState> + Module + Instance per entry     │
//! │  - Memory limit, optional fuel metering                 │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod catalog;
pub mod engine;
pub mod instance;
pub mod invoke;
pub mod module;
pub mod registry;
pub mod store;

#[cfg(test)]
mod testing;

pub use backend::{Backend, CallError, ExportDescriptor, ExportKind, RawValType, Value};
pub use catalog::{Catalog, ExportedFunction, MAX_PARAMS, ValueKind};
pub use engine::{WasmEngine, WasmtimeBackend, WasmtimeInstance};
pub use instance::ModuleInstance;
pub use invoke::{marshal_args, unmarshal_result};
pub use module::{ModuleFormat, ModuleSource};
pub use registry::{InstanceSummary, Registration, Registry};
pub use store::InstanceState;
