//! Common types, errors, and configuration for wasm-executor.
//!
//! This crate provides shared functionality used across the wasm-executor workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for engine and execution settings
//! - The stable [`InstanceId`] derived from a module's source path

pub mod config;
pub mod config_file;
pub mod error;
pub mod id;

pub use config::{EngineConfig, ExecutionConfig, OptLevel, RuntimeConfig};
pub use config_file::{
    AdminConfig, ConfigFile, ConfigFileError, LoaderConfig, ModuleEntry, ServerConfigFile,
};
pub use error::{ErrorCategory, ExecutorError};
pub use id::InstanceId;
