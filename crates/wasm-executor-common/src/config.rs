//! Configuration structures for wasm-executor.
//!
//! This module defines configuration options for various components:
//! - [`RuntimeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings (compilation, metering)
//! - [`ExecutionConfig`]: Per-instance limits (fuel, memory)

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
///
/// It can be loaded from files (TOML, JSON) as the `[runtime]` table of a
/// [`ConfigFile`](crate::ConfigFile).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-instance execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Cranelift optimization level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    /// No optimizations.
    None,
    /// Optimize for speed.
    #[default]
    Speed,
    /// Optimize for speed and code size.
    SpeedAndSize,
}

/// Wasmtime engine configuration.
///
/// These settings apply to the single engine shared by every instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Enable fuel metering.
    ///
    /// When enabled, every call is limited by
    /// [`ExecutionConfig::max_fuel`]. Disabled by default: a call runs until
    /// it returns or traps.
    #[serde(default = "defaults::fuel_metering")]
    pub fuel_metering: bool,

    /// Cranelift optimization level.
    #[serde(default)]
    pub cranelift_opt_level: OptLevel,

    /// Maximum guest stack size in kilobytes.
    #[serde(default = "defaults::max_wasm_stack_kb")]
    pub max_wasm_stack_kb: u32,

    /// Compile function bodies in parallel.
    #[serde(default = "defaults::parallel_compilation")]
    pub parallel_compilation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuel_metering: defaults::fuel_metering(),
            cranelift_opt_level: OptLevel::default(),
            max_wasm_stack_kb: defaults::max_wasm_stack_kb(),
            parallel_compilation: defaults::parallel_compilation(),
        }
    }
}

impl EngineConfig {
    /// Get the maximum guest stack size in bytes.
    pub fn max_wasm_stack_bytes(&self) -> usize {
        (self.max_wasm_stack_kb as usize) * 1024
    }
}

/// Per-instance execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Fuel granted to each call when metering is enabled.
    ///
    /// A typical simple function consumes ~1,000-10,000 fuel.
    #[serde(default = "defaults::max_fuel")]
    pub max_fuel: u64,

    /// Maximum linear memory per instance in megabytes.
    #[serde(default = "defaults::max_memory_mb")]
    pub max_memory_mb: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_fuel: defaults::max_fuel(),
            max_memory_mb: defaults::max_memory_mb(),
        }
    }
}

impl ExecutionConfig {
    /// Get the memory limit in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_mb as usize) * 1024 * 1024
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn fuel_metering() -> bool {
        false
    }

    pub const fn max_wasm_stack_kb() -> u32 {
        512
    }

    pub const fn parallel_compilation() -> bool {
        true
    }

    pub const fn max_fuel() -> u64 {
        10_000_000
    }

    pub const fn max_memory_mb() -> u32 {
        128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();

        assert!(!config.engine.fuel_metering);
        assert_eq!(config.engine.cranelift_opt_level, OptLevel::Speed);
        assert_eq!(config.engine.max_wasm_stack_kb, 512);
        assert!(config.engine.parallel_compilation);

        assert_eq!(config.execution.max_fuel, 10_000_000);
        assert_eq!(config.execution.max_memory_mb, 128);
    }

    #[test]
    fn test_config_serialization() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: RuntimeConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(
            config.engine.max_wasm_stack_kb,
            deserialized.engine.max_wasm_stack_kb
        );
        assert_eq!(config.execution.max_fuel, deserialized.execution.max_fuel);
    }

    #[test]
    fn test_byte_conversions() {
        let engine = EngineConfig {
            max_wasm_stack_kb: 2,
            ..Default::default()
        };
        assert_eq!(engine.max_wasm_stack_bytes(), 2048);

        let execution = ExecutionConfig {
            max_memory_mb: 1,
            ..Default::default()
        };
        assert_eq!(execution.max_memory_bytes(), 1024 * 1024);
    }

    #[test]
    fn test_partial_deserialization() {
        let json = r#"{"engine": {"fuel_metering": true, "cranelift_opt_level": "none"}}"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();

        // Explicitly set values
        assert!(config.engine.fuel_metering);
        assert_eq!(config.engine.cranelift_opt_level, OptLevel::None);
        // Default values for unspecified fields
        assert_eq!(config.engine.max_wasm_stack_kb, 512);
        assert_eq!(config.execution.max_fuel, 10_000_000);
    }
}
