//! Error types for wasm-executor.
//!
//! [`ExecutorError`] covers every failure surfaced by the registry, from
//! reading a module file to a trap inside the guest. Errors are grouped into
//! phases:
//! - Loading: [`Load`](ExecutorError::Load), [`Compile`](ExecutorError::Compile),
//!   [`Validation`](ExecutorError::Validation),
//!   [`Instantiation`](ExecutorError::Instantiation)
//! - Lookup: [`InstanceNotFound`](ExecutorError::InstanceNotFound),
//!   [`FunctionNotFound`](ExecutorError::FunctionNotFound)
//! - Catalog build: [`UnsupportedArity`](ExecutorError::UnsupportedArity),
//!   [`UnsupportedReturnArity`](ExecutorError::UnsupportedReturnArity),
//!   [`UnsupportedType`](ExecutorError::UnsupportedType)
//! - Call: [`ArityMismatch`](ExecutorError::ArityMismatch),
//!   [`Trap`](ExecutorError::Trap), [`FuelExhausted`](ExecutorError::FuelExhausted)

use std::io;

use thiserror::Error;

use crate::InstanceId;

/// Top-level executor errors.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The module file could not be opened or read in full.
    #[error("Failed to load module '{path}': {source}")]
    Load {
        /// Path of the module file.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The module bytes do not parse as a WebAssembly module.
    #[error("Compilation failed for '{path}': {reason}")]
    Compile {
        /// Path of the module file.
        path: String,
        /// Description of the compilation failure.
        reason: String,
    },

    /// The module failed WebAssembly validation.
    #[error("Validation failed for '{path}': {reason}")]
    Validation {
        /// Path of the module file.
        path: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// Instantiation trapped or an import could not be satisfied.
    #[error("Instantiation failed for '{path}': {reason}")]
    Instantiation {
        /// Path of the module file.
        path: String,
        /// Description of the instantiation failure.
        reason: String,
    },

    /// No instance is registered under the identifier.
    #[error("Instance not found: {instance_id}")]
    InstanceNotFound {
        /// The identifier that was looked up.
        instance_id: InstanceId,
    },

    /// The instance has no exported function with this name.
    #[error("Function '{function}' not found in instance {instance_id}")]
    FunctionNotFound {
        /// The instance that was searched.
        instance_id: InstanceId,
        /// The requested function name.
        function: String,
    },

    /// An exported function declares more parameters than supported.
    #[error(
        "Function '{function}' of instance {instance_id} has {count} parameters, at most {max} are supported"
    )]
    UnsupportedArity {
        /// The instance exporting the function.
        instance_id: InstanceId,
        /// The offending function.
        function: String,
        /// Declared parameter count.
        count: usize,
        /// Maximum supported parameter count.
        max: usize,
    },

    /// An exported function does not return exactly one value.
    #[error(
        "Function '{function}' of instance {instance_id} returns {count} values, exactly one is supported"
    )]
    UnsupportedReturnArity {
        /// The instance exporting the function.
        instance_id: InstanceId,
        /// The offending function.
        function: String,
        /// Declared result count.
        count: usize,
    },

    /// An exported function uses a value type other than i32/i64.
    #[error("Function '{function}' of instance {instance_id} uses unsupported value type {kind}")]
    UnsupportedType {
        /// The instance exporting the function.
        instance_id: InstanceId,
        /// The offending function.
        function: String,
        /// Name of the unsupported value type.
        kind: String,
    },

    /// The number of supplied arguments differs from the declared parameters.
    #[error(
        "Function '{function}' of instance {instance_id} expects {expected} arguments, got {actual}"
    )]
    ArityMismatch {
        /// The instance the call targeted.
        instance_id: InstanceId,
        /// The called function.
        function: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// The guest trapped during execution.
    #[error("Wasm trap in '{function}' of instance {instance_id}: {message}")]
    Trap {
        /// The instance the call ran in.
        instance_id: InstanceId,
        /// The called function.
        function: String,
        /// Diagnostic reported by the runtime.
        message: String,
    },

    /// Execution exhausted the configured fuel limit.
    #[error("Fuel exhausted in '{function}' of instance {instance_id}")]
    FuelExhausted {
        /// The instance the call ran in.
        instance_id: InstanceId,
        /// The called function.
        function: String,
    },

    /// The caller is not allowed to perform the operation.
    #[error("Permission denied: {reason}")]
    PermissionDenied {
        /// Why the request was denied.
        reason: String,
    },

    /// A textual instance identifier could not be parsed.
    #[error("Invalid instance id: '{input}'")]
    InvalidInstanceId {
        /// The rejected input.
        input: String,
    },

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

/// Coarse classification of an [`ExecutorError`].
///
/// Lets operators tell configuration mistakes apart from environment
/// problems without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller lacks the privilege for the operation.
    Authorization,
    /// A missing or malformed module file, or bad configuration.
    Configuration,
    /// An instance or function does not exist.
    Lookup,
    /// A function signature is outside the supported subset.
    Signature,
    /// The call itself was malformed.
    Call,
    /// The guest faulted.
    Guest,
    /// A transient resource failure (I/O, memory, fuel).
    Resource,
}

impl ExecutorError {
    /// Create a new `Load` error.
    pub fn load(path: impl Into<String>, source: io::Error) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }

    /// Create a new `Compile` error.
    pub fn compile(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `Validation` error.
    pub fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `Instantiation` error.
    pub fn instantiation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Instantiation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `InstanceNotFound` error.
    pub fn instance_not_found(instance_id: InstanceId) -> Self {
        Self::InstanceNotFound { instance_id }
    }

    /// Create a new `FunctionNotFound` error.
    pub fn function_not_found(instance_id: InstanceId, function: impl Into<String>) -> Self {
        Self::FunctionNotFound {
            instance_id,
            function: function.into(),
        }
    }

    /// Create a new `Trap` error.
    pub fn trap(
        instance_id: InstanceId,
        function: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Trap {
            instance_id,
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create a new `PermissionDenied` error.
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if an instance or function lookup failed.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::InstanceNotFound { .. } | Self::FunctionNotFound { .. }
        )
    }

    /// Returns `true` if the error happened while loading a module.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::Load { .. }
                | Self::Compile { .. }
                | Self::Validation { .. }
                | Self::Instantiation { .. }
        )
    }

    /// Returns `true` if the guest trapped.
    pub fn is_trap(&self) -> bool {
        matches!(self, Self::Trap { .. })
    }

    /// Classify the error.
    ///
    /// A missing or unreadable-by-permission module file is a configuration
    /// mistake; any other I/O failure is treated as a transient resource
    /// problem.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PermissionDenied { .. } => ErrorCategory::Authorization,
            Self::Load { source, .. } => match source.kind() {
                io::ErrorKind::NotFound
                | io::ErrorKind::PermissionDenied
                | io::ErrorKind::IsADirectory
                | io::ErrorKind::InvalidInput => ErrorCategory::Configuration,
                _ => ErrorCategory::Resource,
            },
            Self::Compile { .. }
            | Self::Validation { .. }
            | Self::Instantiation { .. }
            | Self::InvalidConfig { .. } => ErrorCategory::Configuration,
            Self::InstanceNotFound { .. } | Self::FunctionNotFound { .. } => {
                ErrorCategory::Lookup
            }
            Self::UnsupportedArity { .. }
            | Self::UnsupportedReturnArity { .. }
            | Self::UnsupportedType { .. } => ErrorCategory::Signature,
            Self::ArityMismatch { .. } | Self::InvalidInstanceId { .. } => ErrorCategory::Call,
            Self::Trap { .. } => ErrorCategory::Guest,
            Self::FuelExhausted { .. } => ErrorCategory::Resource,
        }
    }
}
