//! Backend-neutral view of a WebAssembly engine.
//!
//! The registry, catalog and invocation layers only talk to an engine
//! through [`Backend`], which exposes the capabilities they need:
//! validate, compile, instantiate, enumerate exports with their signatures,
//! and call a function. Values and types crossing this boundary use the
//! neutral [`Value`] and [`RawValType`] representations.

use std::fmt;

use wasm_executor_common::ExecutorError;

/// A value type as reflected by the engine.
///
/// Covers every core WebAssembly value type so that unsupported kinds can be
/// reported by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValType {
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// 128-bit vector.
    V128,
    /// A reference type, named as the engine prints it.
    Ref(String),
}

impl fmt::Display for RawValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::V128 => write!(f, "v128"),
            Self::Ref(name) => write!(f, "{name}"),
        }
    }
}

/// An argument or result crossing the backend boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// 32-bit integer.
    I32(i32),
    /// 64-bit integer.
    I64(i64),
}

/// What kind of item an export is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    /// A function with its reflected signature.
    Function {
        /// Parameter types in declaration order.
        params: Vec<RawValType>,
        /// Result types in declaration order.
        results: Vec<RawValType>,
    },
    /// A linear memory.
    Memory,
    /// A global.
    Global,
    /// A table.
    Table,
    /// Anything else the engine reports (e.g. exception tags).
    Other,
}

/// One export of an instantiated module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDescriptor {
    /// Export name.
    pub name: String,
    /// Export kind and, for functions, signature.
    pub kind: ExportKind,
}

impl ExportDescriptor {
    /// Describe a function export.
    pub fn function(
        name: impl Into<String>,
        params: Vec<RawValType>,
        results: Vec<RawValType>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ExportKind::Function { params, results },
        }
    }
}

/// Why a call into the guest failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The guest trapped.
    Trap {
        /// Diagnostic reported by the engine.
        message: String,
    },
    /// The call ran out of fuel.
    FuelExhausted,
    /// The instance has no function export with this name.
    MissingFunction,
    /// The function returned something other than a single integer.
    UnexpectedResult {
        /// Description of what was returned.
        found: String,
    },
}

/// A WebAssembly engine adapter.
///
/// Implementations own all engine-specific objects. `Instance` bundles
/// everything a live instance needs (store, module, instance) so that it is
/// released as a unit when dropped.
pub trait Backend: Send + Sync + 'static {
    /// A compiled, not yet instantiated module.
    type Module: Send + Sync;

    /// A live instance together with the state it executes in.
    type Instance: Send;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Validate binary module bytes.
    ///
    /// Fails with [`ExecutorError::Validation`].
    fn validate(&self, path: &str, wasm: &[u8]) -> Result<(), ExecutorError>;

    /// Compile validated binary module bytes.
    ///
    /// Fails with [`ExecutorError::Compile`].
    fn compile(&self, path: &str, wasm: &[u8]) -> Result<Self::Module, ExecutorError>;

    /// Instantiate a module with no imports.
    ///
    /// Fails with [`ExecutorError::Instantiation`].
    fn instantiate(&self, path: &str, module: Self::Module)
    -> Result<Self::Instance, ExecutorError>;

    /// Enumerate the exports of an instance in module declaration order.
    fn exports(&self, instance: &Self::Instance) -> Vec<ExportDescriptor>;

    /// Call an exported function with already-marshaled arguments.
    fn call(
        &self,
        instance: &mut Self::Instance,
        function: &str,
        args: &[Value],
    ) -> Result<Value, CallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_val_type_display() {
        assert_eq!(RawValType::I32.to_string(), "i32");
        assert_eq!(RawValType::F32.to_string(), "f32");
        assert_eq!(RawValType::V128.to_string(), "v128");
        assert_eq!(RawValType::Ref("funcref".into()).to_string(), "funcref");
    }

    #[test]
    fn test_function_descriptor() {
        let export = ExportDescriptor::function("add", vec![RawValType::I64], vec![]);
        assert_eq!(export.name, "add");
        assert!(matches!(export.kind, ExportKind::Function { .. }));
    }
}
