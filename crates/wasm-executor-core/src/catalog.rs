//! Function catalog: the callable surface of an instance.
//!
//! Only functions whose signature fits the supported subset are callable:
//! at most [`MAX_PARAMS`] parameters, exactly one result, and every type
//! `i32` or `i64`. Building a catalog rejects the whole instance on the first
//! function outside that subset, so a catalog never holds a function that
//! cannot be called.

use std::fmt;
use std::sync::Arc;

use wasm_executor_common::{ExecutorError, InstanceId};

use crate::backend::{Backend, ExportDescriptor, ExportKind, RawValType, Value};
use crate::registry::Registry;

/// Maximum number of parameters of a callable function.
pub const MAX_PARAMS: usize = 10;

/// A supported value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 32-bit integer, exchanged with the host as `integer`.
    Int32,
    /// 64-bit integer, exchanged with the host as `bigint`.
    Int64,
}

impl ValueKind {
    /// Name of the host-side type.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Int32 => "integer",
            Self::Int64 => "bigint",
        }
    }

    /// Map a reflected type, if supported.
    pub fn from_raw(raw: &RawValType) -> Option<Self> {
        match raw {
            RawValType::I32 => Some(Self::Int32),
            RawValType::I64 => Some(Self::Int64),
            _ => None,
        }
    }

    /// Convert a host argument to a guest value of this kind.
    ///
    /// `Int32` keeps the low 32 bits of the argument.
    #[allow(clippy::cast_possible_truncation)]
    pub fn marshal(self, arg: i64) -> Value {
        match self {
            Self::Int32 => Value::I32(arg as i32),
            Self::Int64 => Value::I64(arg),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A callable exported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFunction {
    /// Export name.
    pub name: String,
    /// Parameter kinds in declaration order.
    pub parameter_types: Vec<ValueKind>,
    /// Kind of the single result.
    pub return_type: ValueKind,
}

impl ExportedFunction {
    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// Parameter kinds joined by `,` without spaces, e.g. `bigint,bigint`.
    pub fn parameter_kinds(&self) -> String {
        self.parameter_types
            .iter()
            .map(|kind| kind.type_name())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn from_signature(
        instance_id: InstanceId,
        name: &str,
        params: &[RawValType],
        results: &[RawValType],
    ) -> Result<Self, ExecutorError> {
        if params.len() > MAX_PARAMS {
            return Err(ExecutorError::UnsupportedArity {
                instance_id,
                function: name.to_string(),
                count: params.len(),
                max: MAX_PARAMS,
            });
        }

        let [result] = results else {
            return Err(ExecutorError::UnsupportedReturnArity {
                instance_id,
                function: name.to_string(),
                count: results.len(),
            });
        };

        let kind_of = |raw: &RawValType| {
            ValueKind::from_raw(raw).ok_or_else(|| ExecutorError::UnsupportedType {
                instance_id,
                function: name.to_string(),
                kind: raw.to_string(),
            })
        };

        let parameter_types = params.iter().map(kind_of).collect::<Result<Vec<_>, _>>()?;
        let return_type = kind_of(result)?;

        Ok(Self {
            name: name.to_string(),
            parameter_types,
            return_type,
        })
    }
}

/// The callable functions of one instance, in export order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    functions: Vec<ExportedFunction>,
}

impl Catalog {
    /// Build a catalog from an instance's exports.
    ///
    /// Non-function exports are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::UnsupportedArity`],
    /// [`ExecutorError::UnsupportedReturnArity`] or
    /// [`ExecutorError::UnsupportedType`] for the first function, in export
    /// order, whose signature is not supported.
    pub fn build(
        instance_id: InstanceId,
        exports: Vec<ExportDescriptor>,
    ) -> Result<Self, ExecutorError> {
        let functions = exports
            .into_iter()
            .filter_map(|export| match export.kind {
                ExportKind::Function { params, results } => Some(
                    ExportedFunction::from_signature(instance_id, &export.name, &params, &results),
                ),
                _ => None,
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { functions })
    }

    /// Find a function by exact name.
    pub fn get(&self, name: &str) -> Option<&ExportedFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Iterate functions in export order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExportedFunction> {
        self.functions.iter()
    }

    /// Number of callable functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if the instance exports no functions.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a ExportedFunction;
    type IntoIter = std::slice::Iter<'a, ExportedFunction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<B: Backend> Registry<B> {
    /// List the callable functions of an instance in export order.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InstanceNotFound`] for an unknown id, or the
    /// signature error of the first unsupported function.
    pub fn exports_of(&self, id: InstanceId) -> Result<Arc<Catalog>, ExecutorError> {
        self.lookup(id)?.catalog(self.backend())
    }

    /// Look up one function of an instance.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::InstanceNotFound`],
    /// [`ExecutorError::FunctionNotFound`], or a catalog build error.
    pub fn resolve(&self, id: InstanceId, name: &str) -> Result<ExportedFunction, ExecutorError> {
        self.exports_of(id)?
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutorError::function_not_found(id, name))
    }
}
