//! Tabular views of registry state.

use serde::Serialize;

use wasm_executor_common::InstanceId;
use wasm_executor_core::{ExportedFunction, InstanceSummary};

/// One row of the instance listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRow {
    /// Instance identifier.
    pub id: InstanceId,
    /// Canonical path the module was loaded from.
    pub path: String,
}

impl From<InstanceSummary> for InstanceRow {
    fn from(summary: InstanceSummary) -> Self {
        Self {
            id: summary.id,
            path: summary.source_path.display().to_string(),
        }
    }
}

/// One row of a function listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRow {
    /// Export name.
    pub name: String,
    /// Parameter kinds joined by `,`, e.g. `bigint,bigint`.
    pub parameter_kinds: String,
    /// Result kind.
    pub return_kind: String,
}

impl From<&ExportedFunction> for FunctionRow {
    fn from(function: &ExportedFunction) -> Self {
        Self {
            name: function.name.clone(),
            parameter_kinds: function.parameter_kinds(),
            return_kind: function.return_type.type_name().to_string(),
        }
    }
}
