//! Typed invocation of exported functions.
//!
//! Arguments arrive as host 64-bit integers and are converted to the
//! declared parameter kinds; the single result comes back widened to a
//! 64-bit integer.

use std::time::Instant;

use tracing::{debug, instrument, warn};

use wasm_executor_common::{ExecutorError, InstanceId};

use crate::backend::{Backend, CallError, Value};
use crate::catalog::ExportedFunction;
use crate::registry::Registry;

/// Convert host arguments to guest values for `function` of `instance_id`.
///
/// # Errors
///
/// Returns [`ExecutorError::ArityMismatch`] if the argument count differs
/// from the declared parameter count.
pub fn marshal_args(
    instance_id: InstanceId,
    function: &ExportedFunction,
    args: &[i64],
) -> Result<Vec<Value>, ExecutorError> {
    if args.len() != function.arity() {
        return Err(ExecutorError::ArityMismatch {
            instance_id,
            function: function.name.clone(),
            expected: function.arity(),
            actual: args.len(),
        });
    }

    Ok(function
        .parameter_types
        .iter()
        .zip(args)
        .map(|(kind, arg)| kind.marshal(*arg))
        .collect())
}

/// Widen a guest result to a host integer. `I32` is sign-extended.
pub fn unmarshal_result(value: Value) -> i64 {
    match value {
        Value::I32(v) => i64::from(v),
        Value::I64(v) => v,
    }
}

impl<B: Backend> Registry<B> {
    /// Call an exported function of a registered instance.
    ///
    /// Calls into the same instance are serialized. A trap does not poison
    /// the instance: later calls run against whatever state the guest left.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::InstanceNotFound`] / [`ExecutorError::FunctionNotFound`]
    /// - a catalog build error if the instance exports an unsupported function
    /// - [`ExecutorError::ArityMismatch`] for a wrong argument count
    /// - [`ExecutorError::Trap`] if the guest traps
    /// - [`ExecutorError::FuelExhausted`] if metering stops the call
    #[instrument(skip(self, args), fields(argc = args.len()))]
    pub fn invoke(
        &self,
        id: InstanceId,
        function: &str,
        args: &[i64],
    ) -> Result<i64, ExecutorError> {
        let instance = self.lookup(id)?;
        let catalog = instance.catalog(self.backend())?;
        let exported = catalog
            .get(function)
            .ok_or_else(|| ExecutorError::function_not_found(id, function))?;
        let values = marshal_args(id, exported, args)?;

        let start = Instant::now();
        let outcome = instance.with_handle(|handle| self.backend().call(handle, function, &values));
        let duration = start.elapsed();

        match outcome {
            Ok(value) => {
                let result = unmarshal_result(value);
                debug!(
                    instance_id = %id,
                    duration_us = duration.as_micros(),
                    result,
                    "Call completed"
                );
                Ok(result)
            }
            Err(CallError::FuelExhausted) => {
                warn!(
                    instance_id = %id,
                    duration_ms = duration.as_millis(),
                    "Call terminated: fuel exhausted"
                );
                Err(ExecutorError::FuelExhausted {
                    instance_id: id,
                    function: function.to_string(),
                })
            }
            Err(CallError::Trap { message }) => {
                warn!(
                    instance_id = %id,
                    duration_ms = duration.as_millis(),
                    trap_message = %message,
                    "Call trapped"
                );
                Err(ExecutorError::trap(id, function, message))
            }
            Err(CallError::MissingFunction) => Err(ExecutorError::function_not_found(id, function)),
            Err(CallError::UnexpectedResult { found }) => Err(ExecutorError::trap(
                id,
                function,
                format!("unexpected result: {found}"),
            )),
        }
    }
}
