//! Request handlers for the registry API.
//!
//! Registry work is synchronous and may block on an instance's execution
//! lock, so every handler that touches the registry runs it on the blocking
//! thread pool.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use wasm_executor_common::InstanceId;
use wasm_executor_host::{CreateOutcome, FunctionRow, InstanceRow};

use crate::admin::caller_permissions;
use crate::response::ApiError;
use crate::state::AppState;

/// Body of `POST /instances`.
#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    /// Path of the module file.
    pub path: String,
}

/// Body of `POST /instances/:id/functions/:name/invoke`.
#[derive(Debug, Default, Deserialize)]
pub struct InvokeRequest {
    /// Integer arguments in parameter order.
    #[serde(default)]
    pub args: Vec<i64>,
}

/// Response of a successful invocation.
#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    /// The function's result widened to 64 bits.
    pub result: i64,
}

/// Instance listing.
#[derive(Debug, Serialize)]
pub struct InstancesResponse {
    /// Registered instances in registration order.
    pub instances: Vec<InstanceRow>,
    /// Number of instances.
    pub count: usize,
}

/// Function listing.
#[derive(Debug, Serialize)]
pub struct FunctionsResponse {
    /// Callable functions in export order.
    pub functions: Vec<FunctionRow>,
    /// Number of functions.
    pub count: usize,
}

/// Run registry work on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Worker task failed: {e}")))?
}

/// Register a module.
///
/// Responds `201 Created` when the module was loaded and `200 OK` when the
/// instance already existed.
#[instrument(skip(state, headers, request))]
pub async fn create_instance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateInstanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let permissions = caller_permissions(&state, &headers);
    let api = state.api().clone();

    info!(request_id = %request_id, path = %request.path, "Handling create request");

    let outcome: CreateOutcome =
        blocking(move || Ok(api.create_instance(&permissions, &request.path)?))
            .await
            .inspect_err(|e| warn!(request_id = %request_id, error = ?e, "Create failed"))?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(outcome)))
}

/// List registered instances.
pub async fn list_instances(State(state): State<AppState>) -> Json<InstancesResponse> {
    let instances = state.api().list_instances();
    let count = instances.len();

    Json(InstancesResponse { instances, count })
}

/// List the callable functions of an instance.
#[instrument(skip(state))]
pub async fn list_functions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FunctionsResponse>, ApiError> {
    let id: InstanceId = id.parse()?;
    let api = state.api().clone();

    let functions = blocking(move || Ok(api.list_exported_functions(id)?)).await?;
    let count = functions.len();

    Ok(Json(FunctionsResponse { functions, count }))
}

/// Invoke an exported function.
#[instrument(skip(state, request), fields(argc = request.args.len()))]
pub async fn invoke_function(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, ApiError> {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let api = state.api().clone();

    let outcome = {
        let name = name.clone();
        blocking(move || Ok(api.invoke(&id, &name, &request.args)?)).await
    };

    match outcome {
        Ok(result) => {
            info!(
                request_id = %request_id,
                function = %name,
                duration_us = start.elapsed().as_micros(),
                "Invocation completed"
            );
            Ok(Json(InvokeResponse { result }))
        }
        Err(e) => {
            warn!(
                request_id = %request_id,
                function = %name,
                error_type = e.error_type(),
                "Invocation failed"
            );
            Err(e)
        }
    }
}

/// Health check handler.
///
/// Returns 200 OK if the server is running.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler.
///
/// Returns 200 OK with the number of registered instances.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ready",
        "instances": state.api().registry().len(),
    });

    (StatusCode::OK, Json(body))
}
