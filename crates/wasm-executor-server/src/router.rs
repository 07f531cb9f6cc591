//! HTTP router configuration.
//!
//! This module provides functions to build the Axum router with all
//! necessary routes and middleware.

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{
    create_instance, health_check, invoke_function, list_functions, list_instances,
    readiness_check,
};
use crate::state::AppState;

/// Build the main application router.
///
/// Routes:
/// - `POST /instances` - Register a module (admin token when configured)
/// - `GET /instances` - List registered instances
/// - `GET /instances/:id/functions` - List callable functions
/// - `POST /instances/:id/functions/:name/invoke` - Invoke a function
/// - `GET /health` - Health check
/// - `GET /ready` - Readiness check
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let instance_routes = Router::new()
        .route("/instances", post(create_instance).get(list_instances))
        .route("/instances/:id/functions", get(list_functions))
        .route(
            "/instances/:id/functions/:name/invoke",
            post(invoke_function),
        );

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check));

    Router::new()
        .merge(instance_routes)
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::util::ServiceExt;
    use wasm_executor_common::{LoaderConfig, RuntimeConfig};
    use wasm_executor_host::HostApi;

    use crate::admin::ADMIN_TOKEN_HEADER;

    const TOKEN: &str = "secret";

    const ADDER: &str = r#"
        (module
            (func (export "add") (param i64 i64) (result i64)
                local.get 0
                local.get 1
                i64.add)
            (func (export "boom") (result i32) unreachable))
    "#;

    fn setup_router(token: Option<&str>) -> Router {
        let api =
            HostApi::from_config(&RuntimeConfig::default(), &LoaderConfig::default()).unwrap();
        let state = AppState::from_api(api, token.map(str::to_string), Vec::new());
        build_router(state, Duration::from_secs(30))
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn create_request(path: &str) -> Request<Body> {
        let body = serde_json::json!({ "path": path });
        let mut request = json_request("POST", "/instances", &body);
        request
            .headers_mut()
            .insert(ADMIN_TOKEN_HEADER, TOKEN.parse().unwrap());
        request
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn adder_file() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".wat").tempfile().unwrap();
        std::fs::write(file.path(), ADDER).unwrap();
        file
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_router(None);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_check() {
        let app = setup_router(None);
        let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["instances"], 0);
    }

    #[tokio::test]
    async fn test_create_list_invoke() {
        let app = setup_router(Some(TOKEN));
        let file = adder_file();
        let path = file.path().display().to_string();

        let (status, created) = send(&app, create_request(&path)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["created"], true);
        let id = created["id"].as_i64().unwrap();

        let (status, again) = send(&app, create_request(&path)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["id"], id);
        assert!(again["notice"].as_str().unwrap().contains("already created"));

        let request = Request::builder().uri("/instances").body(Body::empty()).unwrap();
        let (status, listing) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["count"], 1);

        let request = Request::builder()
            .uri(format!("/instances/{id}/functions"))
            .body(Body::empty())
            .unwrap();
        let (status, functions) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(functions["count"], 2);
        assert_eq!(functions["functions"][0]["parameter_kinds"], "bigint,bigint");
        assert_eq!(functions["functions"][1]["return_kind"], "integer");

        let (status, invoked) = send(
            &app,
            json_request(
                "POST",
                &format!("/instances/{id}/functions/add/invoke"),
                &serde_json::json!({ "args": [40, 2] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(invoked["result"], 42);
    }

    #[tokio::test]
    async fn test_invoke_errors() {
        let app = setup_router(Some(TOKEN));
        let file = adder_file();
        let path = file.path().display().to_string();

        let (_, created) = send(&app, create_request(&path)).await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/instances/{id}/functions/boom/invoke"),
                &serde_json::json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "trap");

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/instances/{id}/functions/add/invoke"),
                &serde_json::json!({ "args": [1] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "arity_mismatch");

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/instances/{id}/functions/missing/invoke"),
                &serde_json::json!({ "args": [] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "function_not_found");

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/instances/not-a-number/functions/add/invoke",
                &serde_json::json!({ "args": [1, 2] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let app = setup_router(None);
        let request = Request::builder()
            .uri("/instances/12345/functions")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "instance_not_found");
    }

    #[tokio::test]
    async fn test_create_missing_file() {
        let app = setup_router(Some(TOKEN));

        let (status, body) = send(&app, create_request("/definitely/not/here.wasm")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "load_failed");
    }

    #[tokio::test]
    async fn test_create_malformed_module() {
        let app = setup_router(Some(TOKEN));
        let file = tempfile::Builder::new().suffix(".wat").tempfile().unwrap();
        std::fs::write(file.path(), "(module (func").unwrap();

        let (status, body) = send(&app, create_request(&file.path().display().to_string())).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "invalid_module");
    }

    #[tokio::test]
    async fn test_create_requires_admin_token() {
        let app = setup_router(Some(TOKEN));
        let file = adder_file();
        let body = serde_json::json!({ "path": file.path().display().to_string() });

        let (status, error) = send(&app, json_request("POST", "/instances", &body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error["error"]["type"], "permission_denied");

        let request = create_request(&file.path().display().to_string());
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_create_without_configured_token_is_forbidden() {
        let app = setup_router(None);
        let file = adder_file();
        let path = file.path().display().to_string();

        // Sending a token does not help when none is configured
        let (status, error) = send(&app, create_request(&path)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error["error"]["type"], "permission_denied");

        let request = Request::builder().uri("/instances").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }
}
